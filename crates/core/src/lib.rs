//! Core domain types for the timetable extractor.

use serde::{Deserialize, Serialize};

/// One positioned run of text on a PDF page.
///
/// Coordinates are in page space with the origin at the bottom-left corner, so a larger `y`
/// means higher on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            height,
        }
    }

    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Period ordinals are a lone ASCII digit.
    pub fn is_single_digit(&self) -> bool {
        let mut chars = self.trimmed().chars();
        matches!((chars.next(), chars.next()), (Some(ch), None) if ch.is_ascii_digit())
    }

    /// Time ranges ("08:00-09:00") are recognized by their separator alone.
    pub fn is_time_like(&self) -> bool {
        self.text.contains(':')
    }
}

/// A day header: its label and horizontal anchor (the midpoint of the header text).
#[derive(Debug, Clone, PartialEq)]
pub struct DayColumn {
    pub name: String,
    pub x: f32,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodRow {
    pub label: String,
    pub time: String,
    pub y: f32,
    pub height: f32,
}

impl PeriodRow {
    pub fn top(&self, margin: f32) -> f32 {
        self.y + self.height + margin
    }
}

/// Region of the page belonging to one (day, period) pair. Bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    pub x_start: f32,
    pub x_end: f32,
    pub y_start: f32,
    pub y_end: f32,
}

impl CellBounds {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x > self.x_start && x < self.x_end && y > self.y_start && y < self.y_end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    #[serde(rename = "classe")]
    pub class_name: String,
    #[serde(rename = "jour")]
    pub day: String,
    #[serde(rename = "horaire")]
    pub time: String,
    #[serde(rename = "periode")]
    pub period: String,
    #[serde(rename = "matiere")]
    pub subject: String,
    #[serde(rename = "enseignant")]
    pub teacher: String,
}

/// Geometric thresholds used by the layout inference.
///
/// Timetable PDFs carry no table structure, so every boundary is inferred from text anchors.
/// Units are PDF points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// A title must sit above this y.
    pub title_top_threshold: f32,
    /// A title must be taller than this.
    pub title_min_height: f32,
    /// Day token anchoring the header row, compared case-insensitively.
    pub anchor_day: String,
    /// Vertical distance under which two fragments share a row.
    pub row_tolerance: f32,
    /// Header labels must have more characters than this.
    pub min_day_label_len: usize,
    /// Period digits sit left of this x.
    pub period_max_x: f32,
    /// Right edge of the last day column.
    pub column_end_bound: f32,
    /// Added above each period's top edge.
    pub row_top_margin: f32,
    /// Horizontal gap that separates two sub-cells.
    pub split_gap: f32,
    /// Lower-case prefix marking a group label.
    pub group_prefix: String,
    pub missing_teacher: String,
}

pub const DEFAULT_ANCHOR_DAY: &str = "sunday";
pub const DEFAULT_GROUP_PREFIX: &str = "group";
pub const DEFAULT_MISSING_TEACHER: &str = "N/A";

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            title_top_threshold: 750.0,
            title_min_height: 15.0,
            anchor_day: DEFAULT_ANCHOR_DAY.to_string(),
            row_tolerance: 5.0,
            min_day_label_len: 3,
            period_max_x: 100.0,
            column_end_bound: 1000.0,
            row_top_margin: 0.0,
            split_gap: 15.0,
            group_prefix: DEFAULT_GROUP_PREFIX.to_string(),
            missing_teacher: DEFAULT_MISSING_TEACHER.to_string(),
        }
    }
}

impl LayoutConfig {
    pub fn normalize(&mut self) {
        for value in [
            &mut self.title_min_height,
            &mut self.row_tolerance,
            &mut self.row_top_margin,
            &mut self.split_gap,
        ] {
            if !value.is_finite() || *value < 0.0 {
                *value = 0.0;
            }
        }

        self.anchor_day = self.anchor_day.trim().to_lowercase();
        if self.anchor_day.is_empty() {
            self.anchor_day = DEFAULT_ANCHOR_DAY.to_string();
        }
        self.group_prefix = self.group_prefix.trim().to_lowercase();
        if self.group_prefix.is_empty() {
            self.group_prefix = DEFAULT_GROUP_PREFIX.to_string();
        }
        if self.missing_teacher.trim().is_empty() {
            self.missing_teacher = DEFAULT_MISSING_TEACHER.to_string();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub layout: LayoutConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err("unknown theme"),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::Dark
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            layout: LayoutConfig::default(),
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        self.layout.normalize();
    }

    pub fn cycle_theme(&mut self) {
        self.theme = match self.theme {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_digit_detection_trims() {
        assert!(TextFragment::new(" 3 ", 0.0, 0.0, 0.0, 0.0).is_single_digit());
        assert!(!TextFragment::new("12", 0.0, 0.0, 0.0, 0.0).is_single_digit());
        assert!(!TextFragment::new("a", 0.0, 0.0, 0.0, 0.0).is_single_digit());
        assert!(!TextFragment::new("", 0.0, 0.0, 0.0, 0.0).is_single_digit());
        assert!(!TextFragment::new("٣", 0.0, 0.0, 0.0, 0.0).is_single_digit());
    }

    #[test]
    fn cell_bounds_are_exclusive() {
        let bounds = CellBounds {
            x_start: 10.0,
            x_end: 20.0,
            y_start: 0.0,
            y_end: 50.0,
        };
        assert!(bounds.contains(15.0, 25.0));
        assert!(!bounds.contains(10.0, 25.0));
        assert!(!bounds.contains(15.0, 50.0));
        assert!(!bounds.contains(15.0, 0.0));
    }

    #[test]
    fn entry_serializes_with_timetable_field_names() {
        let entry = TimetableEntry {
            class_name: "10A".to_string(),
            day: "Sunday".to_string(),
            time: "08:00-09:00".to_string(),
            period: "1".to_string(),
            subject: "Math".to_string(),
            teacher: "N/A".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["classe"], "10A");
        assert_eq!(json["jour"], "Sunday");
        assert_eq!(json["horaire"], "08:00-09:00");
        assert_eq!(json["periode"], "1");
        assert_eq!(json["matiere"], "Math");
        assert_eq!(json["enseignant"], "N/A");
    }

    #[test]
    fn layout_config_normalizes_tokens_and_distances() {
        let mut layout = LayoutConfig {
            anchor_day: "  Monday ".to_string(),
            group_prefix: " ".to_string(),
            missing_teacher: String::new(),
            split_gap: -4.0,
            row_tolerance: f32::NAN,
            ..LayoutConfig::default()
        };
        layout.normalize();
        assert_eq!(layout.anchor_day, "monday");
        assert_eq!(layout.group_prefix, "group");
        assert_eq!(layout.missing_teacher, "N/A");
        assert_eq!(layout.split_gap, 0.0);
        assert_eq!(layout.row_tolerance, 0.0);
    }

    #[test]
    fn layout_config_fills_missing_fields_from_defaults() {
        let layout: LayoutConfig = serde_json::from_str(r#"{"split_gap": 20.0}"#).unwrap();
        assert_eq!(layout.split_gap, 20.0);
        assert_eq!(layout.anchor_day, "sunday");
        assert_eq!(layout.column_end_bound, 1000.0);
    }

    #[test]
    fn theme_parses_strings() {
        assert_eq!("light".parse::<Theme>().unwrap(), Theme::Light);
        assert_eq!(" DARK ".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("nope".parse::<Theme>().is_err());
    }

    #[test]
    fn cycle_theme_rotates() {
        let mut settings = Settings::default();
        assert_eq!(settings.theme, Theme::Dark);
        settings.cycle_theme();
        assert_eq!(settings.theme, Theme::Light);
        settings.cycle_theme();
        assert_eq!(settings.theme, Theme::Dark);
    }
}
