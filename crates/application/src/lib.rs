//! Application orchestration layer: loaded timetable, filter state and option sets.

use std::collections::BTreeSet;
use std::collections::HashSet;

use timetable_core::{Settings, TimetableEntry};

/// Values offered by each filter dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Sorted.
    pub classes: Vec<String>,
    /// In order of first appearance, which follows the timetable's column order.
    pub days: Vec<String>,
    /// Sorted.
    pub subjects: Vec<String>,
}

impl FilterOptions {
    pub fn from_entries(entries: &[TimetableEntry]) -> Self {
        let classes: BTreeSet<&str> = entries.iter().map(|e| e.class_name.as_str()).collect();
        let subjects: BTreeSet<&str> = entries.iter().map(|e| e.subject.as_str()).collect();

        let mut seen = HashSet::new();
        let days = entries
            .iter()
            .map(|e| e.day.as_str())
            .filter(|day| seen.insert(*day))
            .map(str::to_string)
            .collect();

        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
            days,
            subjects: subjects.into_iter().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDimension {
    Class,
    Day,
    Subject,
}

impl FilterDimension {
    pub const ALL: [FilterDimension; 3] = [Self::Class, Self::Day, Self::Subject];

    pub fn label(&self) -> &'static str {
        match self {
            FilterDimension::Class => "Classes",
            FilterDimension::Day => "Days",
            FilterDimension::Subject => "Subjects",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            FilterDimension::Class => FilterDimension::Day,
            FilterDimension::Day => FilterDimension::Subject,
            FilterDimension::Subject => FilterDimension::Class,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            FilterDimension::Class => FilterDimension::Subject,
            FilterDimension::Day => FilterDimension::Class,
            FilterDimension::Subject => FilterDimension::Day,
        }
    }
}

/// Selected values per dimension. An empty dimension matches everything; dimensions combine
/// with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub classes: Vec<String>,
    pub days: Vec<String>,
    pub subjects: Vec<String>,
}

impl FilterSelection {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.days.is_empty() && self.subjects.is_empty()
    }

    pub fn matches(&self, entry: &TimetableEntry) -> bool {
        matches_any(&self.classes, &entry.class_name)
            && matches_any(&self.days, &entry.day)
            && matches_any(&self.subjects, &entry.subject)
    }

    pub fn values(&self, dimension: FilterDimension) -> &[String] {
        match dimension {
            FilterDimension::Class => &self.classes,
            FilterDimension::Day => &self.days,
            FilterDimension::Subject => &self.subjects,
        }
    }

    pub fn is_selected(&self, dimension: FilterDimension, value: &str) -> bool {
        self.values(dimension).iter().any(|v| v == value)
    }

    pub fn toggle(&mut self, dimension: FilterDimension, value: &str) {
        let values = match dimension {
            FilterDimension::Class => &mut self.classes,
            FilterDimension::Day => &mut self.days,
            FilterDimension::Subject => &mut self.subjects,
        };
        if let Some(idx) = values.iter().position(|v| v == value) {
            values.remove(idx);
        } else {
            values.push(value.to_string());
        }
    }

    /// Drops selected values that the current options no longer offer.
    pub fn retain_known(&mut self, options: &FilterOptions) {
        self.classes.retain(|v| options.classes.contains(v));
        self.days.retain(|v| options.days.contains(v));
        self.subjects.retain(|v| options.subjects.contains(v));
    }
}

fn matches_any(selected: &[String], value: &str) -> bool {
    selected.is_empty() || selected.iter().any(|s| s == value)
}

/// Entries matching `selection`, in their original order.
pub fn filter_entries<'a>(
    entries: &'a [TimetableEntry],
    selection: &FilterSelection,
) -> Vec<&'a TimetableEntry> {
    entries.iter().filter(|e| selection.matches(e)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loaded,
    /// The document parsed but no page looked like a timetable.
    NoData,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct AppContext {
    pub settings: Settings,
    pub document: Option<String>,
    pub entries: Vec<TimetableEntry>,
    pub options: FilterOptions,
    pub filters: FilterSelection,
    pub load_state: LoadState,
    pub selected: usize,
}

impl AppContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            document: None,
            entries: Vec::new(),
            options: FilterOptions::default(),
            filters: FilterSelection::default(),
            load_state: LoadState::Idle,
            selected: 0,
        }
    }

    /// Replaces everything derived from the previous document.
    pub fn with_entries(mut self, document: String, entries: Vec<TimetableEntry>) -> Self {
        self.load_entries(document, entries);
        self
    }

    pub fn load_entries(&mut self, document: String, entries: Vec<TimetableEntry>) {
        self.options = FilterOptions::from_entries(&entries);
        self.load_state = if entries.is_empty() {
            LoadState::NoData
        } else {
            LoadState::Loaded
        };
        self.document = Some(document);
        self.entries = entries;
        self.filters = FilterSelection::default();
        self.selected = 0;
    }

    pub fn load_failed(&mut self, document: String, message: String) {
        self.document = Some(document);
        self.entries.clear();
        self.options = FilterOptions::default();
        self.filters = FilterSelection::default();
        self.load_state = LoadState::Failed(message);
        self.selected = 0;
    }

    pub fn visible_entries(&self) -> Vec<&TimetableEntry> {
        filter_entries(&self.entries, &self.filters)
    }

    pub fn apply_filters(&mut self, mut filters: FilterSelection) {
        filters.retain_known(&self.options);
        self.filters = filters;
        self.clamp_selection();
    }

    pub fn clear_filters(&mut self) {
        self.filters = FilterSelection::default();
        self.clamp_selection();
    }

    pub fn select_next(&mut self) {
        let len = self.visible_entries().len();
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_entries().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}
