//! Grid inference over the positioned text fragments of one page.
//!
//! A timetable page has a header row of day names, a left column of period digits with their
//! time ranges, and course text scattered over the cells in between. None of this is tagged in
//! the PDF, so the grid is rebuilt from the anchors: the day headers give column boundaries and
//! the period labels give row boundaries.

use timetable_core::{
    CellBounds, DayColumn, LayoutConfig, PeriodRow, TextFragment, TimetableEntry,
};

/// Fragments of one cell judged to belong to the same course occurrence.
pub type SubCell<'a> = Vec<&'a TextFragment>;

/// Axes detected on a page, before any cell is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub title: String,
    pub days: Vec<DayColumn>,
    pub periods: Vec<PeriodRow>,
}

impl PageLayout {
    pub fn is_grid(&self) -> bool {
        !self.days.is_empty() && !self.periods.is_empty()
    }
}

/// Detects the title and both axes. `None` when the anchor day is missing.
pub fn analyze_page(
    fragments: &[TextFragment],
    page_number: u32,
    config: &LayoutConfig,
) -> Option<PageLayout> {
    let days = detect_days(fragments, config)?;
    Some(PageLayout {
        title: detect_title(fragments, page_number, config),
        days,
        periods: detect_periods(fragments, config),
    })
}

pub fn parse_page(
    fragments: &[TextFragment],
    page_number: u32,
    config: &LayoutConfig,
) -> Vec<TimetableEntry> {
    let Some(layout) = analyze_page(fragments, page_number, config) else {
        log::debug!(
            "page {page_number}: anchor day {:?} not found, not a timetable grid",
            config.anchor_day
        );
        return Vec::new();
    };
    if !layout.is_grid() {
        log::debug!(
            "page {page_number}: {} day columns, {} period rows; skipping",
            layout.days.len(),
            layout.periods.len()
        );
        return Vec::new();
    }

    let mut entries = Vec::new();
    for period in &layout.periods {
        let below = layout.periods.iter().find(|p| p.y < period.y);
        for (idx, day) in layout.days.iter().enumerate() {
            let bounds = cell_bounds(day, layout.days.get(idx + 1), period, below, config);
            let content = cell_fragments(fragments, &bounds);
            for sub_cell in split_sub_cells(content, config.split_gap) {
                let Some((subject, teacher)) = resolve_sub_cell(sub_cell, config) else {
                    continue;
                };
                entries.push(TimetableEntry {
                    class_name: layout.title.clone(),
                    day: day.name.clone(),
                    time: period.time.clone(),
                    period: period.label.clone(),
                    subject,
                    teacher,
                });
            }
        }
    }

    log::debug!(
        "page {page_number} ({}): {} days x {} periods -> {} entries",
        layout.title,
        layout.days.len(),
        layout.periods.len(),
        entries.len()
    );
    entries
}

/// The highest sufficiently large fragment near the top of the page, else `"Page N"`.
pub fn detect_title(fragments: &[TextFragment], page_number: u32, config: &LayoutConfig) -> String {
    fragments
        .iter()
        .filter(|f| {
            f.y > config.title_top_threshold && f.height > config.title_min_height && !f.is_blank()
        })
        .fold(None::<&TextFragment>, |best, f| match best {
            Some(best) if best.y >= f.y => Some(best),
            _ => Some(f),
        })
        .map(|f| f.trimmed().to_string())
        .unwrap_or_else(|| format!("Page {page_number}"))
}

pub fn detect_days(fragments: &[TextFragment], config: &LayoutConfig) -> Option<Vec<DayColumn>> {
    let anchor_token = config.anchor_day.trim().to_lowercase();
    let anchor = fragments
        .iter()
        .find(|f| f.trimmed().to_lowercase() == anchor_token)?;

    let mut days: Vec<DayColumn> = fragments
        .iter()
        .filter(|f| {
            (f.y - anchor.y).abs() < config.row_tolerance
                && f.trimmed().chars().count() > config.min_day_label_len
        })
        .map(|f| DayColumn {
            name: f.trimmed().to_string(),
            x: f.x + f.width / 2.0,
            width: f.width,
        })
        .collect();
    days.sort_by(|a, b| a.x.total_cmp(&b.x));
    Some(days)
}

/// Period rows, top of the page first.
pub fn detect_periods(fragments: &[TextFragment], config: &LayoutConfig) -> Vec<PeriodRow> {
    let mut periods: Vec<PeriodRow> = fragments
        .iter()
        .filter(|f| f.is_single_digit() && f.x < config.period_max_x)
        .map(|label| {
            let time = fragments
                .iter()
                .find(|t| (t.y - label.y).abs() < config.row_tolerance && t.is_time_like())
                .map(|t| t.trimmed().to_string())
                .unwrap_or_default();
            PeriodRow {
                label: label.trimmed().to_string(),
                time,
                y: label.y,
                height: label.height,
            }
        })
        .collect();
    periods.sort_by(|a, b| b.y.total_cmp(&a.y));
    periods
}

/// Columns start half a label width left of their header text and end where the next one
/// starts. Rows run from the top of the period below up to the top of this one.
pub fn cell_bounds(
    day: &DayColumn,
    next_day: Option<&DayColumn>,
    period: &PeriodRow,
    period_below: Option<&PeriodRow>,
    config: &LayoutConfig,
) -> CellBounds {
    CellBounds {
        x_start: day.x - day.width,
        x_end: next_day
            .map(|next| next.x - next.width)
            .unwrap_or(config.column_end_bound),
        y_start: period_below
            .map(|below| below.top(config.row_top_margin))
            .unwrap_or(0.0),
        y_end: period.top(config.row_top_margin),
    }
}

/// Content fragments inside `bounds`; period digits and time labels are structure, not content.
pub fn cell_fragments<'a>(fragments: &'a [TextFragment], bounds: &CellBounds) -> Vec<&'a TextFragment> {
    fragments
        .iter()
        .filter(|f| {
            bounds.contains(f.x, f.y) && !f.is_time_like() && !f.is_single_digit() && !f.is_blank()
        })
        .collect()
}

/// Splits a cell into side-by-side clusters. A fragment starting more than `gap` right of the
/// previous fragment's right edge opens a new cluster.
///
/// Each returned sub-cell is in reading order (top to bottom).
pub fn split_sub_cells(mut content: Vec<&TextFragment>, gap: f32) -> Vec<SubCell<'_>> {
    content.sort_by(|a, b| {
        a.x.total_cmp(&b.x)
            .then_with(|| b.y.total_cmp(&a.y))
            .then_with(|| a.text.cmp(&b.text))
    });

    let mut sub_cells: Vec<SubCell<'_>> = Vec::new();
    let mut right_edge = f32::NEG_INFINITY;
    for fragment in content {
        match sub_cells.last_mut() {
            Some(current) if fragment.x - right_edge <= gap => current.push(fragment),
            _ => sub_cells.push(vec![fragment]),
        }
        right_edge = fragment.right();
    }

    for sub_cell in &mut sub_cells {
        sub_cell.sort_by(|a, b| b.y.total_cmp(&a.y));
    }
    sub_cells
}

/// Turns a sub-cell into `(subject, teacher)`. `None` when nothing is left for the subject.
pub fn resolve_sub_cell(
    mut sub_cell: SubCell<'_>,
    config: &LayoutConfig,
) -> Option<(String, String)> {
    let prefix = config.group_prefix.trim().to_lowercase();
    let group = sub_cell
        .iter()
        .position(|f| f.trimmed().to_lowercase().starts_with(&prefix))
        .map(|idx| sub_cell.remove(idx));

    let (first, rest) = sub_cell.split_first()?;
    let mut subject = first.trimmed().to_string();
    if let Some(group) = group {
        subject.push_str(" (");
        subject.push_str(group.trimmed());
        subject.push(')');
    }

    let teacher = if rest.is_empty() {
        config.missing_teacher.clone()
    } else {
        rest.iter()
            .map(|f| f.trimmed())
            .collect::<Vec<_>>()
            .join(" - ")
    };
    Some((subject, teacher))
}
