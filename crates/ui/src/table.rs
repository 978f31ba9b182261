use timetable_core::TimetableEntry;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub(crate) const HEADERS: [&str; 6] = ["Class", "Day", "Time", "Period", "Subject", "Teacher"];

const MAX_COLUMN_WIDTH: usize = 40;

pub(crate) fn entry_cells(entry: &TimetableEntry) -> [&str; 6] {
    [
        entry.class_name.as_str(),
        entry.day.as_str(),
        entry.time.as_str(),
        entry.period.as_str(),
        entry.subject.as_str(),
        entry.teacher.as_str(),
    ]
}

/// Display width of each column: the widest of the header and the rows, capped.
pub(crate) fn column_widths<'a>(rows: impl IntoIterator<Item = [&'a str; 6]>) -> [u16; 6] {
    let mut widths = HEADERS.map(UnicodeWidthStr::width);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }
    widths.map(|w| w.min(MAX_COLUMN_WIDTH) as u16)
}

/// Cuts `text` to `max_width` display columns, marking the cut with an ellipsis.
pub(crate) fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > max_width - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_cover_headers_and_cells() {
        let rows = [["10A", "Wednesday", "08:00-09:00", "1", "Math", "N/A"]];
        assert_eq!(column_widths(rows), [5, 9, 11, 6, 7, 7]);
    }

    #[test]
    fn widths_are_capped() {
        let long = "x".repeat(80);
        let rows = [["10A", "Sunday", "", "1", long.as_str(), "N/A"]];
        assert_eq!(column_widths(rows)[4], 40);
    }

    #[test]
    fn truncate_marks_the_cut() {
        assert_eq!(truncate_to_width("Mathematics", 20), "Mathematics");
        assert_eq!(truncate_to_width("Mathematics", 5), "Math…");
        assert_eq!(truncate_to_width("数学数学", 5), "数学…");
        assert_eq!(truncate_to_width("Math", 0), "");
    }
}
