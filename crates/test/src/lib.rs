//! Test helpers and fixtures.

use timetable_core::TextFragment;
use timetable_engine::FragmentSource;

pub fn fragment(text: &str, x: f32, y: f32) -> TextFragment {
    TextFragment::new(text, x, y, 0.0, 0.0)
}

pub fn sized(text: &str, x: f32, y: f32, width: f32, height: f32) -> TextFragment {
    TextFragment::new(text, x, y, width, height)
}

/// In-memory document: one fragment list per page.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    pub pages: Vec<Vec<TextFragment>>,
}

impl VecSource {
    pub fn new(pages: Vec<Vec<TextFragment>>) -> Self {
        Self { pages }
    }
}

impl FragmentSource for VecSource {
    fn page_count(&self) -> anyhow::Result<u32> {
        Ok(u32::try_from(self.pages.len())?)
    }

    fn page_fragments(&self, page_index: u32) -> anyhow::Result<Vec<TextFragment>> {
        self.pages
            .get(page_index as usize)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no page {page_index}"))
    }
}

/// Two-day grid with one period and a single course in the Sunday cell.
pub fn sample_page() -> Vec<TextFragment> {
    vec![
        fragment("Sunday", 100.0, 720.0),
        fragment("Monday", 200.0, 720.0),
        fragment("1", 20.0, 600.0),
        fragment("08:00-09:00", 20.0, 600.0),
        fragment("Math", 105.0, 590.0),
        fragment("J.Doe", 105.0, 580.0),
    ]
}

/// A titled class page with two periods over three days.
pub fn class_page(title: &str, first_subject: &str) -> Vec<TextFragment> {
    vec![
        sized(title, 250.0, 780.0, 60.0, 18.0),
        sized("Sunday", 100.0, 720.0, 40.0, 10.0),
        sized("Monday", 200.0, 720.0, 40.0, 10.0),
        sized("Tuesday", 300.0, 720.0, 44.0, 10.0),
        sized("1", 20.0, 600.0, 5.0, 10.0),
        sized("08:00-09:00", 30.0, 601.0, 50.0, 10.0),
        sized("2", 20.0, 500.0, 5.0, 10.0),
        sized("09:00-10:00", 30.0, 499.0, 50.0, 10.0),
        sized(first_subject, 110.0, 590.0, 30.0, 10.0),
        sized("A.Smith", 110.0, 578.0, 30.0, 10.0),
        sized("History", 210.0, 490.0, 35.0, 10.0),
        sized("B.Jones", 210.0, 478.0, 35.0, 10.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use timetable_application::{AppContext, FilterOptions, FilterSelection, LoadState, filter_entries};
    use timetable_core::{LayoutConfig, Settings, Theme, TimetableEntry};
    use timetable_engine::{TimetableError, parse_document};
    use timetable_storage::Storage;

    fn parse(pages: Vec<Vec<TextFragment>>) -> Vec<TimetableEntry> {
        parse_document(&VecSource::new(pages), &LayoutConfig::default())
            .unwrap()
            .entries
    }

    #[test]
    fn sample_document_yields_single_entry() {
        let entries = parse(vec![sample_page()]);
        assert_eq!(
            entries,
            vec![TimetableEntry {
                class_name: "Page 1".to_string(),
                day: "Sunday".to_string(),
                time: "08:00-09:00".to_string(),
                period: "1".to_string(),
                subject: "Math".to_string(),
                teacher: "J.Doe".to_string(),
            }]
        );
    }

    #[test]
    fn entries_serialize_with_french_field_names() -> anyhow::Result<()> {
        let entries = parse(vec![sample_page()]);
        let value = serde_json::to_value(&entries)?;
        assert_eq!(
            value,
            serde_json::json!([{
                "classe": "Page 1",
                "jour": "Sunday",
                "horaire": "08:00-09:00",
                "periode": "1",
                "matiere": "Math",
                "enseignant": "J.Doe",
            }])
        );
        Ok(())
    }

    #[test]
    fn document_without_anchor_is_no_data() {
        let pages = vec![
            vec![fragment("Lundi", 100.0, 720.0), fragment("1", 20.0, 600.0)],
            Vec::new(),
        ];
        let doc = parse_document(&VecSource::new(pages), &LayoutConfig::default()).unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.pages, 2);
        assert_eq!(doc.pages_with_entries, 0);

        let ctx = AppContext::new(Settings::default()).with_entries("week.pdf".to_string(), doc.entries);
        assert_eq!(ctx.load_state, LoadState::NoData);
    }

    #[test]
    fn pages_contribute_in_order_and_skip_non_grids() {
        let pages = vec![
            class_page("10A", "Math"),
            vec![sized("Notes", 100.0, 700.0, 40.0, 10.0)],
            class_page("10B", "Physics"),
        ];
        let doc = parse_document(&VecSource::new(pages), &LayoutConfig::default()).unwrap();
        assert_eq!(doc.pages, 3);
        assert_eq!(doc.pages_with_entries, 2);

        let classes: Vec<_> = doc.entries.iter().map(|e| e.class_name.as_str()).collect();
        assert_eq!(classes, vec!["10A", "10A", "10B", "10B"]);
        assert_eq!(doc.entries[0].subject, "Math");
        assert_eq!(doc.entries[2].subject, "Physics");
    }

    #[test]
    fn entries_use_the_page_labels() {
        let page = class_page("10A", "Math");
        let entries = parse(vec![page]);
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert!(["Sunday", "Monday", "Tuesday"].contains(&entry.day.as_str()));
            assert!(["1", "2"].contains(&entry.period.as_str()));
        }
        assert_eq!(
            (entries[0].day.as_str(), entries[0].time.as_str()),
            ("Sunday", "08:00-09:00")
        );
        assert_eq!(
            (entries[1].day.as_str(), entries[1].time.as_str(), entries[1].teacher.as_str()),
            ("Monday", "09:00-10:00", "B.Jones")
        );
    }

    #[test]
    fn separated_clusters_become_separate_entries() {
        let mut page = sample_page();
        page.push(sized("Art", 160.0, 590.0, 20.0, 10.0));
        page.push(sized("K.Lee", 160.0, 580.0, 20.0, 10.0));
        let entries = parse(vec![page]);
        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].day.as_str(), entries[0].period.as_str()), ("Sunday", "1"));
        assert_eq!((entries[1].day.as_str(), entries[1].period.as_str()), ("Sunday", "1"));
        assert_ne!(entries[0].subject, entries[1].subject);
        assert_ne!(entries[0].teacher, entries[1].teacher);
    }

    #[test]
    fn group_label_joins_the_subject() {
        let mut page = sample_page();
        page.push(fragment("Group 2", 105.0, 570.0));
        let entries = parse(vec![page]);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].subject.ends_with(" (Group 2)"));
        assert!(!entries[0].teacher.contains("Group 2"));
        assert_eq!(entries[0].teacher, "J.Doe");
    }

    #[test]
    fn fragment_order_does_not_change_output() {
        let mut page = class_page("10A", "Math");
        page.push(sized("Art", 160.0, 590.0, 20.0, 10.0));
        let forward = parse(vec![page.clone()]);
        page.reverse();
        let backward = parse(vec![page]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn filters_over_parsed_document() {
        let entries = parse(vec![class_page("10A", "Math"), class_page("10B", "Physics")]);

        let all = filter_entries(&entries, &FilterSelection::default());
        assert_eq!(all, entries.iter().collect::<Vec<_>>());

        let selection = FilterSelection {
            classes: vec!["10A".to_string()],
            ..FilterSelection::default()
        };
        let expected: Vec<_> = entries.iter().filter(|e| e.class_name == "10A").collect();
        assert_eq!(filter_entries(&entries, &selection), expected);

        let options = FilterOptions::from_entries(&entries);
        assert_eq!(options.classes, vec!["10A", "10B"]);
        assert_eq!(options.days, vec!["Sunday", "Monday"]);
        assert_eq!(options.subjects, vec!["History", "Math", "Physics"]);
    }

    #[test]
    fn stored_layout_drives_parsing() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let mut settings = storage.load_settings()?;
        settings.theme = Theme::Light;
        settings.layout.anchor_day = "Monday".to_string();
        storage.save_settings(&settings)?;

        let settings = storage.load_settings()?;
        let page = vec![
            fragment("Monday", 100.0, 720.0),
            fragment("Tuesday", 200.0, 720.0),
            fragment("1", 20.0, 600.0),
            fragment("08:00", 20.0, 600.0),
            fragment("Math", 105.0, 590.0),
        ];
        let doc = parse_document(&VecSource::new(vec![page]), &settings.layout)?;
        assert_eq!(doc.entries.len(), 1);
        assert_eq!(doc.entries[0].day, "Monday");
        assert_eq!(doc.entries[0].teacher, "N/A");
        Ok(())
    }

    #[test]
    fn unreadable_page_fails_the_document() {
        let source = VecSource::new(vec![sample_page()]);
        struct Truncated(VecSource);
        impl FragmentSource for Truncated {
            fn page_count(&self) -> anyhow::Result<u32> {
                Ok(2)
            }
            fn page_fragments(&self, page_index: u32) -> anyhow::Result<Vec<TextFragment>> {
                self.0.page_fragments(page_index)
            }
        }

        let err = parse_document(&Truncated(source), &LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, TimetableError::Processing { .. }));
        assert_eq!(err.to_string(), "failed to read page 2");
    }
}
