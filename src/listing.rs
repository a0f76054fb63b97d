use serde::Deserialize;

use crate::models::EventRecord;
use crate::validation;

/// Filters applied to the event listing. Blank fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventFilter {
    /// Substring of the title.
    pub search: String,
    pub category: String,
    /// Substring of the location.
    pub location: String,
    pub date: String,
}

impl EventFilter {
    pub fn matches(&self, event: &EventRecord) -> bool {
        if let Some(search) = validation::required(&self.search) {
            if !contains_ignore_case(&event.title, search) {
                return false;
            }
        }
        if let Some(category) = validation::required(&self.category) {
            if !event.category.trim().eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(location) = validation::required(&self.location) {
            if !contains_ignore_case(&event.location, location) {
                return false;
            }
        }
        if let Some(date) = validation::required(&self.date) {
            if !event.date.trim().eq_ignore_ascii_case(date) {
                return false;
            }
        }
        true
    }

    /// Keeps the matching events, preserving their order.
    pub fn apply<'a>(&self, events: &'a [EventRecord]) -> Vec<&'a EventRecord> {
        events.iter().filter(|event| self.matches(event)).collect()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: i64, title: &str, category: &str, location: &str, date: &str) -> EventRecord {
        EventRecord {
            id,
            title: title.into(),
            date: date.into(),
            location: location.into(),
            category: category.into(),
            capacity: 100,
            attendees: 0,
            revenue: 0.0,
            description: String::new(),
        }
    }

    fn catalogue() -> Vec<EventRecord> {
        vec![
            event(1, "Music Fest 2025", "Music", "Bangalore", "2025-10-20"),
            event(2, "FutureStack Tech Summit", "Technology", "Bengaluru", "2025-11-05"),
            event(3, "Indie Music Night", "music", "Delhi", "2025-12-15"),
        ]
    }

    fn ids(events: &[&EventRecord]) -> Vec<i64> {
        events.iter().map(|event| event.id).collect()
    }

    #[test]
    fn empty_filter_keeps_everything_in_order() {
        let events = catalogue();
        assert_eq!(ids(&EventFilter::default().apply(&events)), vec![1, 2, 3]);
    }

    #[test]
    fn title_search_is_case_insensitive_substring() {
        let events = catalogue();
        let filter = EventFilter {
            search: "MUSIC".into(),
            ..EventFilter::default()
        };
        assert_eq!(ids(&filter.apply(&events)), vec![1, 3]);
    }

    #[test]
    fn category_is_exact_but_case_insensitive() {
        let events = catalogue();
        let filter = EventFilter {
            category: "Music".into(),
            ..EventFilter::default()
        };
        assert_eq!(ids(&filter.apply(&events)), vec![1, 3]);

        let partial = EventFilter {
            category: "Tech".into(),
            ..EventFilter::default()
        };
        assert!(partial.apply(&events).is_empty());
    }

    #[test]
    fn filters_combine() {
        let events = catalogue();
        let filter = EventFilter {
            search: "music".into(),
            location: "del".into(),
            date: "2025-12-15".into(),
            ..EventFilter::default()
        };
        assert_eq!(ids(&filter.apply(&events)), vec![3]);
    }

    #[test]
    fn whitespace_only_fields_are_ignored() {
        let events = catalogue();
        let filter = EventFilter {
            search: "   ".into(),
            location: " ".into(),
            ..EventFilter::default()
        };
        assert_eq!(filter.apply(&events).len(), 3);
    }
}
