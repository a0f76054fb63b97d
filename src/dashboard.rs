use serde::Serialize;

use crate::models::{EventId, EventRecord, EventStatus};

const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRevenue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventStats {
    pub id: EventId,
    pub title: String,
    pub attendees: u32,
    pub capacity: u32,
    pub seats_left: u32,
    pub fill_percent: f64,
    pub status: EventStatus,
}

/// Aggregates shown on the organizer dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_events: usize,
    pub total_revenue: f64,
    pub total_attendees: u64,
    /// Revenue per category, in order of first appearance.
    pub revenue_by_category: Vec<CategoryRevenue>,
    pub events: Vec<EventStats>,
}

impl DashboardSummary {
    pub fn from_events(events: &[EventRecord]) -> Self {
        let mut revenue_by_category: Vec<CategoryRevenue> = Vec::new();
        for event in events {
            let name = match event.category.trim() {
                "" => UNCATEGORIZED,
                name => name,
            };
            match revenue_by_category.iter_mut().find(|entry| entry.name == name) {
                Some(entry) => entry.value += event.revenue,
                None => revenue_by_category.push(CategoryRevenue {
                    name: name.to_string(),
                    value: event.revenue,
                }),
            }
        }

        Self {
            total_events: events.len(),
            total_revenue: events
                .iter().map(|event| event.revenue).sum(),
            total_attendees: events.iter().map(|event| u64::from(event.attendees)).sum(),
            revenue_by_category,
            events: events.iter().map(EventStats::from).collect(),
        }
    }

    pub fn count_by_status(&self, status: EventStatus) -> usize {
        self.events
            .iter()
            .filter(|stats| stats.status == status)
            .count()
    }
}

impl From<&EventRecord> for EventStats {
    fn from(event: &EventRecord) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            attendees: event.attendees,
            capacity: event.capacity,
            seats_left: event.seats_left(),
            fill_percent: event.fill_percent(),
            status: event.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: i64, category: &str, capacity: u32, attendees: u32) -> EventRecord {
        EventRecord {
            id,
            title: format!("Event {id}"),
            date: "2025-10-20".into(),
            location: "Bangalore".into(),
            category: category.into(),
            capacity,
            attendees,
            revenue: f64::from(attendees) * 100.0,
            description: String::new(),
        }
    }

    #[test]
    fn totals_and_categories() {
        let events = vec![
            event(1, "Music", 200, 150),
            event(2, "Tech", 10, 3),
            event(3, "Music", 50, 50),
            event(4, "", 5, 1),
        ];
        let summary = DashboardSummary::from_events(&events);

        assert_eq!(summary.total_events, 4);
        assert_eq!(summary.total_attendees, 204);
        assert_eq!(summary.total_revenue, 20_400.0);
        assert_eq!(
            summary.revenue_by_category,
            vec![
                CategoryRevenue { name: "Music".into(), value: 20_000.0 },
                CategoryRevenue { name: "Tech".into(), value: 300.0 },
                CategoryRevenue { name: "Uncategorized".into(), value: 100.0 },
            ]
        );
    }

    #[test]
    fn fractional_revenue_adds_up() {
        let mut edited = event(1, "Tech", 10, 1);
        edited.revenue = 99.5;
        let summary = DashboardSummary::from_events(&[edited, event(2, "Tech", 10, 2)]);
        assert_eq!(summary.total_revenue, 299.5);
        assert_eq!(summary.revenue_by_category[0].value, 299.5);
    }

    #[test]
    fn per_event_status() {
        let events = vec![
            event(1, "Music", 200, 150),
            event(2, "Music", 100, 80),
            event(3, "Music", 50, 50),
            event(4, "Music", 0, 0),
        ];
        let summary = DashboardSummary::from_events(&events);
        let statuses: Vec<_> = summary.events.iter().map(|stats| stats.status).collect();
        assert_eq!(
            statuses,
            vec![
                EventStatus::Open,
                EventStatus::AlmostFull,
                EventStatus::Full,
                EventStatus::Full
            ]
        );
        assert_eq!(summary.count_by_status(EventStatus::Full), 2);
        assert_eq!(summary.events[0].seats_left, 50);
    }

    #[test]
    fn empty_collection() {
        let summary = DashboardSummary::from_events(&[]);
        assert_eq!(summary.total_events, 0);
        assert_eq!(summary.total_revenue, 0.0);
        assert!(summary.revenue_by_category.is_empty());
    }
}
