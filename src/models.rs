use serde::{Deserialize, Serialize};

pub type EventId = i64;

/// One bookable event.
///
/// Seats left are derived from `capacity` and `attendees` rather than stored;
/// blobs written by older clients may still carry a `seatsLeft` field, which
/// is ignored on read.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub id: EventId, // creation time, unix millis
    pub title: String,
    pub date: String,
    pub location: String,
    #[serde(default)]
    pub category: String,
    pub capacity: u32,
    #[serde(default)]
    pub attendees: u32,
    /// Currency units; edits may leave fractional amounts.
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub description: String,
}

impl EventRecord {
    pub fn seats_left(&self) -> u32 {
        self.capacity.saturating_sub(self.attendees)
    }

    /// Share of capacity already sold, in percent. An event with no capacity
    /// counts as completely filled.
    pub fn fill_percent(&self) -> f64 {
        if self.capacity == 0 {
            return 100.0;
        }
        f64::from(self.attendees) / f64::from(self.capacity) * 100.0
    }

    pub fn status(&self) -> EventStatus {
        EventStatus::from_fill_percent(self.fill_percent())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EventStatus {
    Open,
    AlmostFull,
    Full,
}

impl EventStatus {
    pub fn from_fill_percent(percent: f64) -> Self {
        if percent >= 100.0 {
            Self::Full
        } else if percent >= 80.0 {
            Self::AlmostFull
        } else {
            Self::Open
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::AlmostFull => "almost-full",
            Self::Full => "full",
        }
    }
}

/// Fields submitted when creating an event. Everything except the
/// description is required.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct NewEvent {
    pub title: String,
    pub date: String,
    pub location: String,
    pub category: String,
    pub capacity: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Fields submitted from the edit form.
///
/// `seats_left` is signed because the form can submit a negative number,
/// which is a validation error rather than a parse error. Attendees and
/// category are not editable.
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub title: String,
    pub date: String,
    pub location: String,
    pub capacity: u32,
    #[serde(default)]
    pub seats_left: Option<i64>,
    pub revenue: f64,
    #[serde(default)]
    pub description: String,
}

impl EventUpdate {
    /// Prefills the form from the stored record.
    pub fn from_record(record: &EventRecord) -> Self {
        Self {
            title: record.title.clone(),
            date: record.date.clone(),
            location: record.location.clone(),
            capacity: record.capacity,
            seats_left: Some(i64::from(record.seats_left())),
            revenue: record.revenue,
            description: record.description.clone(),
        }
    }
}

/// A registered account.
///
/// New accounts only carry the SHA-256 digest. Accounts written by older
/// clients hold the clear `password` until their next successful login.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(capacity: u32, attendees: u32) -> EventRecord {
        EventRecord {
            id: 1,
            title: "Demo".into(),
            date: "2025-01-01".into(),
            location: "X".into(),
            category: "Tech".into(),
            capacity,
            attendees,
            revenue: f64::from(attendees) * 100.0,
            description: String::new(),
        }
    }

    #[test]
    fn seats_left_is_derived() {
        assert_eq!(record(10, 3).seats_left(), 7);
        assert_eq!(record(10, 12).seats_left(), 0);
    }

    #[test]
    fn status_thresholds() {
        assert_eq!(record(10, 7).status(), EventStatus::Open);
        assert_eq!(record(10, 8).status(), EventStatus::AlmostFull);
        assert_eq!(record(10, 10).status(), EventStatus::Full);
        assert_eq!(record(10, 11).status(), EventStatus::Full);
    }

    #[test]
    fn zero_capacity_counts_as_full() {
        let event = record(0, 0);
        assert_eq!(event.fill_percent(), 100.0);
        assert_eq!(event.status(), EventStatus::Full);
    }

    #[test]
    fn legacy_blob_with_seats_left_and_missing_counters() {
        let raw = r#"{"id":1,"title":"Music Fest 2025","date":"2025-10-20",
            "location":"Mumbai","category":"Music","capacity":200,"seatsLeft":3}"#;
        let event: EventRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(event.attendees, 0);
        assert_eq!(event.revenue, 0.0);
        assert_eq!(event.seats_left(), 200);
    }

    #[test]
    fn fractional_revenue_is_kept() {
        let raw = r#"{"id":7,"title":"Edited","date":"2025-03-01","location":"Pune",
            "category":"Tech","capacity":50,"attendees":2,"seatsLeft":48,"revenue":99.5}"#;
        let event: EventRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(event.revenue, 99.5);
        let back: EventRecord = serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn status_serializes_kebab_case() {
        let json = serde_json::to_string(&EventStatus::AlmostFull).unwrap();
        assert_eq!(json, "\"almost-full\"");
    }
}
