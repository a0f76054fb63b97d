use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ErrorKind;
use crate::models::{EventId, EventRecord, EventUpdate, NewEvent};
use crate::storage::{self, KeyValueStore, StorageError};
use crate::utils;
use crate::validation;

pub const EVENTS_KEY: &str = "events";
pub const DEFAULT_TICKET_PRICE: u64 = 100;
pub const DEFAULT_MAX_WRITE_RETRIES: u32 = 8;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("seats left cannot exceed total capacity")]
    SeatsLeftExceedsCapacity,
    #[error("seats left cannot be negative")]
    SeatsLeftNegative,
    #[error("revenue must be a non-negative amount")]
    InvalidRevenue,
    #[error("capacity {capacity} is below the {attendees} tickets already sold")]
    CapacityBelowAttendees { capacity: u32, attendees: u32 },
    #[error("seats left must equal capacity minus attendees ({expected}), got {submitted}")]
    SeatsLeftMismatch { submitted: i64, expected: u32 },
    #[error("at least 1 ticket required")]
    InvalidTicketCount,
    #[error("invalid email {0:?}: use a gmail.com, gmail.in or gmail.org address")]
    InvalidEmail(String),
    #[error("not enough seats available: requested {requested}, {available} left")]
    NotEnoughSeats { requested: u32, available: u32 },
    #[error("event {0} not found")]
    NotFound(EventId),
    #[error("stored events are corrupt: {0}")]
    Corrupt(serde_json::Error),
    #[error("events changed concurrently {0} times in a row; giving up")]
    Conflict(u32),
    #[error("failed to encode events: {0}")]
    Encode(serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl InventoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_)
            | Self::SeatsLeftExceedsCapacity
            | Self::SeatsLeftNegative
            | Self::InvalidRevenue
            | Self::CapacityBelowAttendees { .. }
            | Self::SeatsLeftMismatch { .. }
            | Self::InvalidTicketCount
            | Self::InvalidEmail(_)
            | Self::NotEnoughSeats { .. } => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Corrupt(_) => ErrorKind::StorageCorruption,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Encode(_) | Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;

/// The operations views perform against the event collection.
pub trait EventRepository {
    /// All events in insertion order.
    fn list(&self) -> Result<Vec<EventRecord>>;

    fn get(&self, id: EventId) -> Result<EventRecord>;

    fn create(&self, fields: NewEvent) -> Result<EventRecord>;

    fn update(&self, id: EventId, fields: EventUpdate) -> Result<EventRecord>;

    /// Sells `tickets` seats of event `id` to `email`.
    fn register_tickets(&self, id: EventId, email: &str, tickets: u32) -> Result<EventRecord>;

    /// Removes the event, returning what was removed.
    fn delete(&self, id: EventId) -> Result<EventRecord>;
}

pub struct Inventory<S> {
    store: S,
    ticket_price: u64,
    max_write_retries: u32,
}

impl<S: KeyValueStore> Inventory<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            ticket_price: DEFAULT_TICKET_PRICE,
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
        }
    }

    pub fn with_ticket_price(mut self, price: u64) -> Self {
        self.ticket_price = price;
        self
    }

    pub fn with_max_write_retries(mut self, retries: u32) -> Self {
        self.max_write_retries = retries;
        self
    }

    pub fn ticket_price(&self) -> u64 {
        self.ticket_price
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Like [`EventRepository::list`], but reports a corrupt blob instead of
    /// falling back to an empty collection or skipping undecodable records.
    pub fn list_strict(&self) -> Result<Vec<EventRecord>> {
        let snapshot = storage::read_collection(&self.store, EVENTS_KEY)?;
        if let Some(err) = snapshot.corruption {
            return Err(InventoryError::Corrupt(err));
        }
        match snapshot.rejected.into_iter().next() {
            Some((_, err)) => Err(InventoryError::Corrupt(err)),
            None => Ok(snapshot.items),
        }
    }

    /// Writes the demo event when there are no events yet. Returns whether
    /// anything was written.
    pub fn seed_if_empty(&self) -> Result<bool> {
        if !self.load()?.is_empty() {
            return Ok(false);
        }
        let seeded = self.mutate("seed", |events| {
            if !events.is_empty() {
                return Ok(false);
            }
            events.push(demo_event());
            Ok(true)
        })?;
        if seeded {
            info!("seeded demo event");
        }
        Ok(seeded)
    }

    /// Replaces the stored collection wholesale.
    pub fn persist(&self, events: &[EventRecord]) -> Result<()> {
        let replacement = events.to_vec();
        self.mutate("persist", |current| {
            current.clone_from(&replacement);
            Ok(())
        })
    }

    fn load(&self) -> Result<Vec<EventRecord>> {
        let snapshot = storage::read_collection(&self.store, EVENTS_KEY)?;
        if let Some(err) = snapshot.corruption {
            warn!("stored events are corrupt, treating as empty: {err}");
        }
        Ok(snapshot.items)
    }

    /// Runs `apply` against the current collection and writes the result back
    /// with compare-and-swap, retrying from a fresh read when another writer
    /// won the race. An `Err` from `apply` aborts without writing.
    fn mutate<T, F>(&self, op: &'static str, mut apply: F) -> Result<T>
    where
        F: FnMut(&mut Vec<EventRecord>) -> Result<T>,
    {
        for attempt in 0..=self.max_write_retries {
            let mut snapshot =
                storage::read_collection::<EventRecord, _>(&self.store, EVENTS_KEY)?;
            if let Some(err) = &snapshot.corruption {
                warn!(op, "stored events are corrupt, rewriting from empty: {err}");
            }
            let mut events = std::mem::take(&mut snapshot.items);
            let outcome = apply(&mut events)?;

            let payload = snapshot.encode(&events).map_err(InventoryError::Encode)?;
            if self
                .store
                .compare_and_swap(EVENTS_KEY, snapshot.version, &payload)?
            {
                return Ok(outcome);
            }
            debug!(op, attempt, "events changed underneath, retrying");
        }
        Err(InventoryError::Conflict(self.max_write_retries + 1))
    }
}

impl<S: KeyValueStore> EventRepository for Inventory<S> {
    fn list(&self) -> Result<Vec<EventRecord>> {
        self.load()
    }

    fn get(&self, id: EventId) -> Result<EventRecord> {
        self.load()?
            .into_iter()
            .find(|event| event.id == id)
            .ok_or(InventoryError::NotFound(id))
    }

    fn create(&self, fields: NewEvent) -> Result<EventRecord> {
        let title = validation::required(&fields.title).ok_or(InventoryError::MissingField("title"))?;
        let date = validation::required(&fields.date).ok_or(InventoryError::MissingField("date"))?;
        let location = validation::required(&fields.location)
            .ok_or(InventoryError::MissingField("location"))?;
        let category = validation::required(&fields.category)
            .ok_or(InventoryError::MissingField("category"))?;
        let capacity = fields
            .capacity
            .ok_or(InventoryError::MissingField("capacity"))?;

        let created = self.mutate("create", |events| {
            let record = EventRecord {
                id: utils::next_id(events.iter().map(|event| event.id)),
                title: title.to_string(),
                date: date.to_string(),
                location: location.to_string(),
                category: category.to_string(),
                capacity,
                attendees: 0,
                revenue: 0.0,
                description: fields.description.clone().unwrap_or_default(),
            };
            events.push(record.clone());
            Ok(record)
        })?;

        info!(id = created.id, title = %created.title, capacity, "event created");
        Ok(created)
    }

    fn update(&self, id: EventId, fields: EventUpdate) -> Result<EventRecord> {
        let title = validation::required(&fields.title).ok_or(InventoryError::MissingField("title"))?;
        let date = validation::required(&fields.date).ok_or(InventoryError::MissingField("date"))?;
        let location = validation::required(&fields.location)
            .ok_or(InventoryError::MissingField("location"))?;
        if let Some(seats_left) = fields.seats_left {
            if seats_left > i64::from(fields.capacity) {
                return Err(InventoryError::SeatsLeftExceedsCapacity);
            }
            if seats_left < 0 {
                return Err(InventoryError::SeatsLeftNegative);
            }
        }
        if !fields.revenue.is_finite() || fields.revenue < 0.0 {
            return Err(InventoryError::InvalidRevenue);
        }

        let updated = self.mutate("update", |events| {
            let event = events
                .iter_mut()
                .find(|event| event.id == id)
                .ok_or(InventoryError::NotFound(id))?;

            if fields.capacity < event.attendees {
                return Err(InventoryError::CapacityBelowAttendees {
                    capacity: fields.capacity,
                    attendees: event.attendees,
                });
            }
            let expected = fields.capacity - event.attendees;
            if let Some(submitted) = fields.seats_left {
                if submitted != i64::from(expected) {
                    return Err(InventoryError::SeatsLeftMismatch {
                        submitted,
                        expected,
                    });
                }
            }

            event.title = title.to_string();
            event.date = date.to_string();
            event.location = location.to_string();
            event.capacity = fields.capacity;
            event.revenue = fields.revenue;
            event.description = fields.description.clone();
            Ok(event.clone())
        })?;

        info!(id, capacity = updated.capacity, "event updated");
        Ok(updated)
    }

    fn register_tickets(&self, id: EventId, email: &str, tickets: u32) -> Result<EventRecord> {
        let price = self.ticket_price as f64;
        let updated = self.mutate("register", |events| {
            let event = events
                .iter_mut()
                .find(|event| event.id == id)
                .ok_or(InventoryError::NotFound(id))?;

            if !validation::is_gmail_address(email.trim()) {
                return Err(InventoryError::InvalidEmail(email.to_string()));
            }
            if tickets == 0 {
                return Err(InventoryError::InvalidTicketCount);
            }
            let available = event.seats_left();
            if tickets > available {
                return Err(InventoryError::NotEnoughSeats {
                    requested: tickets,
                    available,
                });
            }

            event.attendees += tickets;
            event.revenue += f64::from(tickets) * price;
            Ok(event.clone())
        })?;

        info!(
            id,
            tickets,
            seats_left = updated.seats_left(),
            "tickets registered"
        );
        Ok(updated)
    }

    fn delete(&self, id: EventId) -> Result<EventRecord> {
        let removed = self.mutate("delete", |events| {
            let index = events
                .iter()
                .position(|event| event.id == id)
                .ok_or(InventoryError::NotFound(id))?;
            Ok(events.remove(index))
        })?;

        info!(id, title = %removed.title, "event deleted");
        Ok(removed)
    }
}

fn demo_event() -> EventRecord {
    EventRecord {
        id: 1,
        title: "Music Fest 2025".to_string(),
        date: "2025-10-20".to_string(),
        location: "Bangalore".to_string(),
        category: "Music".to_string(),
        capacity: 200,
        attendees: 150,
        revenue: 15_000.0,
        description: "An electrifying music event featuring top artists!".to_string(),
    }
}
