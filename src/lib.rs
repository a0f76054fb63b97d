pub mod accounts;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod inventory;
pub mod listing;
pub mod models;
pub mod session;
pub mod storage;
mod utils;
pub mod validation;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

pub use accounts::{AccountError, AccountStore};
pub use config::{AppConfig, ConfigStore};
pub use dashboard::DashboardSummary;
pub use error::ErrorKind;
pub use inventory::{EventRepository, Inventory, InventoryError};
pub use listing::EventFilter;
pub use models::{EventId, EventRecord, EventStatus, EventUpdate, NewEvent, User};
pub use session::{Role, Session, SessionError};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StorageError};

fn init_tracing(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    // A subscriber may already be installed by an embedding application.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Opens the configured store, seeds it if asked to, and logs a summary of
/// the current inventory.
pub fn run() -> anyhow::Result<()> {
    let config_store = ConfigStore::load();
    let file_config = config_store.read();
    init_tracing(&file_config);
    if let Some(err) = config_store.load_error() {
        tracing::warn!(path = %config_store.path().display(), "using default config: {err}");
    }
    let config = file_config.with_env_overrides();

    let path = config.database_path();
    let store = SqliteStore::open(&path)
        .with_context(|| format!("failed to open event store at {}", path.display()))?;
    let inventory = Inventory::new(store)
        .with_ticket_price(config.ticket_price)
        .with_max_write_retries(config.max_write_retries);

    if config.seed_demo_event {
        inventory.seed_if_empty().context("failed to seed demo event")?;
    }

    let events = inventory.list().context("failed to list events")?;
    let summary = DashboardSummary::from_events(&events);
    tracing::info!(
        events = summary.total_events,
        attendees = summary.total_attendees,
        revenue = summary.total_revenue,
        full = summary.count_by_status(EventStatus::Full),
        almost_full = summary.count_by_status(EventStatus::AlmostFull),
        "inventory loaded from {}",
        path.display()
    );
    for stats in &summary.events {
        tracing::info!(
            id = stats.id,
            seats_left = stats.seats_left,
            status = stats.status.as_str(),
            "{}",
            stats.title
        );
    }

    Ok(())
}
