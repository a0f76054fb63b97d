use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};

use crate::inventory::{DEFAULT_MAX_WRITE_RETRIES, DEFAULT_TICKET_PRICE};
use crate::utils;

pub const DB_ENV: &str = "EVENTSPHERE_DB";
pub const TICKET_PRICE_ENV: &str = "EVENTSPHERE_TICKET_PRICE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file; the platform data directory when unset.
    pub database_path: Option<PathBuf>,
    /// Revenue credited per registered ticket.
    pub ticket_price: u64,
    pub max_write_retries: u32,
    /// Write the demo event into an empty store on startup.
    pub seed_demo_event: bool,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            ticket_price: DEFAULT_TICKET_PRICE,
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
            seed_demo_event: true,
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(utils::database_path)
    }

    /// Applies `EVENTSPHERE_DB` and `EVENTSPHERE_TICKET_PRICE` when set.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|name| std::env::var(name).ok());
        self
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(DB_ENV).filter(|path| !path.trim().is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(TICKET_PRICE_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(price) => self.ticket_price = price,
                Err(err) => tracing::warn!(value = %raw, "ignoring {TICKET_PRICE_ENV}: {err}"),
            }
        }
    }
}

/// Config file held in memory and written through on every update.
pub struct ConfigStore {
    path: PathBuf,
    data: Mutex<AppConfig>,
    load_error: Option<String>,
}

impl ConfigStore {
    pub fn load() -> Self {
        Self::load_from(utils::config_path())
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (data, load_error) = match read_config(&path) {
            Ok(data) => (data, None),
            Err(err) => (AppConfig::default(), Some(err)),
        };
        Self {
            path,
            data: Mutex::new(data),
            load_error,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Why the file could not be read, when defaults were used instead.
    /// Loading happens before logging is installed, so callers report this.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn read(&self) -> AppConfig {
        match self.data.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update<F>(&self, transform: F) -> Result<AppConfig, String>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| "config mutex poisoned".to_string())?;
        let mut next = guard.clone();
        transform(&mut next);
        write_config(&self.path, &next)?;
        *guard = next;
        Ok(guard.clone())
    }
}

fn read_config(path: &Path) -> Result<AppConfig, String> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str(&contents).map_err(|err| err.to_string())
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), String> {
    utils::ensure_parent(path).map_err(|err| err.to_string())?;
    let contents = serde_json::to_string_pretty(config).map_err(|err| err.to_string())?;
    fs::write(path, contents).map_err(|err| err.to_string())
}
