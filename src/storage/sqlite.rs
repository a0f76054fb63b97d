use std::{path::Path, time::Duration};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{KeyValueStore, StorageError, Versioned};
use crate::utils;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed [`KeyValueStore`].
///
/// Several handles (threads or processes) may open the same file; the version
/// check inside each `UPDATE` keeps their writes from clobbering each other.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(utils::database_path())
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        utils::ensure_parent(path)?;
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self { conn };
        store.init_schema()?;
        tracing::debug!(path = %path.display(), "opened sqlite store");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                version INTEGER NOT NULL,
                updated_at_utc TEXT NOT NULL
            );",
        )
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Versioned>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT value, version FROM kv WHERE key = ?1",
                params![key],
                |row| {
                    let value: String = row.get(0)?;
                    let version: i64 = row.get(1)?;
                    Ok((value, version))
                },
            )
            .optional()?;

        Ok(row.map(|(value, version)| Versioned {
            value,
            version: u64::try_from(version).unwrap_or_default(),
        }))
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: &str,
    ) -> Result<bool, StorageError> {
        let now = Utc::now().to_rfc3339();
        let changed = match expected {
            None => self.conn.execute(
                "INSERT INTO kv (key, value, version, updated_at_utc)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(key) DO NOTHING",
                params![key, value, now],
            )?,
            Some(version) => {
                let version = i64::try_from(version).unwrap_or(i64::MAX);
                self.conn.execute(
                    "UPDATE kv SET value = ?2, version = version + 1, updated_at_utc = ?4
                     WHERE key = ?1 AND version = ?3",
                    params![key, value, version, now],
                )?
            }
        };
        Ok(changed == 1)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_only_succeeds_when_key_is_absent() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.compare_and_swap("events", None, "[]").unwrap());
        assert!(!store.compare_and_swap("events", None, "[1]").unwrap());

        let stored = store.get("events").unwrap().unwrap();
        assert_eq!(stored.value, "[]");
        assert_eq!(stored.version, 1);
    }

    #[test]
    fn stale_version_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.compare_and_swap("events", None, "[]").unwrap();
        assert!(store.compare_and_swap("events", Some(1), "[1]").unwrap());
        assert!(!store.compare_and_swap("events", Some(1), "[2]").unwrap());

        let stored = store.get("events").unwrap().unwrap();
        assert_eq!(stored.value, "[1]");
        assert_eq!(stored.version, 2);
    }

    #[test]
    fn remove_clears_the_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.compare_and_swap("es_token", None, "mock.e30=.sig").unwrap();
        store.remove("es_token").unwrap();
        store.remove("es_token").unwrap();
        assert!(store.get("es_token").unwrap().is_none());
    }

    #[test]
    fn two_handles_share_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.sqlite");
        let first = SqliteStore::open(&path).unwrap();
        let second = SqliteStore::open(&path).unwrap();

        assert!(first.compare_and_swap("events", None, "[]").unwrap());
        let seen = second.get("events").unwrap().unwrap();
        assert!(second
            .compare_and_swap("events", Some(seen.version), "[7]")
            .unwrap());
        assert!(!first.compare_and_swap("events", Some(1), "[8]").unwrap());
        assert_eq!(first.get("events").unwrap().unwrap().value, "[7]");
    }
}
