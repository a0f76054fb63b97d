pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// A stored value together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub value: String,
    pub version: u64,
}

pub trait KeyValueStore {
    /// Reads the current value of `key`, if present.
    fn get(&self, key: &str) -> Result<Option<Versioned>, StorageError>;

    /// Writes `value` only if the stored version still equals `expected`
    /// (`None` meaning "key absent"). Returns `false` when another writer got
    /// there first; nothing is written in that case.
    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: &str,
    ) -> Result<bool, StorageError>;

    /// Deletes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Versioned>, StorageError> {
        (**self).get(key)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: &str,
    ) -> Result<bool, StorageError> {
        (**self).compare_and_swap(key, expected, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<Versioned>, StorageError> {
        (**self).get(key)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: &str,
    ) -> Result<bool, StorageError> {
        (**self).compare_and_swap(key, expected, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// A collection decoded from its key, with the version needed to write it back.
///
/// Records that fail to decode are kept verbatim in `rejected` and written
/// back after the decoded ones. A blob that is not a JSON array at all comes
/// back empty with `corruption` set; its version is kept so the next write
/// replaces it.
#[derive(Debug)]
pub(crate) struct Snapshot<T> {
    pub items: Vec<T>,
    pub rejected: Vec<(Value, serde_json::Error)>,
    pub version: Option<u64>,
    pub corruption: Option<serde_json::Error>,
}

impl<T: Serialize> Snapshot<T> {
    /// Encodes `items` followed by the rejected records.
    pub fn encode(&self, items: &[T]) -> Result<String, serde_json::Error> {
        let mut values = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        values.extend(self.rejected.iter().map(|(raw, _)| raw.clone()));
        serde_json::to_string(&values)
    }
}

pub(crate) fn read_collection<T, S>(store: &S, key: &str) -> Result<Snapshot<T>, StorageError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(stored) = store.get(key)? else {
        return Ok(Snapshot {
            items: Vec::new(),
            rejected: Vec::new(),
            version: None,
            corruption: None,
        });
    };

    let mut items = Vec::new();
    let mut rejected = Vec::new();
    let corruption = match serde_json::from_str::<Vec<Value>>(&stored.value) {
        Ok(values) => {
            for raw in values {
                match T::deserialize(&raw) {
                    Ok(item) => items.push(item),
                    Err(err) => {
                        tracing::warn!(key, "keeping undecodable record as-is: {err}");
                        rejected.push((raw, err));
                    }
                }
            }
            None
        }
        Err(err) => Some(err),
    };
    Ok(Snapshot {
        items,
        rejected,
        version: Some(stored.version),
        corruption,
    })
}
