use std::{collections::HashMap, sync::Mutex};

use super::{KeyValueStore, StorageError, Versioned};

/// In-process [`KeyValueStore`]; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Versioned>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Versioned>, StorageError> {
        let guard = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: &str,
    ) -> Result<bool, StorageError> {
        let mut guard = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        let current = guard.get(key).map(|stored| stored.version);
        if current != expected {
            return Ok(false);
        }
        guard.insert(
            key.to_string(),
            Versioned {
                value: value.to_string(),
                version: current.map_or(1, |version| version + 1),
            },
        );
        Ok(true)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        guard.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_increase_on_every_write() {
        let store = MemoryStore::new();
        assert!(store.compare_and_swap("users", None, "[]").unwrap());
        assert!(store.compare_and_swap("users", Some(1), "[]").unwrap());
        assert!(store.compare_and_swap("users", Some(2), "[]").unwrap());
        assert_eq!(store.get("users").unwrap().unwrap().version, 3);
    }

    #[test]
    fn mismatched_expectation_leaves_value_alone() {
        let store = MemoryStore::new();
        store.compare_and_swap("users", None, "[\"a\"]").unwrap();
        assert!(!store.compare_and_swap("users", Some(5), "[]").unwrap());
        assert!(!store.compare_and_swap("users", None, "[]").unwrap());
        assert_eq!(store.get("users").unwrap().unwrap().value, "[\"a\"]");
    }
}
