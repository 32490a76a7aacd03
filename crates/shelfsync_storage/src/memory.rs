//! In-memory state store.

use crate::error::StorageResult;
use crate::store::StateStore;
use parking_lot::RwLock;
use shelfsync_codec::{Value, ValueMap};

/// A state store held entirely in memory.
///
/// Suitable for unit tests, integration tests and hosts that persist state
/// through their own means.
///
/// # Example
///
/// ```rust
/// use shelfsync_codec::Value;
/// use shelfsync_storage::{InMemoryStore, StateStore};
///
/// let store = InMemoryStore::new();
/// store.set("progress:b1", Value::Float(0.5)).unwrap();
/// assert_eq!(store.get("progress:b1").unwrap(), Some(Value::Float(0.5)));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<ValueMap>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing entries.
    #[must_use]
    pub fn with_entries(entries: ValueMap) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl StateStore for InMemoryStore {
    fn get_all(&self) -> StorageResult<ValueMap> {
        Ok(self.entries.read().clone())
    }

    fn set_all(&self, entries: &ValueMap) -> StorageResult<()> {
        let mut stored = self.entries.write();
        for (key, value) in entries {
            stored.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_store_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert!(store.get_all().unwrap().is_empty());
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn set_all_upserts_without_removing() {
        let store = InMemoryStore::new();
        store.set("theme", Value::from("dark")).unwrap();
        store.set("completedBooks", Value::from(vec!["b1"])).unwrap();

        let mut update = ValueMap::new();
        update.insert("theme".into(), Value::from("light"));
        update.insert("progress:b1".into(), Value::Float(0.3));
        store.set_all(&update).unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all["theme"], Value::from("light"));
        assert_eq!(all["completedBooks"], Value::from(vec!["b1"]));
    }

    #[test]
    fn shared_through_arc() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        let handle = std::sync::Arc::clone(&store);
        handle.set("k", Value::Integer(1)).unwrap();
        assert_eq!(store.len(), 1);
    }
}
