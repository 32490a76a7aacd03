//! State store trait definition.

use crate::error::StorageResult;
use shelfsync_codec::{Value, ValueMap};

/// The host application's local key/value state.
///
/// Stores are **opaque** to key semantics: they never interpret keys or
/// values, and merge rules live entirely in the protocol crate.
///
/// # Invariants
///
/// - `set_all` upserts; keys absent from the argument are left untouched
/// - Nothing in the sync path ever removes a key
/// - `get_all` after `set_all(m)` contains every entry of `m`
/// - Stores must be `Send + Sync` for use from the sync scheduler
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing and embedding
/// - [`super::FileStore`] - For persistent single-writer state
pub trait StateStore: Send + Sync {
    /// Returns every stored entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get_all(&self) -> StorageResult<ValueMap>;

    /// Upserts every entry in `entries`.
    ///
    /// # Errors
    ///
    /// Returns an error if the update cannot be made durable. On error, the
    /// stored state is either fully updated or untouched.
    fn set_all(&self, entries: &ValueMap) -> StorageResult<()>;

    /// Returns one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.get_all()?.remove(key))
    }

    /// Upserts one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the update cannot be made durable.
    fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        let mut entry = ValueMap::new();
        entry.insert(key.to_string(), value);
        self.set_all(&entry)
    }
}

impl<S: StateStore + ?Sized> StateStore for std::sync::Arc<S> {
    fn get_all(&self) -> StorageResult<ValueMap> {
        (**self).get_all()
    }

    fn set_all(&self, entries: &ValueMap) -> StorageResult<()> {
        (**self).set_all(entries)
    }

    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        (**self).set(key, value)
    }
}
