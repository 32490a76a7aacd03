//! State fixtures and device helpers.
//!
//! Provides builders for library states and convenience wrappers for
//! setting up devices that share a folder.

use shelfsync_codec::{Value, ValueMap};
use shelfsync_protocol::keys;
use shelfsync_protocol::records::{BookmarkRecord, ReviewRecord, UnlockRecord};
use shelfsync_protocol::DeviceId;
use shelfsync_storage::{InMemoryStore, StateStore};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Builds a library state entry by entry.
#[derive(Debug, Clone, Default)]
pub struct StateBuilder {
    entries: ValueMap,
}

impl StateBuilder {
    /// Starts an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the completed-books set.
    #[must_use]
    pub fn completed(mut self, books: &[&str]) -> Self {
        self.entries
            .insert(keys::completed_books(), Value::from(books.to_vec()));
        self
    }

    /// Sets reading progress and its companion timestamp.
    #[must_use]
    pub fn progress(mut self, book: &str, progress: f64, played_at: i64) -> Self {
        self.entries.insert(keys::progress(book), Value::Float(progress));
        self.entries
            .insert(keys::last_played_at(book), Value::Integer(played_at));
        self
    }

    /// Sets a playback position and its companion timestamp.
    #[must_use]
    pub fn position(mut self, track: &str, seconds: i64, played_at: i64) -> Self {
        self.entries.insert(keys::position(track), Value::Integer(seconds));
        self.entries
            .insert(keys::last_played_at(track), Value::Integer(played_at));
        self
    }

    /// Adds a review.
    #[must_use]
    pub fn review(mut self, book: &str, text: &str, timestamp: i64) -> Self {
        let record = ReviewRecord {
            book_id: book.to_string(),
            text: text.to_string(),
            rating: None,
            timestamp,
        };
        let reviews = self
            .entries
            .entry(keys::reviews())
            .or_insert_with(|| Value::Map(ValueMap::new()));
        if let Value::Map(reviews) = reviews {
            reviews.insert(book.to_string(), record.to_value());
        }
        self
    }

    /// Appends a bookmark to an entity's list.
    #[must_use]
    pub fn bookmark(mut self, entity: &str, bookmark: BookmarkRecord) -> Self {
        push_to_list(&mut self.entries, keys::bookmarks(entity), bookmark.to_value());
        self
    }

    /// Sets an entity's tags.
    #[must_use]
    pub fn tags(mut self, entity: &str, tags: &[&str]) -> Self {
        self.entries.insert(keys::tags(entity), Value::from(tags.to_vec()));
        self
    }

    /// Appends an unlock record.
    #[must_use]
    pub fn unlock(mut self, id: &str, unlocked_at: i64) -> Self {
        let record = UnlockRecord {
            id: id.to_string(),
            unlocked_at,
            extra: ValueMap::new(),
        };
        push_to_list(&mut self.entries, keys::unlocks(), record.to_value());
        self
    }

    /// Sets an arbitrary entry.
    #[must_use]
    pub fn entry(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }

    /// Returns the built state.
    #[must_use]
    pub fn build(self) -> ValueMap {
        self.entries
    }
}

fn push_to_list(entries: &mut ValueMap, key: String, item: Value) {
    let list = entries.entry(key).or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(items) = list {
        items.push(item);
    }
}

/// A device identity paired with an in-memory store.
#[derive(Debug, Clone)]
pub struct TestDevice {
    /// The device id.
    pub id: DeviceId,
    /// The device's local state.
    pub store: Arc<InMemoryStore>,
}

impl TestDevice {
    /// Creates a device holding `state`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid device id.
    pub fn new(name: &str, state: ValueMap) -> Self {
        Self {
            id: DeviceId::parse(name).expect("valid device id"),
            store: Arc::new(InMemoryStore::with_entries(state)),
        }
    }

    /// Returns the current local state.
    pub fn state(&self) -> ValueMap {
        self.store.get_all().expect("in-memory store never fails")
    }

    /// Returns one local entry.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state().remove(key)
    }
}

/// A temporary shared folder, removed on drop.
#[derive(Debug)]
pub struct SharedFolder {
    dir: TempDir,
}

impl SharedFolder {
    /// Creates an empty shared folder.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Path of the folder.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for SharedFolder {
    fn default() -> Self {
        Self::new()
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Device A of the two-device exchange: finished b1, halfway through it again.
    pub fn device_a() -> TestDevice {
        TestDevice::new(
            "device-a",
            StateBuilder::new()
                .completed(&["b1"])
                .progress("b1", 0.5, 1000)
                .build(),
        )
    }

    /// Device B of the two-device exchange: finished b2, further into b1 later.
    pub fn device_b() -> TestDevice {
        TestDevice::new(
            "device-b",
            StateBuilder::new()
                .completed(&["b2"])
                .progress("b1", 0.9, 2000)
                .build(),
        )
    }

    /// A state exercising every key kind.
    pub fn full_library() -> ValueMap {
        StateBuilder::new()
            .completed(&["b1", "b2"])
            .progress("b3", 0.42, 5000)
            .position("t1", 93, 5100)
            .review("b1", "Loved the ending", 4000)
            .bookmark(
                "b3",
                BookmarkRecord {
                    id: None,
                    position: Value::Integer(12),
                    note: "quote".into(),
                    timestamp: 4500,
                },
            )
            .tags("b3", &["scifi", "favorites"])
            .unlock("first-finish", 3000)
            .entry("theme", "dark")
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_writes_companions() {
        let state = StateBuilder::new().progress("b1", 0.3, 77).build();
        assert_eq!(state["progress:b1"], Value::Float(0.3));
        assert_eq!(state["lastPlayedAt:b1"], Value::Integer(77));
    }

    #[test]
    fn builder_accumulates_records() {
        let state = StateBuilder::new()
            .review("b1", "one", 1)
            .review("b2", "two", 2)
            .unlock("u1", 1)
            .unlock("u2", 2)
            .build();
        assert_eq!(state["reviews"].as_map().map(|m| m.len()), Some(2));
        assert_eq!(state["unlocks"].as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn full_library_covers_every_kind() {
        assert_eq!(scenarios::full_library().len(), 10);
    }

    #[test]
    fn shared_folder_exists() {
        let folder = SharedFolder::new();
        assert!(folder.path().is_dir());
    }
}
