//! # Shelfsync Storage
//!
//! Local state store trait and implementations for Shelfsync.
//!
//! A state store is the host application's flat key/value map of
//! synchronizable entries. Stores are **opaque**: they persist whatever
//! values they are given and know nothing about merge rules.
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and embedding
//! - [`FileStore`] - Canonical CBOR file with an exclusive lock and atomic rewrites
//!
//! ## Example
//!
//! ```rust
//! use shelfsync_codec::{Value, ValueMap};
//! use shelfsync_storage::{InMemoryStore, StateStore};
//!
//! let store = InMemoryStore::new();
//! let mut entries = ValueMap::new();
//! entries.insert("completedBooks".into(), Value::from(vec!["b1"]));
//! store.set_all(&entries).unwrap();
//! assert_eq!(store.get_all().unwrap(), entries);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::{FileStore, LOCK_FILE, STATE_FILE, STATE_TEMP};
pub use memory::InMemoryStore;
pub use store::StateStore;
