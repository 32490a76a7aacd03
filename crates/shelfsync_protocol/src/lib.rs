//! # Shelfsync Protocol
//!
//! Snapshot format, key classification and merge rules for Shelfsync.
//!
//! This crate provides:
//! - [`Snapshot`] and its canonical CBOR byte format
//! - [`DeviceId`] for the origin tag carried by every snapshot
//! - [`StateKey`] classification of state keys into merge policies
//! - [`merge`], the pure two-way merge of local state with a remote payload
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Example
//!
//! ```
//! use chrono::Utc;
//! use shelfsync_codec::{Value, ValueMap};
//! use shelfsync_protocol::{merge, DeviceId, Snapshot};
//!
//! let phone = DeviceId::parse("phone").unwrap();
//! let laptop = DeviceId::parse("laptop").unwrap();
//!
//! let mut remote = ValueMap::new();
//! remote.insert("completedBooks".into(), Value::from(vec!["b2"]));
//! let bytes = Snapshot::new(laptop, Utc::now(), remote).encode().unwrap();
//!
//! let mut local = ValueMap::new();
//! local.insert("completedBooks".into(), Value::from(vec!["b1"]));
//!
//! let snapshot = Snapshot::decode(&bytes).unwrap();
//! let merged = merge(&local, &snapshot.payload, &phone, &snapshot.origin_device_id);
//! assert_eq!(merged["completedBooks"], Value::from(vec!["b1", "b2"]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod device;
mod error;
pub mod keys;
mod merge;
pub mod records;
mod snapshot;

pub use device::{DeviceId, MAX_DEVICE_ID_LEN};
pub use error::{SnapshotError, SnapshotResult};
pub use keys::{KeyKind, PolicyClass, StateKey};
pub use merge::{merge, merge_snapshot, merge_with_report, MergeReport};
pub use snapshot::{
    decode, encode, Snapshot, DEFAULT_MAX_SNAPSHOT_BYTES, MIN_SNAPSHOT_FORMAT_VERSION,
    SNAPSHOT_FORMAT_VERSION,
};
