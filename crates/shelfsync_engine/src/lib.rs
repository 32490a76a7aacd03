//! # Shelfsync Engine
//!
//! Snapshot exchange orchestrator for Shelfsync.
//!
//! This crate provides:
//! - [`SyncEngine`] with `pulse_out` (export) and `pulse_in` (import and merge)
//! - [`SnapshotTransport`] with a shared-folder and an in-memory implementation
//! - [`DeviceIdentity`] for the persisted per-installation id
//! - [`spawn_periodic`] to run pulses on a tokio interval
//!
//! ## Architecture
//!
//! Each installation periodically publishes a full snapshot of its state to
//! one well-known file and merges whatever snapshot a peer left there:
//! 1. Read the shared snapshot, skip it if it is our own or unreadable
//! 2. Merge it into local state by per-key policy
//! 3. Publish our own state, now including the peer's contribution
//!
//! ## Key Invariants
//!
//! - Pulses within one process never overlap
//! - Local state is only written after a successful merge
//! - Keys are never removed from local state
//! - A self-authored snapshot is never merged
//! - Sync failures are reported, never fatal to the host

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod device;
mod engine;
mod error;
mod scheduler;
mod transport;

pub use config::{SyncConfig, DEFAULT_SNAPSHOT_NAME};
pub use device::{DeviceIdentity, DEVICE_ID_KEY};
pub use engine::{PulseInOutcome, PulseOutOutcome, SyncEngine, SyncStats};
pub use error::{SyncError, SyncResult};
pub use scheduler::{run_cycle, spawn_periodic, PulseCycle};
pub use transport::{FolderTransport, MemoryTransport, SnapshotTransport, STAGING_SUFFIX};
