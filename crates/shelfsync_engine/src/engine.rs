//! Pulse orchestration: export local state, import and merge a peer's.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::{FolderTransport, SnapshotTransport};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use shelfsync_codec::ValueMap;
use shelfsync_protocol::{merge_snapshot, DeviceId, MergeReport, Snapshot, SnapshotError};
use shelfsync_storage::StateStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a `pulse_out` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PulseOutOutcome {
    /// Sync is switched off.
    Disabled,
    /// No shared location is configured or reachable.
    Unavailable,
    /// A snapshot was published.
    Published {
        /// Number of state entries exported.
        keys: usize,
        /// Encoded snapshot size.
        bytes: usize,
    },
}

/// What a `pulse_in` did. Only [`PulseInOutcome::Merged`] touches local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PulseInOutcome {
    /// Sync is switched off.
    Disabled,
    /// No shared location is configured or reachable.
    Unavailable,
    /// No snapshot has been published yet.
    NothingToImport,
    /// The shared snapshot is malformed, unsupported or too large.
    Undecodable,
    /// The shared snapshot was written by this device.
    SelfEcho,
    /// The shared snapshot carries no entries.
    EmptyPayload,
    /// The shared snapshot was merged into local state.
    Merged(MergeReport),
}

/// Statistics about pulses.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Snapshots published.
    pub pulses_out: u64,
    /// Import attempts that reached the shared location.
    pub pulses_in: u64,
    /// Snapshots merged into local state.
    pub merges: u64,
    /// Local entries written by merges.
    pub keys_written: u64,
    /// Imports skipped as self-echo or empty.
    pub skipped: u64,
    /// Shared snapshots that could not be decoded.
    pub decode_failures: u64,
    /// Pulses aborted by an I/O or store error.
    pub failures: u64,
    /// Time of the last completed pulse.
    pub last_pulse_at: Option<DateTime<Utc>>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Drives snapshot export and import for one installation.
///
/// Construct one per process and share it behind an `Arc`. Pulses are
/// serialized internally; concurrent callers wait their turn.
pub struct SyncEngine {
    config: SyncConfig,
    device_id: DeviceId,
    store: Arc<dyn StateStore>,
    transport: Option<Arc<dyn SnapshotTransport>>,
    enabled: AtomicBool,
    pulse: Mutex<()>,
    stats: RwLock<SyncStats>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("device_id", &self.device_id)
            .field("config", &self.config)
            .field("enabled", &self.is_sync_enabled())
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Creates an engine exchanging through `transport`.
    pub fn new(
        config: SyncConfig,
        device_id: DeviceId,
        store: Arc<dyn StateStore>,
        transport: Arc<dyn SnapshotTransport>,
    ) -> Self {
        Self::build(config, device_id, store, Some(transport))
    }

    /// Creates an engine exchanging through the configured shared folder.
    ///
    /// Without a `shared_dir` every pulse reports `Unavailable`.
    pub fn from_config(config: SyncConfig, device_id: DeviceId, store: Arc<dyn StateStore>) -> Self {
        let transport = config.shared_dir.as_ref().map(|dir| {
            Arc::new(
                FolderTransport::new(dir, config.snapshot_name.clone())
                    .with_max_bytes(config.max_snapshot_bytes),
            ) as Arc<dyn SnapshotTransport>
        });
        Self::build(config, device_id, store, transport)
    }

    fn build(
        config: SyncConfig,
        device_id: DeviceId,
        store: Arc<dyn StateStore>,
        transport: Option<Arc<dyn SnapshotTransport>>,
    ) -> Self {
        Self {
            enabled: AtomicBool::new(config.enabled),
            config,
            device_id,
            store,
            transport,
            pulse: Mutex::new(()),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// This installation's device id.
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns true if pulses are currently enabled.
    pub fn is_sync_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Switches pulses on or off; takes effect at the next pulse.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    fn available_transport(&self) -> Option<&Arc<dyn SnapshotTransport>> {
        self.transport.as_ref().filter(|t| t.is_available())
    }

    fn record_failure(&self, operation: &'static str, error: &SyncError) {
        warn!(operation, error = %error, "sync pulse aborted");
        let mut stats = self.stats.write();
        stats.failures += 1;
        stats.last_error = Some(error.to_string());
    }

    /// Publishes a snapshot of the full local state stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read, the snapshot cannot be
    /// encoded or exceeds the size bound, or publishing fails. Local state
    /// is never modified.
    pub fn pulse_out(&self) -> SyncResult<PulseOutOutcome> {
        self.pulse_out_at(Utc::now())
    }

    /// Like [`SyncEngine::pulse_out`], stamping the snapshot with `now`.
    ///
    /// # Errors
    ///
    /// See [`SyncEngine::pulse_out`].
    pub fn pulse_out_at(&self, now: DateTime<Utc>) -> SyncResult<PulseOutOutcome> {
        let _guard = self.pulse.lock();

        if !self.is_sync_enabled() {
            debug!("pulse out skipped: sync disabled");
            return Ok(PulseOutOutcome::Disabled);
        }
        let Some(transport) = self.available_transport() else {
            debug!("pulse out skipped: shared location unavailable");
            return Ok(PulseOutOutcome::Unavailable);
        };

        match self.export(transport.as_ref(), now) {
            Ok(outcome) => {
                let mut stats = self.stats.write();
                stats.pulses_out += 1;
                stats.last_pulse_at = Some(now);
                Ok(outcome)
            }
            Err(e) => {
                self.record_failure("pulse_out", &e);
                Err(e)
            }
        }
    }

    fn export(
        &self,
        transport: &dyn SnapshotTransport,
        now: DateTime<Utc>,
    ) -> SyncResult<PulseOutOutcome> {
        let state = self.store.get_all()?;
        let keys = state.len();
        let bytes = Snapshot::new(self.device_id.clone(), now, state).encode()?;
        if bytes.len() > self.config.max_snapshot_bytes {
            return Err(SnapshotError::TooLarge {
                size: bytes.len(),
                max: self.config.max_snapshot_bytes,
            }
            .into());
        }

        transport.publish(&bytes)?;
        info!(keys, bytes = bytes.len(), device_id = %self.device_id, "published snapshot");
        Ok(PulseOutOutcome::Published {
            keys,
            bytes: bytes.len(),
        })
    }

    /// Reads the shared snapshot and merges it into local state.
    ///
    /// Malformed snapshots, self-authored snapshots and snapshots without
    /// entries are reported as outcomes, not errors, and leave local state
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the shared location or the store fails; local
    /// state is then untouched.
    pub fn pulse_in(&self) -> SyncResult<PulseInOutcome> {
        let _guard = self.pulse.lock();

        if !self.is_sync_enabled() {
            debug!("pulse in skipped: sync disabled");
            return Ok(PulseInOutcome::Disabled);
        }
        let Some(transport) = self.available_transport() else {
            debug!("pulse in skipped: shared location unavailable");
            return Ok(PulseInOutcome::Unavailable);
        };

        let result = self.import(transport.as_ref());
        if let Err(e) = &result {
            self.record_failure("pulse_in", e);
        }

        let mut stats = self.stats.write();
        stats.pulses_in += 1;
        if let Ok(outcome) = &result {
            match outcome {
                PulseInOutcome::Merged(report) => {
                    stats.merges += 1;
                    stats.keys_written += report.changed() as u64;
                }
                PulseInOutcome::Undecodable => stats.decode_failures += 1,
                PulseInOutcome::SelfEcho | PulseInOutcome::EmptyPayload => stats.skipped += 1,
                _ => {}
            }
            stats.last_pulse_at = Some(Utc::now());
        }
        drop(stats);
        result
    }

    fn import(&self, transport: &dyn SnapshotTransport) -> SyncResult<PulseInOutcome> {
        let bytes = match transport.read() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("no shared snapshot to import");
                return Ok(PulseInOutcome::NothingToImport);
            }
            Err(e) if e.is_decode_error() => {
                warn!(error = %e, "ignoring unreadable shared snapshot");
                return Ok(PulseInOutcome::Undecodable);
            }
            Err(e) => return Err(e),
        };

        let snapshot = match Snapshot::decode_with_limit(&bytes, self.config.max_snapshot_bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, bytes = bytes.len(), "ignoring undecodable shared snapshot");
                return Ok(PulseInOutcome::Undecodable);
            }
        };

        if snapshot.is_self_echo(&self.device_id) {
            debug!("shared snapshot is our own");
            return Ok(PulseInOutcome::SelfEcho);
        }
        if snapshot.payload.is_empty() {
            debug!(origin = %snapshot.origin_device_id, "shared snapshot has no entries");
            return Ok(PulseInOutcome::EmptyPayload);
        }

        let local = self.store.get_all()?;
        let (merged, report) = merge_snapshot(&local, &snapshot, &self.device_id);

        let changed = changed_entries(&local, merged);
        if !changed.is_empty() {
            self.store.set_all(&changed)?;
        }

        if !report.shape_fallbacks.is_empty() {
            warn!(keys = ?report.shape_fallbacks, "entries with unexpected shape took remote value");
        }
        info!(
            origin = %snapshot.origin_device_id,
            exported_at = %snapshot.timestamp,
            written = changed.len(),
            kept_local = report.kept_local,
            "merged shared snapshot"
        );
        Ok(PulseInOutcome::Merged(report))
    }
}

/// Entries of `merged` that are new or differ from `local`.
fn changed_entries(local: &ValueMap, merged: ValueMap) -> ValueMap {
    merged
        .into_iter()
        .filter(|(key, value)| local.get(key) != Some(value))
        .collect()
}
