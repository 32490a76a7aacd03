//! Configuration for the sync engine.

use shelfsync_protocol::DEFAULT_MAX_SNAPSHOT_BYTES;
use std::path::PathBuf;
use std::time::Duration;

/// Default file name of the shared snapshot.
pub const DEFAULT_SNAPSHOT_NAME: &str = "shelfsync.snapshot";

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Whether pulses do anything at all.
    pub enabled: bool,
    /// Shared folder the snapshot is exchanged through; `None` means sync
    /// has no location and every pulse is a silent no-op.
    pub shared_dir: Option<PathBuf>,
    /// File name of the canonical snapshot inside `shared_dir`.
    pub snapshot_name: String,
    /// Largest snapshot that will be read or published.
    pub max_snapshot_bytes: usize,
    /// Interval between scheduled pulses.
    pub pulse_interval: Duration,
}

impl SyncConfig {
    /// Creates an enabled configuration exchanging through `shared_dir`.
    pub fn new(shared_dir: impl Into<PathBuf>) -> Self {
        Self {
            shared_dir: Some(shared_dir.into()),
            ..Self::default()
        }
    }

    /// Enables or disables sync.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the shared folder.
    pub fn with_shared_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shared_dir = Some(dir.into());
        self
    }

    /// Sets the snapshot file name.
    pub fn with_snapshot_name(mut self, name: impl Into<String>) -> Self {
        self.snapshot_name = name.into();
        self
    }

    /// Sets the snapshot size bound.
    pub fn with_max_snapshot_bytes(mut self, max: usize) -> Self {
        self.max_snapshot_bytes = max;
        self
    }

    /// Sets the scheduled pulse interval.
    pub fn with_pulse_interval(mut self, interval: Duration) -> Self {
        self.pulse_interval = interval;
        self
    }

    /// Full path of the canonical snapshot, if a shared folder is set.
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.shared_dir
            .as_ref()
            .map(|dir| dir.join(&self.snapshot_name))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            shared_dir: None,
            snapshot_name: DEFAULT_SNAPSHOT_NAME.to_string(),
            max_snapshot_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
            pulse_interval: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new("/shared")
            .with_snapshot_name("library.snapshot")
            .with_max_snapshot_bytes(1024)
            .with_pulse_interval(Duration::from_secs(5))
            .with_enabled(false);

        assert!(!config.enabled);
        assert_eq!(config.max_snapshot_bytes, 1024);
        assert_eq!(config.pulse_interval, Duration::from_secs(5));
        assert_eq!(
            config.snapshot_path(),
            Some(PathBuf::from("/shared/library.snapshot"))
        );
    }

    #[test]
    fn default_has_no_location() {
        let config = SyncConfig::default();
        assert!(config.enabled);
        assert_eq!(config.snapshot_path(), None);
        assert_eq!(config.snapshot_name, DEFAULT_SNAPSHOT_NAME);
        assert_eq!(config.max_snapshot_bytes, DEFAULT_MAX_SNAPSHOT_BYTES);
    }
}
