//! CLI command implementations.

pub mod device;
pub mod dump;
pub mod inspect;
pub mod pulse;
pub mod set;
pub mod watch;

use shelfsync_engine::{DeviceIdentity, SyncConfig, SyncEngine};
use shelfsync_protocol::DeviceId;
use shelfsync_storage::FileStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Sub-directory holding synchronized state.
pub const STATE_DIR: &str = "state";
/// Sub-directory holding installation settings.
pub const SETTINGS_DIR: &str = "settings";

/// Sync options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct SyncArgs {
    /// Shared folder.
    pub shared: Option<PathBuf>,
    /// Snapshot file name override.
    pub snapshot_name: Option<String>,
    /// Size bound override.
    pub max_snapshot_bytes: Option<usize>,
}

impl SyncArgs {
    /// Builds the engine configuration from the flags.
    pub fn config(&self) -> SyncConfig {
        let mut config = SyncConfig::default();
        if let Some(shared) = &self.shared {
            config = config.with_shared_dir(shared);
        }
        if let Some(name) = &self.snapshot_name {
            config = config.with_snapshot_name(name);
        }
        if let Some(max) = self.max_snapshot_bytes {
            config = config.with_max_snapshot_bytes(max);
        }
        config
    }
}

/// Opens the state store of an installation.
pub fn open_state(data_dir: &Path) -> Result<Arc<FileStore>, Box<dyn std::error::Error>> {
    Ok(Arc::new(FileStore::open(&data_dir.join(STATE_DIR))?))
}

/// Returns the installation's device id, creating it on first use.
pub fn device_id(data_dir: &Path) -> Result<DeviceId, Box<dyn std::error::Error>> {
    let settings = FileStore::open(&data_dir.join(SETTINGS_DIR))?;
    Ok(DeviceIdentity::get_or_create(&settings)?)
}

/// Opens an installation and builds its engine.
pub fn open_engine(
    data_dir: &Path,
    sync: &SyncArgs,
) -> Result<SyncEngine, Box<dyn std::error::Error>> {
    let id = device_id(data_dir)?;
    let store = open_state(data_dir)?;
    Ok(SyncEngine::from_config(sync.config(), id, store))
}
