//! Persistent per-installation device identity.

use crate::error::SyncResult;
use shelfsync_codec::Value;
use shelfsync_protocol::{DeviceId, SnapshotError};
use shelfsync_storage::StateStore;
use tracing::info;
use uuid::Uuid;

/// Settings key the device id is stored under.
pub const DEVICE_ID_KEY: &str = "deviceId";

/// Provides this installation's stable device id.
///
/// The id lives in a settings store separate from the synchronized state,
/// so it is never exported inside a snapshot.
pub struct DeviceIdentity;

impl DeviceIdentity {
    /// Returns the persisted id, generating and persisting a random UUID v4
    /// on first use. An existing id is never rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings store fails or holds a value that is
    /// not a valid device id.
    pub fn get_or_create(settings: &dyn StateStore) -> SyncResult<DeviceId> {
        match settings.get(DEVICE_ID_KEY)? {
            Some(Value::Text(id)) => Ok(DeviceId::parse(id)?),
            Some(other) => Err(SnapshotError::InvalidDeviceId(format!(
                "stored {DEVICE_ID_KEY} is {}",
                other.type_name()
            ))
            .into()),
            None => {
                let id = DeviceId::parse(Uuid::new_v4().to_string())?;
                settings.set(DEVICE_ID_KEY, Value::Text(id.as_str().to_string()))?;
                info!(device_id = %id, "generated device id");
                Ok(id)
            }
        }
    }
}
