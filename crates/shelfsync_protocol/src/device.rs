//! Device identity value.

use crate::error::{SnapshotError, SnapshotResult};
use std::fmt;

/// Longest device id accepted from a snapshot.
pub const MAX_DEVICE_ID_LEN: usize = 128;

/// Opaque, immutable identifier of one installation.
///
/// The only operation that matters for sync is equality: a snapshot whose
/// origin equals the reading device is a self-echo and is never merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    /// Validates and wraps a device id.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::InvalidDeviceId`] if the id is blank, longer
    /// than [`MAX_DEVICE_ID_LEN`] bytes, or contains control characters.
    pub fn parse(id: impl Into<String>) -> SnapshotResult<Self> {
        let id = id.into();
        if id.trim().is_empty()
            || id.len() > MAX_DEVICE_ID_LEN
            || id.chars().any(char::is_control)
        {
            return Err(SnapshotError::InvalidDeviceId(id));
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_uuid_like_ids() {
        let id = DeviceId::parse("3f2b8c1e-9d4a-4e61-a1f0-6c2d7b9e0a11").unwrap();
        assert_eq!(id.as_str(), "3f2b8c1e-9d4a-4e61-a1f0-6c2d7b9e0a11");
        assert_eq!(id.to_string(), id.as_str());
    }

    #[test]
    fn rejects_blank_and_control_characters() {
        assert!(DeviceId::parse("").is_err());
        assert!(DeviceId::parse("   ").is_err());
        assert!(DeviceId::parse("dev\n1").is_err());
        assert!(DeviceId::parse("x".repeat(MAX_DEVICE_ID_LEN + 1)).is_err());
    }
}
