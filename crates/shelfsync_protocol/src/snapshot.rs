//! Snapshot envelope and its byte format.

use crate::device::DeviceId;
use crate::error::{SnapshotError, SnapshotResult};
use chrono::{DateTime, SecondsFormat, Utc};
use shelfsync_codec::{from_cbor, to_canonical_cbor, Value, ValueMap};

/// Newest snapshot format this build writes and reads.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Oldest snapshot format this build still reads.
pub const MIN_SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Default upper bound on an encoded snapshot.
pub const DEFAULT_MAX_SNAPSHOT_BYTES: usize = 64 * 1024 * 1024;

const FIELD_VERSION: &str = "version";
const FIELD_ORIGIN: &str = "originDeviceId";
const FIELD_TIMESTAMP: &str = "timestamp";
const FIELD_PAYLOAD: &str = "payload";

/// A full, device-tagged export of synchronizable state.
///
/// Snapshots are never deltas: `payload` holds every state entry the
/// exporting device had at `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Format version the snapshot was written with.
    pub format_version: u32,
    /// Device that exported the snapshot.
    pub origin_device_id: DeviceId,
    /// Export time as an RFC 3339 string; empty if the writer omitted it.
    pub timestamp: String,
    /// The exported state.
    pub payload: ValueMap,
}

impl Snapshot {
    /// Creates a snapshot in the current format.
    pub fn new(origin_device_id: DeviceId, exported_at: DateTime<Utc>, payload: ValueMap) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            origin_device_id,
            timestamp: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            payload,
        }
    }

    /// Parses the export timestamp, if present and well-formed.
    pub fn exported_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Returns true if `device` wrote this snapshot.
    pub fn is_self_echo(&self, device: &DeviceId) -> bool {
        &self.origin_device_id == device
    }

    /// Encodes to canonical CBOR.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Encode`] if the payload holds a NaN float.
    pub fn encode(&self) -> SnapshotResult<Vec<u8>> {
        let mut envelope = ValueMap::new();
        envelope.insert(
            FIELD_VERSION.into(),
            Value::Integer(i64::from(self.format_version)),
        );
        envelope.insert(
            FIELD_ORIGIN.into(),
            Value::Text(self.origin_device_id.as_str().to_string()),
        );
        envelope.insert(FIELD_TIMESTAMP.into(), Value::Text(self.timestamp.clone()));
        envelope.insert(FIELD_PAYLOAD.into(), Value::Map(self.payload.clone()));

        to_canonical_cbor(&Value::Map(envelope)).map_err(SnapshotError::Encode)
    }

    /// Decodes a snapshot using [`DEFAULT_MAX_SNAPSHOT_BYTES`].
    ///
    /// # Errors
    ///
    /// See [`Snapshot::decode_with_limit`].
    pub fn decode(bytes: &[u8]) -> SnapshotResult<Self> {
        Self::decode_with_limit(bytes, DEFAULT_MAX_SNAPSHOT_BYTES)
    }

    /// Decodes a snapshot, refusing inputs larger than `max_bytes`.
    ///
    /// A missing `payload` decodes as an empty map and a missing `timestamp`
    /// as an empty string.
    ///
    /// # Errors
    ///
    /// Fails if the input is empty or too large, is not canonical CBOR, is not
    /// a map, has a missing or unknown `version`, has a missing or invalid
    /// `originDeviceId`, or has a `payload` that is not a map.
    pub fn decode_with_limit(bytes: &[u8], max_bytes: usize) -> SnapshotResult<Self> {
        if bytes.is_empty() {
            return Err(SnapshotError::Empty);
        }
        if bytes.len() > max_bytes {
            return Err(SnapshotError::TooLarge {
                size: bytes.len(),
                max: max_bytes,
            });
        }

        let envelope = match from_cbor(bytes).map_err(SnapshotError::Malformed)? {
            Value::Map(map) => map,
            other => {
                return Err(SnapshotError::InvalidStructure(format!(
                    "expected map at top level, found {}",
                    other.type_name()
                )))
            }
        };

        let format_version = decode_version(envelope.get(FIELD_VERSION))?;

        let origin = envelope
            .get(FIELD_ORIGIN)
            .ok_or(SnapshotError::MissingField(FIELD_ORIGIN))?
            .as_text()
            .ok_or_else(|| SnapshotError::InvalidStructure("originDeviceId must be text".into()))?;
        let origin_device_id = DeviceId::parse(origin)?;

        let timestamp = match envelope.get(FIELD_TIMESTAMP) {
            None | Some(Value::Null) => String::new(),
            Some(Value::Text(t)) => t.clone(),
            Some(other) => {
                return Err(SnapshotError::InvalidStructure(format!(
                    "timestamp must be text, found {}",
                    other.type_name()
                )))
            }
        };

        let payload = match envelope.get(FIELD_PAYLOAD) {
            None | Some(Value::Null) => ValueMap::new(),
            Some(Value::Map(map)) => map.clone(),
            Some(other) => {
                return Err(SnapshotError::InvalidStructure(format!(
                    "payload must be a map, found {}",
                    other.type_name()
                )))
            }
        };

        Ok(Self {
            format_version,
            origin_device_id,
            timestamp,
            payload,
        })
    }
}

fn decode_version(value: Option<&Value>) -> SnapshotResult<u32> {
    let found = value
        .ok_or(SnapshotError::MissingField(FIELD_VERSION))?
        .as_integer()
        .ok_or_else(|| SnapshotError::InvalidStructure("version must be an integer".into()))?;

    match u32::try_from(found) {
        Ok(v) if (MIN_SNAPSHOT_FORMAT_VERSION..=SNAPSHOT_FORMAT_VERSION).contains(&v) => Ok(v),
        _ => Err(SnapshotError::UnsupportedVersion {
            found,
            supported: SNAPSHOT_FORMAT_VERSION,
        }),
    }
}

/// Encodes `state` as a snapshot from `device_id` taken at `timestamp`.
///
/// # Errors
///
/// Returns [`SnapshotError::Encode`] if the state holds a NaN float.
pub fn encode(state: &ValueMap, device_id: &DeviceId, timestamp: DateTime<Utc>) -> SnapshotResult<Vec<u8>> {
    Snapshot::new(device_id.clone(), timestamp, state.clone()).encode()
}

/// Decodes snapshot bytes. See [`Snapshot::decode`].
///
/// # Errors
///
/// Returns a decode-class [`SnapshotError`] for any unreadable input.
pub fn decode(bytes: &[u8]) -> SnapshotResult<Snapshot> {
    Snapshot::decode(bytes)
}
