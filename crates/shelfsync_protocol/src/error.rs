//! Error types for snapshot encoding and decoding.

use shelfsync_codec::CodecError;
use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors raised while building, encoding, or decoding a snapshot.
///
/// Every variant except [`SnapshotError::Encode`] can come out of decoding:
/// the bytes on the shared location do not hold a snapshot this build can read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The input contained no bytes.
    #[error("snapshot is empty")]
    Empty,

    /// The input is larger than the configured bound.
    #[error("snapshot is {size} bytes, limit is {max}")]
    TooLarge {
        /// Size of the input.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The bytes are not valid canonical CBOR.
    #[error("malformed snapshot: {0}")]
    Malformed(#[source] CodecError),

    /// The CBOR is well-formed but does not have the snapshot shape.
    #[error("invalid snapshot structure: {0}")]
    InvalidStructure(String),

    /// A required field is absent.
    #[error("snapshot is missing required field `{0}`")]
    MissingField(&'static str),

    /// The snapshot was written by a format this build does not know.
    #[error("unsupported snapshot version {found}, this build reads up to {supported}")]
    UnsupportedVersion {
        /// Version found in the snapshot.
        found: i64,
        /// Highest version this build can decode.
        supported: u32,
    },

    /// A device id is empty or otherwise unusable.
    #[error("invalid device id: {0:?}")]
    InvalidDeviceId(String),

    /// The state could not be encoded.
    #[error("cannot encode snapshot: {0}")]
    Encode(#[source] CodecError),
}

impl SnapshotError {
    /// Returns true if this error came from reading bytes rather than writing them.
    pub fn is_decode_error(&self) -> bool {
        !matches!(self, Self::Encode(_))
    }
}
