//! Error types for the sync engine.

use shelfsync_protocol::SnapshotError;
use shelfsync_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No shared location is configured or reachable.
    #[error("shared location unavailable")]
    TransportUnavailable,

    /// Reading or writing the shared location failed.
    #[error("transport I/O error on {path}: {source}")]
    TransportIo {
        /// File or directory the operation touched.
        path: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A snapshot exceeded the configured size bound.
    #[error("snapshot of {size} bytes exceeds limit of {max}")]
    SnapshotTooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Configured limit.
        max: usize,
    },

    /// A snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// The local state store failed.
    #[error("state store error: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Creates a transport I/O error for `path`.
    pub fn transport_io(path: impl AsRef<std::path::Path>, source: io::Error) -> Self {
        Self::TransportIo {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Returns true if this error means the shared snapshot was unusable
    /// rather than that an operation failed.
    pub fn is_decode_error(&self) -> bool {
        match self {
            SyncError::SnapshotTooLarge { .. } => true,
            SyncError::Snapshot(e) => e.is_decode_error(),
            _ => false,
        }
    }

    /// Returns true if a later pulse may succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::TransportIo { .. } => true,
            SyncError::Storage(StorageError::Io(_)) => true,
            SyncError::Storage(StorageError::Locked { .. }) => true,
            _ => false,
        }
    }
}
