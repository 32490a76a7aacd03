//! Error types for state store operations.

use shelfsync_codec::CodecError;
use std::io;
use thiserror::Error;

/// Result type for state store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading or writing local state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stored state could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The state file decoded but is not a map of entries.
    #[error("state store corrupted: {0}")]
    Corrupted(String),

    /// Another process holds the store's lock file.
    #[error("state store is locked by another process: {path}")]
    Locked {
        /// The contended store directory.
        path: String,
    },
}

impl StorageError {
    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }
}
