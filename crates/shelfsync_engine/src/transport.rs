//! Shared-location transport for snapshot bytes.

use crate::error::{SyncError, SyncResult};
use parking_lot::RwLock;
use shelfsync_protocol::DEFAULT_MAX_SNAPSHOT_BYTES;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Suffix of the staging file a publish writes before renaming.
pub const STAGING_SUFFIX: &str = ".tmp";

/// A place where one canonical snapshot is exchanged.
///
/// This trait abstracts the shared folder, allowing an in-memory
/// implementation for tests and other hosts' own storage.
pub trait SnapshotTransport: Send + Sync {
    /// Reads the canonical snapshot; `None` when none has been published.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SnapshotTooLarge`] if the snapshot exceeds the
    /// size bound, or an I/O error.
    fn read(&self) -> SyncResult<Option<Vec<u8>>>;

    /// Replaces the canonical snapshot.
    ///
    /// A concurrent reader must observe either the old or the new bytes,
    /// never a partial write.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes could not be published.
    fn publish(&self, bytes: &[u8]) -> SyncResult<()>;

    /// Returns true if the shared location can be used right now.
    fn is_available(&self) -> bool;
}

/// Exchanges snapshots through a file in a shared folder.
///
/// Publishing writes `<name>.tmp`, fsyncs it, renames it over `<name>` and
/// fsyncs the folder.
#[derive(Debug, Clone)]
pub struct FolderTransport {
    dir: PathBuf,
    name: String,
    max_bytes: usize,
}

impl FolderTransport {
    /// Creates a transport for `dir/name`.
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
            max_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
        }
    }

    /// Sets the size bound enforced on read.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Path of the canonical snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    /// Path of the staging file.
    pub fn staging_path(&self) -> PathBuf {
        self.dir.join(format!("{}{STAGING_SUFFIX}", self.name))
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> SyncResult<()> {
        File::open(&self.dir)
            .and_then(|dir| dir.sync_all())
            .map_err(|e| SyncError::transport_io(&self.dir, e))
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> SyncResult<()> {
        Ok(())
    }
}

impl SnapshotTransport for FolderTransport {
    fn read(&self) -> SyncResult<Option<Vec<u8>>> {
        let path = self.snapshot_path();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SyncError::transport_io(&path, e)),
        };

        let size = file
            .metadata()
            .map_err(|e| SyncError::transport_io(&path, e))?
            .len();
        if size > self.max_bytes as u64 {
            return Err(SyncError::SnapshotTooLarge {
                size,
                max: self.max_bytes,
            });
        }

        // The file may grow between stat and read; read at most one byte past the bound.
        let mut bytes = Vec::with_capacity(size as usize);
        file.take(self.max_bytes as u64 + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| SyncError::transport_io(&path, e))?;
        if bytes.len() > self.max_bytes {
            return Err(SyncError::SnapshotTooLarge {
                size: bytes.len() as u64,
                max: self.max_bytes,
            });
        }

        debug!(path = %path.display(), bytes = bytes.len(), "read shared snapshot");
        Ok(Some(bytes))
    }

    fn publish(&self, bytes: &[u8]) -> SyncResult<()> {
        if !self.is_available() {
            return Err(SyncError::TransportUnavailable);
        }
        let staging = self.staging_path();
        let canonical = self.snapshot_path();

        let mut file = File::create(&staging).map_err(|e| SyncError::transport_io(&staging, e))?;
        file.write_all(bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| SyncError::transport_io(&staging, e))?;
        drop(file);

        fs::rename(&staging, &canonical).map_err(|e| SyncError::transport_io(&canonical, e))?;
        self.sync_directory()?;

        debug!(path = %canonical.display(), bytes = bytes.len(), "published shared snapshot");
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}

/// An in-process transport for tests and embedding.
#[derive(Debug)]
pub struct MemoryTransport {
    snapshot: RwLock<Option<Vec<u8>>>,
    available: AtomicBool,
    max_bytes: usize,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Creates an available, empty transport.
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(None),
            available: AtomicBool::new(true),
            max_bytes: DEFAULT_MAX_SNAPSHOT_BYTES,
        }
    }

    /// Sets the size bound enforced on read.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Marks the transport available or unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Replaces the stored snapshot without any checks, as a foreign writer would.
    pub fn put_raw(&self, bytes: Vec<u8>) {
        *self.snapshot.write() = Some(bytes);
    }

    /// Returns a copy of the stored snapshot.
    pub fn contents(&self) -> Option<Vec<u8>> {
        self.snapshot.read().clone()
    }
}

impl SnapshotTransport for MemoryTransport {
    fn read(&self) -> SyncResult<Option<Vec<u8>>> {
        if !self.is_available() {
            return Err(SyncError::TransportUnavailable);
        }
        match self.snapshot.read().as_ref() {
            Some(bytes) if bytes.len() > self.max_bytes => Err(SyncError::SnapshotTooLarge {
                size: bytes.len() as u64,
                max: self.max_bytes,
            }),
            other => Ok(other.cloned()),
        }
    }

    fn publish(&self, bytes: &[u8]) -> SyncResult<()> {
        if !self.is_available() {
            return Err(SyncError::TransportUnavailable);
        }
        *self.snapshot.write() = Some(bytes.to_vec());
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn folder_read_missing_is_none() {
        let dir = tempdir().unwrap();
        let transport = FolderTransport::new(dir.path(), "shared.snapshot");
        assert!(transport.is_available());
        assert_eq!(transport.read().unwrap(), None);
    }

    #[test]
    fn folder_publish_then_read() {
        let dir = tempdir().unwrap();
        let transport = FolderTransport::new(dir.path(), "shared.snapshot");

        transport.publish(b"first").unwrap();
        transport.publish(b"second").unwrap();

        assert_eq!(transport.read().unwrap().as_deref(), Some(&b"second"[..]));
        assert!(!transport.staging_path().exists());
    }

    #[test]
    fn folder_reader_ignores_staging_file() {
        let dir = tempdir().unwrap();
        let transport = FolderTransport::new(dir.path(), "shared.snapshot");
        transport.publish(b"complete").unwrap();

        // A writer died mid-publish.
        fs::write(transport.staging_path(), b"parti").unwrap();
        assert_eq!(transport.read().unwrap().as_deref(), Some(&b"complete"[..]));
    }

    #[test]
    fn folder_missing_dir_is_unavailable() {
        let dir = tempdir().unwrap();
        let transport = FolderTransport::new(dir.path().join("gone"), "shared.snapshot");
        assert!(!transport.is_available());
        assert!(matches!(
            transport.publish(b"x"),
            Err(SyncError::TransportUnavailable)
        ));
    }

    #[test]
    fn folder_enforces_size_bound() {
        let dir = tempdir().unwrap();
        let transport = FolderTransport::new(dir.path(), "shared.snapshot").with_max_bytes(4);
        fs::write(transport.snapshot_path(), b"12345").unwrap();
        assert!(matches!(
            transport.read(),
            Err(SyncError::SnapshotTooLarge { size: 5, max: 4 })
        ));
    }

    #[test]
    fn memory_transport_availability() {
        let transport = MemoryTransport::new();
        transport.publish(b"abc").unwrap();
        assert_eq!(transport.contents().as_deref(), Some(&b"abc"[..]));

        transport.set_available(false);
        assert!(matches!(transport.read(), Err(SyncError::TransportUnavailable)));
        assert!(matches!(transport.publish(b"x"), Err(SyncError::TransportUnavailable)));
    }

    #[test]
    fn memory_transport_size_bound() {
        let transport = MemoryTransport::new().with_max_bytes(2);
        transport.put_raw(vec![0; 3]);
        assert!(matches!(
            transport.read(),
            Err(SyncError::SnapshotTooLarge { .. })
        ));
    }
}
