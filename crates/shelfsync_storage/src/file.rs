//! File-backed state store.

use crate::error::{StorageError, StorageResult};
use crate::store::StateStore;
use fs2::FileExt;
use parking_lot::RwLock;
use shelfsync_codec::{from_cbor, map_to_canonical_cbor, Value, ValueMap};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File holding the encoded state map.
pub const STATE_FILE: &str = "state.cbor";
/// Staging file for atomic rewrites.
pub const STATE_TEMP: &str = "state.cbor.tmp";
/// Advisory lock file.
pub const LOCK_FILE: &str = "LOCK";

/// A state store persisted as one canonical CBOR map.
///
/// ```text
/// <dir>/
/// ├── LOCK             # exclusive advisory lock while open
/// ├── state.cbor       # canonical CBOR map of all entries
/// └── state.cbor.tmp   # staging file, only present mid-write
/// ```
///
/// The whole map is cached in memory; writes re-encode it and replace
/// `state.cbor` with write-to-temp, fsync, rename, fsync-directory. Only one
/// process may open a directory at a time.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<ValueMap>,
    /// Held for its lock; released on drop.
    _lock_file: File,
}

impl FileStore {
    /// Opens or creates the store in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another process holds the store,
    /// or an error if the existing state file cannot be decoded.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir)?;
        if !dir.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("not a directory: {}", dir.display()),
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: dir.display().to_string(),
            });
        }

        // A leftover staging file is an interrupted write; the old state stands.
        let temp_path = dir.join(STATE_TEMP);
        if temp_path.exists() {
            debug!(path = %temp_path.display(), "removing interrupted state write");
            fs::remove_file(&temp_path)?;
        }

        let entries = Self::load(&dir.join(STATE_FILE))?;
        debug!(path = %dir.display(), entries = entries.len(), "opened state store");

        Ok(Self {
            path: dir.to_path_buf(),
            entries: RwLock::new(entries),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(state_path: &Path) -> StorageResult<ValueMap> {
        let bytes = match fs::read(state_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ValueMap::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.is_empty() {
            return Ok(ValueMap::new());
        }
        match from_cbor(&bytes)? {
            Value::Map(entries) => Ok(entries),
            other => Err(StorageError::corrupted(format!(
                "state file holds {}, expected map",
                other.type_name()
            ))),
        }
    }

    fn persist(&self, entries: &ValueMap) -> StorageResult<()> {
        let data = map_to_canonical_cbor(entries)?;
        let temp_path = self.path.join(STATE_TEMP);

        let mut file = File::create(&temp_path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, self.path.join(STATE_FILE))?;
        self.sync_directory()?;
        Ok(())
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl StateStore for FileStore {
    fn get_all(&self) -> StorageResult<ValueMap> {
        Ok(self.entries.read().clone())
    }

    fn set_all(&self, entries: &ValueMap) -> StorageResult<()> {
        let mut stored = self.entries.write();
        let mut updated = stored.clone();
        for (key, value) in entries {
            updated.insert(key.clone(), value.clone());
        }
        self.persist(&updated)?;
        *stored = updated;
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.entries.read().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_directory_and_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state");

        let store = FileStore::open(&path).unwrap();
        assert!(path.join(LOCK_FILE).exists());
        assert!(store.get_all().unwrap().is_empty());
        assert_eq!(store.path(), path);
    }

    #[test]
    fn state_persists_across_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.set("progress:b1", Value::Float(0.25)).unwrap();
            store.set("completedBooks", Value::from(vec!["b2"])).unwrap();
        }

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("progress:b1").unwrap(), Some(Value::Float(0.25)));
        assert_eq!(store.get_all().unwrap().len(), 2);
        assert!(!dir.path().join(STATE_TEMP).exists());
    }

    #[test]
    fn second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _first = FileStore::open(dir.path()).unwrap();
        let second = FileStore::open(dir.path());
        assert!(matches!(second, Err(StorageError::Locked { .. })));
    }

    #[test]
    fn interrupted_write_is_discarded() {
        let dir = tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.set("theme", Value::from("dark")).unwrap();
        }
        fs::write(dir.path().join(STATE_TEMP), b"\xa1garbage").unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("theme").unwrap(), Some(Value::from("dark")));
        assert!(!dir.path().join(STATE_TEMP).exists());
    }

    #[test]
    fn non_map_state_is_corrupted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STATE_FILE), [0x83, 0x01, 0x02, 0x03]).unwrap();
        let result = FileStore::open(dir.path());
        assert!(matches!(result, Err(StorageError::Corrupted(_))));
    }

    #[test]
    fn undecodable_state_is_a_codec_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STATE_FILE), [0xa1, 0x61]).unwrap();
        let result = FileStore::open(dir.path());
        assert!(matches!(result, Err(StorageError::Codec(_))));
    }

    #[test]
    fn tagged_state_is_a_codec_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STATE_FILE), vec![0xc0u8; 64 * 1024]).unwrap();
        let result = FileStore::open(dir.path());
        assert!(matches!(result, Err(StorageError::Codec(_))));
    }
}
