//! JSON files in a data directory

use crate::storage::{Storage, StorageError, StorageResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores each snapshot as `<root>/<key>`.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open a data directory, creating it when missing
    pub fn new<P: AsRef<Path>>(root: P) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| StorageError::Io {
            operation: "create_dir".to_string(),
            key: root.to_string_lossy().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn io_error(operation: &str, key: &str, err: std::io::Error) -> StorageError {
        StorageError::Io {
            operation: operation.to_string(),
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error("read", key, e)),
        }
    }

    fn write(&self, key: &str, contents: &str) -> StorageResult<()> {
        let target = self.path_for(key);
        let temp = self.path_for(&format!("{}.tmp", key));
        fs::write(&temp, contents).map_err(|e| Self::io_error("write", key, e))?;
        fs::rename(&temp, &target).map_err(|e| Self::io_error("rename", key, e))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error("remove", key, e)),
        }
    }
}
