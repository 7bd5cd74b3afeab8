//! Durable snapshot storage
//!
//! The registry and the trail recorder persist whole JSON snapshots under a
//! fixed key. Backends only need to store and return opaque strings; the
//! last fully written snapshot is what a restart sees.

pub mod error;
pub mod file;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Key of the mark registry snapshot
pub const MARKS_KEY: &str = "marks.json";

/// Key of the trail snapshot
pub const TRAILS_KEY: &str = "trails.json";

/// Storage backend for persisted snapshots
pub trait Storage: Send + Sync {
    /// Read a snapshot; `Ok(None)` when nothing was ever written under `key`
    fn read(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the snapshot stored under `key`
    fn write(&self, key: &str, contents: &str) -> StorageResult<()>;

    /// Delete the snapshot; deleting a missing key is not an error
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Serialize `value` and write it under `key`
pub fn save_json<T: Serialize>(storage: &dyn Storage, key: &str, value: &T) -> StorageResult<()> {
    let content = serde_json::to_string(value).map_err(|e| StorageError::Serialization {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    storage.write(key, &content)
}

/// Read and deserialize the snapshot stored under `key`
pub fn load_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> StorageResult<Option<T>> {
    match storage.read(key)? {
        Some(content) => serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::Serialization {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}
