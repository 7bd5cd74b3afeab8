//! Storage error types

use std::fmt;

/// Errors raised by storage backends
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Filesystem operation failed
    Io {
        operation: String,
        key: String,
        message: String,
    },
    /// Snapshot could not be encoded or decoded
    Serialization { key: String, message: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io { operation, key, message } => {
                write!(f, "Storage {} failed for '{}': {}", operation, key, message)
            }
            StorageError::Serialization { key, message } => {
                write!(f, "Invalid snapshot '{}': {}", key, message)
            }
        }
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
