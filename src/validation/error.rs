//! Error taxonomy for tracker operations

use std::fmt;

use crate::storage::StorageError;

/// Errors surfaced by the tracker core
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerError {
    /// A required request field is missing or unusable; nothing changed
    Validation { field: String, reason: String },
    /// The referenced mark does not exist; nothing changed
    NotFound { id: u32 },
    /// A durable write failed; the in-memory change stands
    Persistence { details: String },
    /// Delivery to one observer failed; other observers are unaffected
    Transport { details: String },
}

impl TrackerError {
    pub fn missing(field: &str) -> Self {
        TrackerError::Validation {
            field: field.to_string(),
            reason: "required".to_string(),
        }
    }

    /// Whether the caller can fix the request and retry
    pub fn is_user_error(&self) -> bool {
        matches!(self, TrackerError::Validation { .. } | TrackerError::NotFound { .. })
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Validation { field, reason } => {
                write!(f, "Invalid '{}': {}", field, reason)
            }
            TrackerError::NotFound { id } => write!(f, "Mark {} not found", id),
            TrackerError::Persistence { details } => write!(f, "Persistence failure: {}", details),
            TrackerError::Transport { details } => write!(f, "Transport failure: {}", details),
        }
    }
}

impl std::error::Error for TrackerError {}

impl From<StorageError> for TrackerError {
    fn from(error: StorageError) -> Self {
        TrackerError::Persistence {
            details: error.to_string(),
        }
    }
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;
