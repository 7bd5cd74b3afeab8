//! Error classification

pub mod error;

pub use error::{TrackerError, TrackerResult};
