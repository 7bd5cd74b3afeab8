//! Configuration and logging setup

pub mod config;
pub mod telemetry;

pub use config::{ConfigError, LogLevel, TrackerConfig};
