use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::algorithms::VehicleGeometry;
use crate::core::{
    DEFAULT_MIN_TRAIL_DISTANCE_M, DEFAULT_STALE_AFTER_MS, DEFAULT_STATUS_POLL_INTERVAL_MS,
    DEFAULT_TRAIL_FLUSH_INTERVAL_MS,
};

/// Logging levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging
    None,
    /// Error messages only
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and info messages
    #[default]
    Info,
    /// All messages including debug
    Debug,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::None => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// Tracker configuration; every field is optional in the JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Listen address of the HTTP/WebSocket server
    pub bind_addr: String,
    /// Directory holding persisted marks and trails
    pub data_dir: String,
    /// Minimum spacing between admitted trail points (meters)
    pub min_trail_distance_m: f64,
    /// Debounce window for trail writes (milliseconds)
    pub trail_flush_interval_ms: u64,
    /// Age after which the latest fix is reported stale (milliseconds)
    pub stale_after_ms: u64,
    /// Period of the link status poll (milliseconds)
    pub status_poll_interval_ms: u64,
    pub log_level: LogLevel,
    /// Dredge dimensions
    pub vehicle: VehicleGeometry,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            data_dir: "data".to_string(),
            min_trail_distance_m: DEFAULT_MIN_TRAIL_DISTANCE_M,
            trail_flush_interval_ms: DEFAULT_TRAIL_FLUSH_INTERVAL_MS,
            stale_after_ms: DEFAULT_STALE_AFTER_MS,
            status_poll_interval_ms: DEFAULT_STATUS_POLL_INTERVAL_MS,
            log_level: LogLevel::default(),
            vehicle: VehicleGeometry::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Invalid parameter value
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    /// File I/O error
    IoError { message: String },
    /// JSON parsing error
    SerializationError { message: String },
}

impl TrackerConfig {
    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: TrackerConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to parse config file '{}': {}", path_str, e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_trail_distance_m.is_finite() || self.min_trail_distance_m <= 0.0 {
            return Err(Self::invalid(
                "min_trail_distance_m",
                self.min_trail_distance_m,
                "must be a positive distance",
            ));
        }

        for (name, value) in [
            ("trail_flush_interval_ms", self.trail_flush_interval_ms),
            ("stale_after_ms", self.stale_after_ms),
            ("status_poll_interval_ms", self.status_poll_interval_ms),
        ] {
            if value == 0 {
                return Err(Self::invalid(name, value, "must be greater than zero"));
            }
        }

        let v = &self.vehicle;
        for (name, value) in [
            ("vehicle.hull_width_ft", v.hull_width_ft),
            ("vehicle.hull_length_ft", v.hull_length_ft),
            ("vehicle.nozzle_length_ft", v.nozzle_length_ft),
            ("vehicle.nozzle_diameter_ft", v.nozzle_diameter_ft),
            ("vehicle.suction_tip_radius_ft", v.suction_tip_radius_ft),
            ("vehicle.tailings_width_ft", v.tailings_width_ft),
            ("vehicle.tailings_length_ft", v.tailings_length_ft),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Self::invalid(name, value, "must be a non-negative length"));
            }
        }

        if !v.antenna_is_near_hull() {
            return Err(Self::invalid(
                "vehicle.antenna",
                format!("({}, {})", v.antenna.x, v.antenna.y),
                "antenna must lie on or near the hull",
            ));
        }

        Ok(())
    }

    fn invalid<V: ToString>(parameter: &str, value: V, reason: &str) -> ConfigError {
        ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn trail_flush_interval(&self) -> Duration {
        Duration::from_millis(self.trail_flush_interval_ms)
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidParameter { parameter, value, reason } => {
                write!(f, "Invalid parameter '{}' = '{}': {}", parameter, value, reason)
            }
            ConfigError::IoError { message } => {
                write!(f, "I/O error: {}", message)
            }
            ConfigError::SerializationError { message } => {
                write!(f, "Serialization error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
