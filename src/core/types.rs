//! Core data types for the dredge tracker

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::constants::CARR_SOLN_FIXED;

/// World coordinate in GeoJSON order: `[longitude, latitude]`
pub type LonLat = [f64; 2];

/// Closed ring of world coordinates, first vertex repeated at the end
pub type Ring = Vec<LonLat>;

/// GeoJSON polygon coordinates (outer ring first)
pub type Polygon = Vec<Ring>;

/// One GNSS observation as reported by the receiver.
///
/// Optional numeric fields stay `None` when the receiver did not report them;
/// zero is a legitimate measurement and is never used as a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Altitude above the ellipsoid (m)
    pub altitude: Option<f64>,
    /// Horizontal accuracy estimate (m)
    pub h_acc: Option<f64>,
    /// Vertical accuracy estimate (m)
    pub v_acc: Option<f64>,
    /// Receiver fix type (0 = none, 3 = 3D, ...)
    #[serde(default)]
    pub fix_type: u8,
    /// Carrier solution (0 = none, 1 = float, 2 = fixed)
    #[serde(default)]
    pub carr_soln: u8,
    /// Satellites used in the solution
    pub num_sv: Option<u32>,
    /// RTCM correction bytes received
    pub rtcm_bytes: Option<u64>,
    /// Epochs reported with an RTK fixed solution
    #[serde(default)]
    pub fixed_count: u32,
    /// Epochs reported with an RTK float solution
    #[serde(default)]
    pub float_count: u32,
    /// Rover battery level (%)
    pub battery_pct: Option<f64>,
    /// Rover firmware version string
    pub firmware_version: Option<String>,
    /// UTC hour of the observation
    #[serde(default)]
    pub hour: u8,
    /// UTC minute of the observation
    #[serde(default)]
    pub min: u8,
    /// UTC second of the observation
    #[serde(default)]
    pub sec: u8,
}

impl Fix {
    /// Minimal fix at a location, everything else unknown
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            h_acc: None,
            v_acc: None,
            fix_type: 0,
            carr_soln: 0,
            num_sv: None,
            rtcm_bytes: None,
            fixed_count: 0,
            float_count: 0,
            battery_pct: None,
            firmware_version: None,
            hour: 0,
            min: 0,
            sec: 0,
        }
    }

    /// Percentage of epochs with an RTK fixed solution, zero with no epochs
    pub fn fixed_rate(&self) -> f64 {
        let total = self.fixed_count as u64 + self.float_count as u64;
        if total == 0 {
            0.0
        } else {
            100.0 * self.fixed_count as f64 / total as f64
        }
    }

    /// Observation time of day as `HH:MM:SS UTC`
    pub fn time_of_day(&self) -> String {
        format!("{:02}:{:02}:{:02} UTC", self.hour, self.min, self.sec)
    }

    /// Whether the carrier solution is RTK fixed
    pub fn is_rtk_fixed(&self) -> bool {
        self.carr_soln == CARR_SOLN_FIXED
    }
}

/// Where the current position came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSource {
    /// Receiver fixes
    #[default]
    Live,
    /// Operator-injected test position
    Simulated,
}

/// Latest accepted fix plus the derived fields observers render
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionState {
    #[serde(flatten)]
    pub fix: Fix,
    /// `HH:MM:SS UTC` composed from the fix time fields
    pub timestamp: String,
    /// Fixed-epoch percentage with one decimal, e.g. `"100.0"`
    pub fixed_rate: String,
    /// Receipt time (ms since epoch)
    pub last_update: u64,
    pub source: PositionSource,
}

impl PositionState {
    pub fn from_fix(fix: Fix, source: PositionSource, received_ms: u64) -> Self {
        Self {
            timestamp: fix.time_of_day(),
            fixed_rate: format!("{:.1}", fix.fixed_rate()),
            last_update: received_ms,
            source,
            fix,
        }
    }
}

/// Vehicle heading in degrees clockwise from true north, kept in `[0, 360)`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeadingAngle(f64);

impl HeadingAngle {
    pub fn new(degrees: f64) -> Self {
        if degrees.is_finite() {
            HeadingAngle(degrees.rem_euclid(360.0))
        } else {
            HeadingAngle(0.0)
        }
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }
}

/// Operator-placed survey reference mark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub id: u32,
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub h_acc: Option<f64>,
    /// Creation time (ms since epoch)
    pub created_at: u64,
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_rate() {
        let mut fix = Fix::at(45.0, -122.0);
        assert_eq!(fix.fixed_rate(), 0.0);

        fix.fixed_count = 3;
        fix.float_count = 1;
        assert!((fix.fixed_rate() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_of_day_padding() {
        let mut fix = Fix::at(45.0, -122.0);
        fix.hour = 1;
        fix.min = 2;
        fix.sec = 3;
        assert_eq!(fix.time_of_day(), "01:02:03 UTC");
    }

    #[test]
    fn test_missing_numeric_fields_stay_unknown() {
        let fix: Fix = serde_json::from_str(
            r#"{"latitude":45.0,"longitude":-122.0,"h_acc":null,"carr_soln":2}"#,
        )
        .unwrap();

        assert_eq!(fix.h_acc, None);
        assert_eq!(fix.altitude, None);
        assert_eq!(fix.num_sv, None);
        assert_eq!(fix.carr_soln, 2);
        assert!(fix.is_rtk_fixed());
    }

    #[test]
    fn test_zero_accuracy_is_kept() {
        let fix: Fix =
            serde_json::from_str(r#"{"latitude":45.0,"longitude":-122.0,"h_acc":0.0}"#).unwrap();
        assert_eq!(fix.h_acc, Some(0.0));
    }

    #[test]
    fn test_position_state_serializes_flat() {
        let mut fix = Fix::at(45.0, -122.0);
        fix.fixed_count = 10;
        let state = PositionState::from_fix(fix, PositionSource::Live, 1234);
        let value = serde_json::to_value(&state).unwrap();

        assert_eq!(value["latitude"], 45.0);
        assert_eq!(value["fixed_rate"], "100.0");
        assert_eq!(value["timestamp"], "00:00:00 UTC");
        assert_eq!(value["last_update"], 1234);
        assert_eq!(value["source"], "live");
        assert!(value["h_acc"].is_null());
    }

    #[test]
    fn test_heading_normalisation() {
        assert_eq!(HeadingAngle::new(370.0).degrees(), 10.0);
        assert_eq!(HeadingAngle::new(-90.0).degrees(), 270.0);
        assert_eq!(HeadingAngle::new(f64::NAN).degrees(), 0.0);
    }
}
