//! Human-readable rendering of position quality fields
//!
//! Unknown values render as `--`, never as zero.

use serde::Serialize;
use std::fmt;

use crate::core::{PositionState, CARR_SOLN_FIXED, CARR_SOLN_FLOAT};

/// Placeholder for a value the receiver did not report
pub const UNKNOWN: &str = "--";

/// Render an accuracy in meters: centimeters below one meter
pub fn format_accuracy(accuracy_m: Option<f64>) -> String {
    match accuracy_m {
        Some(m) if m.is_finite() && m < 1.0 => format!("{:.1} cm", m * 100.0),
        Some(m) if m.is_finite() => format!("{:.2} m", m),
        _ => UNKNOWN.to_string(),
    }
}

fn format_optional<T: fmt::Display>(value: Option<T>, unit: &str) -> String {
    match value {
        Some(v) => format!("{}{}", v, unit),
        None => UNKNOWN.to_string(),
    }
}

/// Solution quality label from the carrier solution and fix type
pub fn fix_quality(carr_soln: u8, fix_type: u8) -> &'static str {
    match carr_soln {
        CARR_SOLN_FIXED => "RTK Fixed",
        CARR_SOLN_FLOAT => "RTK Float",
        _ => match fix_type {
            0 => "No Fix",
            1 => "Dead Reckoning",
            2 => "2D",
            3 => "3D",
            4 => "GNSS+DR",
            5 => "Time Only",
            _ => "Unknown",
        },
    }
}

/// Display-ready summary of a position state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionDisplay {
    pub quality: &'static str,
    pub h_acc: String,
    pub v_acc: String,
    pub satellites: String,
    pub battery: String,
    pub fixed_rate: String,
    pub timestamp: String,
}

impl From<&PositionState> for PositionDisplay {
    fn from(state: &PositionState) -> Self {
        let fix = &state.fix;
        Self {
            quality: fix_quality(fix.carr_soln, fix.fix_type),
            h_acc: format_accuracy(fix.h_acc),
            v_acc: format_accuracy(fix.v_acc),
            satellites: format_optional(fix.num_sv, ""),
            battery: format_optional(fix.battery_pct.map(|b| format!("{:.0}", b)), "%"),
            fixed_rate: format!("{}%", state.fixed_rate),
            timestamp: state.timestamp.clone(),
        }
    }
}

impl fmt::Display for PositionDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | hAcc {} | vAcc {} | SV {} | fixed {} | batt {} | {}",
            self.quality,
            self.h_acc,
            self.v_acc,
            self.satellites,
            self.fixed_rate,
            self.battery,
            self.timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Fix, PositionSource};

    #[test]
    fn test_accuracy_rendering() {
        assert_eq!(format_accuracy(None), "--");
        assert_eq!(format_accuracy(Some(0.0)), "0.0 cm");
        assert_eq!(format_accuracy(Some(0.014)), "1.4 cm");
        assert_eq!(format_accuracy(Some(2.5)), "2.50 m");
        assert_eq!(format_accuracy(Some(f64::NAN)), "--");
    }

    #[test]
    fn test_fix_quality_labels() {
        assert_eq!(fix_quality(2, 3), "RTK Fixed");
        assert_eq!(fix_quality(1, 3), "RTK Float");
        assert_eq!(fix_quality(0, 3), "3D");
        assert_eq!(fix_quality(0, 0), "No Fix");
    }

    #[test]
    fn test_unknown_fields_render_as_placeholder() {
        let state = PositionState::from_fix(Fix::at(45.0, -122.0), PositionSource::Live, 0);
        let display = PositionDisplay::from(&state);
        assert_eq!(display.h_acc, "--");
        assert_eq!(display.satellites, "--");
        assert_eq!(display.battery, "--");
        assert_eq!(display.fixed_rate, "0.0%");

        let mut fix = Fix::at(45.0, -122.0);
        fix.num_sv = Some(0);
        fix.battery_pct = Some(87.4);
        let display = PositionDisplay::from(&PositionState::from_fix(fix, PositionSource::Live, 0));
        assert_eq!(display.satellites, "0");
        assert_eq!(display.battery, "87%");
        assert!(display.to_string().starts_with("No Fix | hAcc --"));
    }
}
