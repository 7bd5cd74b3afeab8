//! Physical constants and system parameters

/// Mean Earth radius for the spherical approximation (m)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// International foot in meters
pub const FEET_TO_METERS: f64 = 0.3048;

/// Vertex count used when approximating circles
pub const CIRCLE_SEGMENTS: usize = 32;

/// `carr_soln` value reported for an RTK fixed carrier solution
pub const CARR_SOLN_FIXED: u8 = 2;

/// `carr_soln` value reported for an RTK float carrier solution
pub const CARR_SOLN_FLOAT: u8 = 1;

/// Minimum spacing between admitted trail points (m)
pub const DEFAULT_MIN_TRAIL_DISTANCE_M: f64 = 0.5;

/// Debounce window for trail persistence (ms)
pub const DEFAULT_TRAIL_FLUSH_INTERVAL_MS: u64 = 5_000;

/// Age after which the latest fix is reported stale (ms)
pub const DEFAULT_STALE_AFTER_MS: u64 = 10_000;

/// Period of the link status poll (ms)
pub const DEFAULT_STATUS_POLL_INTERVAL_MS: u64 = 1_000;
