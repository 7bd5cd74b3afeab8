//! Vehicle-frame to world-frame transform and dredge footprint derivation
//!
//! Vehicle geometry is expressed in feet in a body frame fixed to the hull:
//! +x toward starboard, +y toward the bow. The antenna is the local origin and
//! maps to the latitude/longitude of the current fix.
//!
//! The meters-to-degrees step uses a spherical Earth and a planar small-offset
//! approximation. At vehicle scale (tens of meters) the error is far below the
//! receiver's accuracy. It divides by cos(latitude), so it is only valid away
//! from the poles.

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::core::{LonLat, Ring, CIRCLE_SEGMENTS, EARTH_RADIUS_M, FEET_TO_METERS};

/// Point in the vehicle frame (feet)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalPoint {
    pub x: f64,
    pub y: f64,
}

impl LocalPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// World anchor of the vehicle frame: antenna fix plus heading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Antenna latitude (degrees)
    pub latitude: f64,
    /// Antenna longitude (degrees)
    pub longitude: f64,
    /// Heading in degrees clockwise from true north
    pub heading_deg: f64,
}

impl Pose {
    pub fn new(latitude: f64, longitude: f64, heading_deg: f64) -> Self {
        Self {
            latitude,
            longitude,
            heading_deg,
        }
    }
}

/// Project a vehicle-frame point into world coordinates.
///
/// `antenna` is the antenna's own position in the vehicle frame; the returned
/// coordinate is `[lon, lat]`.
pub fn local_to_world(pose: &Pose, antenna: LocalPoint, point: LocalPoint) -> LonLat {
    let displacement_m = Vector2::new(point.x - antenna.x, point.y - antenna.y) * FEET_TO_METERS;

    // Clockwise-positive heading: rotate by -heading to get east/north offsets.
    let rotated = Rotation2::new(-pose.heading_deg.to_radians()) * displacement_m;

    let d_lat = (rotated.y / EARTH_RADIUS_M) * (180.0 / PI);
    let d_lon = (rotated.x / EARTH_RADIUS_M) * (180.0 / PI) / (pose.latitude * PI / 180.0).cos();

    [pose.longitude + d_lon, pose.latitude + d_lat]
}

/// Project a vehicle-frame polygon and close the ring
pub fn local_ring_to_world(pose: &Pose, antenna: LocalPoint, points: &[LocalPoint]) -> Ring {
    let mut ring: Ring = points
        .iter()
        .map(|p| local_to_world(pose, antenna, *p))
        .collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    ring
}

/// Approximate a vehicle-frame circle with `CIRCLE_SEGMENTS` vertices
pub fn local_circle_to_world(
    pose: &Pose,
    antenna: LocalPoint,
    center: LocalPoint,
    radius_ft: f64,
) -> Ring {
    let points: Vec<LocalPoint> = (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / CIRCLE_SEGMENTS as f64;
            LocalPoint::new(
                center.x + radius_ft * angle.cos(),
                center.y + radius_ft * angle.sin(),
            )
        })
        .collect();
    local_ring_to_world(pose, antenna, &points)
}

/// Static dredge dimensions in the vehicle frame (feet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleGeometry {
    /// Hull width along x; the hull spans `0..hull_width_ft`
    pub hull_width_ft: f64,
    /// Hull length along y; the hull spans `0..hull_length_ft`
    pub hull_length_ft: f64,
    /// GPS antenna mount point
    pub antenna: LocalPoint,
    /// Point where the suction nozzle attaches to the hull
    pub nozzle_pivot: LocalPoint,
    /// Nozzle length forward of the pivot
    pub nozzle_length_ft: f64,
    /// Nozzle pipe diameter
    pub nozzle_diameter_ft: f64,
    /// Radius of the suction-tip footprint
    pub suction_tip_radius_ft: f64,
    /// Port/aft corner of the tailings deposit zone
    pub tailings_offset: LocalPoint,
    pub tailings_width_ft: f64,
    pub tailings_length_ft: f64,
}

impl Default for VehicleGeometry {
    fn default() -> Self {
        Self {
            hull_width_ft: 12.0,
            hull_length_ft: 40.0,
            antenna: LocalPoint::new(6.0, 30.0),
            nozzle_pivot: LocalPoint::new(6.0, 40.0),
            nozzle_length_ft: 20.0,
            nozzle_diameter_ft: 1.5,
            suction_tip_radius_ft: 2.0,
            tailings_offset: LocalPoint::new(0.0, -30.0),
            tailings_width_ft: 12.0,
            tailings_length_ft: 25.0,
        }
    }
}

/// All world-frame shapes derived from one pose
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Footprint {
    pub hull: Ring,
    pub nozzle: Ring,
    pub suction_tip: LonLat,
    pub suction_tip_circle: Ring,
    pub tailings: Ring,
}

impl VehicleGeometry {
    /// Whether the antenna sits inside the hull, or within one hull dimension of it
    pub fn antenna_is_near_hull(&self) -> bool {
        let a = self.antenna;
        let (w, l) = (self.hull_width_ft, self.hull_length_ft);
        a.x >= -w && a.x <= 2.0 * w && a.y >= -l && a.y <= 2.0 * l
    }

    fn rectangle(origin: LocalPoint, width: f64, length: f64) -> [LocalPoint; 4] {
        [
            origin,
            LocalPoint::new(origin.x + width, origin.y),
            LocalPoint::new(origin.x + width, origin.y + length),
            LocalPoint::new(origin.x, origin.y + length),
        ]
    }

    pub fn hull(&self, pose: &Pose) -> Ring {
        let corners = Self::rectangle(
            LocalPoint::new(0.0, 0.0),
            self.hull_width_ft,
            self.hull_length_ft,
        );
        local_ring_to_world(pose, self.antenna, &corners)
    }

    pub fn nozzle(&self, pose: &Pose) -> Ring {
        let p = self.nozzle_pivot;
        let half = self.nozzle_diameter_ft / 2.0;
        let corners = Self::rectangle(
            LocalPoint::new(p.x - half, p.y),
            self.nozzle_diameter_ft,
            self.nozzle_length_ft,
        );
        local_ring_to_world(pose, self.antenna, &corners)
    }

    fn suction_tip_local(&self) -> LocalPoint {
        LocalPoint::new(
            self.nozzle_pivot.x,
            self.nozzle_pivot.y + self.nozzle_length_ft,
        )
    }

    /// World position of the nozzle tip
    pub fn suction_tip(&self, pose: &Pose) -> LonLat {
        local_to_world(pose, self.antenna, self.suction_tip_local())
    }

    pub fn suction_tip_circle(&self, pose: &Pose) -> Ring {
        local_circle_to_world(
            pose,
            self.antenna,
            self.suction_tip_local(),
            self.suction_tip_radius_ft,
        )
    }

    pub fn tailings_zone(&self, pose: &Pose) -> Ring {
        let corners = Self::rectangle(
            self.tailings_offset,
            self.tailings_width_ft,
            self.tailings_length_ft,
        );
        local_ring_to_world(pose, self.antenna, &corners)
    }

    pub fn footprint(&self, pose: &Pose) -> Footprint {
        Footprint {
            hull: self.hull(pose),
            nozzle: self.nozzle(pose),
            suction_tip: self.suction_tip(pose),
            suction_tip_circle: self.suction_tip_circle(pose),
            tailings: self.tailings_zone(pose),
        }
    }
}
