//! Pure geometry algorithms

pub mod geometry;
pub mod distance;

pub use geometry::{local_to_world, Footprint, LocalPoint, Pose, VehicleGeometry};
pub use distance::haversine_m;
