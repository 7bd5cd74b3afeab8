//! Dredge GPS Tracker
//!
//! Ingests RTK GNSS fixes for a suction dredge, records decimated trails of
//! the antenna, suction tip and tailings zone, keeps a registry of survey
//! reference marks, and pushes every change to connected observers.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod storage;
pub mod validation;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use core::{Fix, HeadingAngle, LonLat, Mark, PositionSource, PositionState, Ring};
pub use algorithms::{haversine_m, local_to_world, Footprint, LocalPoint, Pose, VehicleGeometry};
pub use processing::{LinkStatus, MarkRegistry, MarkRequest, PositionStore, TrailExport, TrailRecorder};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use validation::{TrackerError, TrackerResult};
pub use utils::{ConfigError, LogLevel, TrackerConfig};
pub use api::{BroadcastEvent, BroadcastHub, Observer, Tracker};
