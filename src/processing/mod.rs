//! Stateful processing: current position, trails and marks

pub mod position;
pub mod trail;
pub mod marks;

pub use position::{LinkStatus, PositionStore};
pub use trail::{Admission, TrailExport, TrailRecorder, TrailSnapshot};
pub use marks::{MarkRegistry, MarkRequest, MarkSnapshot};
