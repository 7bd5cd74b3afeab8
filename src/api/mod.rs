//! Observer-facing surface of the tracker
//!
//! The `Tracker` owns all state; the hub fans events out to observers and the
//! server exposes both over HTTP and WebSocket.

pub mod types;
pub mod hub;
pub mod tracker;
pub mod server;
pub mod formatting;

pub use types::{BroadcastEvent, HeadingUpdate, LabelUpdate, MarkAction, OutboundMessage};
pub use hub::{BroadcastHub, Observer, ObserverId};
pub use tracker::{spawn_status_monitor, spawn_trail_flusher, Tracker};
pub use server::router;
pub use formatting::{fix_quality, format_accuracy, PositionDisplay};
