//! Wire event shapes and request records

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::{Mark, PositionState};
use crate::processing::LinkStatus;

/// Serialized event as queued for an observer
pub type OutboundMessage = Arc<str>;

/// Mark registry mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkAction {
    Create,
    Delete,
    Update,
    Clear,
}

/// Payload of a mark event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MarkEventData {
    Mark(Mark),
    Deleted { id: u32 },
    Cleared { count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailAction {
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusData {
    pub link: LinkStatus,
}

/// Events pushed to every observer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BroadcastEvent {
    /// `{type:"position", data: PositionState}`
    Position { data: PositionState },
    /// `{type:"marks", data: Mark[]}`, sent once on connect
    Marks { data: Vec<Mark> },
    /// `{type:"mark", action, data}`
    Mark {
        action: MarkAction,
        data: MarkEventData,
    },
    /// `{type:"status", data:{link}}`, sent on connect and on transitions
    Status { data: StatusData },
    /// `{type:"trail", action:"clear"}`
    Trail { action: TrailAction },
}

impl BroadcastEvent {
    pub fn position(state: PositionState) -> Self {
        BroadcastEvent::Position { data: state }
    }

    pub fn marks(marks: Vec<Mark>) -> Self {
        BroadcastEvent::Marks { data: marks }
    }

    pub fn mark_created(mark: Mark) -> Self {
        BroadcastEvent::Mark {
            action: MarkAction::Create,
            data: MarkEventData::Mark(mark),
        }
    }

    pub fn mark_updated(mark: Mark) -> Self {
        BroadcastEvent::Mark {
            action: MarkAction::Update,
            data: MarkEventData::Mark(mark),
        }
    }

    pub fn mark_deleted(id: u32) -> Self {
        BroadcastEvent::Mark {
            action: MarkAction::Delete,
            data: MarkEventData::Deleted { id },
        }
    }

    pub fn marks_cleared(count: usize) -> Self {
        BroadcastEvent::Mark {
            action: MarkAction::Clear,
            data: MarkEventData::Cleared { count },
        }
    }

    pub fn status(link: LinkStatus) -> Self {
        BroadcastEvent::Status {
            data: StatusData { link },
        }
    }

    pub fn trail_cleared() -> Self {
        BroadcastEvent::Trail {
            action: TrailAction::Clear,
        }
    }

    /// Encode once for every recipient
    pub fn to_message(&self) -> Result<OutboundMessage, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}

/// Mark relabel request body
#[derive(Debug, Clone, Deserialize)]
pub struct LabelUpdate {
    pub label: String,
}

/// Heading request body
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HeadingUpdate {
    pub heading: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Fix, PositionSource};
    use serde_json::Value;

    fn mark() -> Mark {
        Mark {
            id: 1,
            label: "RM_1".to_string(),
            latitude: 45.1,
            longitude: -122.1,
            h_acc: None,
            created_at: 0,
        }
    }

    fn encode(event: &BroadcastEvent) -> Value {
        serde_json::from_str(&event.to_message().unwrap()).unwrap()
    }

    #[test]
    fn test_position_event_shape() {
        let state = PositionState::from_fix(Fix::at(45.0, -122.0), PositionSource::Live, 0);
        let value = encode(&BroadcastEvent::position(state));
        assert_eq!(value["type"], "position");
        assert_eq!(value["data"]["latitude"], 45.0);
        assert_eq!(value["data"]["fixed_rate"], "0.0");
    }

    #[test]
    fn test_mark_event_shapes() {
        let created = encode(&BroadcastEvent::mark_created(mark()));
        assert_eq!(created["type"], "mark");
        assert_eq!(created["action"], "create");
        assert_eq!(created["data"]["label"], "RM_1");

        let deleted = encode(&BroadcastEvent::mark_deleted(4));
        assert_eq!(deleted["action"], "delete");
        assert_eq!(deleted["data"]["id"], 4);

        let cleared = encode(&BroadcastEvent::marks_cleared(3));
        assert_eq!(cleared["action"], "clear");
        assert_eq!(cleared["data"]["count"], 3);

        let list = encode(&BroadcastEvent::marks(vec![mark()]));
        assert_eq!(list["type"], "marks");
        assert_eq!(list["data"][0]["id"], 1);
    }

    #[test]
    fn test_status_and_trail_events() {
        let status = encode(&BroadcastEvent::status(LinkStatus::Stale));
        assert_eq!(status["type"], "status");
        assert_eq!(status["data"]["link"], "stale");

        let trail = encode(&BroadcastEvent::trail_cleared());
        assert_eq!(trail["type"], "trail");
        assert_eq!(trail["action"], "clear");
    }
}
