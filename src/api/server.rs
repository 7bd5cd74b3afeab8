//! HTTP and WebSocket transport
//!
//! Handlers translate requests into `Tracker` calls. Anything that writes to
//! storage, or waits on the mark registry, runs on the blocking pool.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

use crate::api::tracker::Tracker;
use crate::api::types::{HeadingUpdate, LabelUpdate};
use crate::core::{Fix, HeadingAngle, Mark, PositionState};
use crate::processing::{MarkRequest, TrailExport};
use crate::validation::{TrackerError, TrackerResult};

pub fn router(tracker: Arc<Tracker>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ws", get(observe))
        .route("/api/position", post(post_fix).get(get_position))
        .route("/api/position/simulated", post(post_simulated_fix))
        .route("/api/heading", put(put_heading))
        .route("/api/marks", get(list_marks).post(create_mark).delete(clear_marks))
        .route("/api/marks/:id", put(update_mark).delete(delete_mark))
        .route("/api/trails", get(get_trails).delete(clear_trails))
        .with_state(tracker)
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = match &self {
            TrackerError::Validation { .. } => StatusCode::BAD_REQUEST,
            TrackerError::NotFound { .. } => StatusCode::NOT_FOUND,
            TrackerError::Persistence { .. } | TrackerError::Transport { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if !self.is_user_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Run a tracker call that may wait on a storage write off the async workers
async fn blocking<T, F>(tracker: Arc<Tracker>, f: F) -> TrackerResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Tracker) -> TrackerResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&tracker))
        .await
        .map_err(|e| TrackerError::Transport {
            details: e.to_string(),
        })?
}

async fn observe(State(tracker): State<Arc<Tracker>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| observer_conn(socket, tracker))
}

async fn observer_conn(socket: WebSocket, tracker: Arc<Tracker>) {
    let connecting = tracker.clone();
    let mut observer = match tokio::task::spawn_blocking(move || connecting.connect()).await {
        Ok(observer) => observer,
        Err(e) => {
            error!(error = %e, "observer registration failed");
            return;
        }
    };
    let id = observer.id;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let mut forward = tokio::spawn(async move {
        while let Some(message) = observer.receiver.recv().await {
            if let Err(e) = ws_tx.send(Message::Text(message.to_string())).await {
                debug!(observer = id.value(), error = %e, "observer send failed");
                break;
            }
        }
    });

    // Inbound frames carry nothing for us; read until the peer goes away
    let mut inbound = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_rx.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut forward => inbound.abort(),
        _ = &mut inbound => forward.abort(),
    }
    tracker.disconnect(id);
}

async fn post_fix(State(tracker): State<Arc<Tracker>>, Json(fix): Json<Fix>) -> Json<PositionState> {
    Json(tracker.ingest(fix))
}

async fn post_simulated_fix(
    State(tracker): State<Arc<Tracker>>,
    Json(fix): Json<Fix>,
) -> Json<PositionState> {
    Json(tracker.ingest_simulated(fix))
}

async fn get_position(State(tracker): State<Arc<Tracker>>) -> Response {
    match tracker.current() {
        Some(state) => Json(state).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn put_heading(
    State(tracker): State<Arc<Tracker>>,
    Json(update): Json<HeadingUpdate>,
) -> Json<HeadingAngle> {
    Json(tracker.set_heading(update.heading))
}

async fn list_marks(State(tracker): State<Arc<Tracker>>) -> TrackerResult<Json<Vec<Mark>>> {
    let marks = blocking(tracker, |t| Ok(t.list_marks())).await?;
    Ok(Json(marks))
}

async fn create_mark(
    State(tracker): State<Arc<Tracker>>,
    Json(request): Json<MarkRequest>,
) -> TrackerResult<(StatusCode, Json<Mark>)> {
    let mark = blocking(tracker, move |t| t.create_mark(request)).await?;
    Ok((StatusCode::CREATED, Json(mark)))
}

async fn update_mark(
    State(tracker): State<Arc<Tracker>>,
    Path(id): Path<u32>,
    Json(update): Json<LabelUpdate>,
) -> TrackerResult<Json<Mark>> {
    let mark = blocking(tracker, move |t| t.update_mark(id, &update.label)).await?;
    Ok(Json(mark))
}

async fn delete_mark(State(tracker): State<Arc<Tracker>>, Path(id): Path<u32>) -> TrackerResult<StatusCode> {
    blocking(tracker, move |t| t.delete_mark(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_marks(State(tracker): State<Arc<Tracker>>) -> TrackerResult<Json<serde_json::Value>> {
    let count = blocking(tracker, |t| Ok(t.clear_marks())).await?;
    Ok(Json(json!({ "count": count })))
}

async fn get_trails(State(tracker): State<Arc<Tracker>>) -> Json<TrailExport> {
    Json(tracker.export_trails())
}

async fn clear_trails(State(tracker): State<Arc<Tracker>>) -> TrackerResult<StatusCode> {
    blocking(tracker, |t| t.clear_trails()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let status = |e: TrackerError| e.into_response().status();
        assert_eq!(status(TrackerError::missing("latitude")), StatusCode::BAD_REQUEST);
        assert_eq!(status(TrackerError::NotFound { id: 3 }), StatusCode::NOT_FOUND);
        assert_eq!(
            status(TrackerError::Persistence {
                details: "disk full".to_string()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
