use crate::error::Error;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::IntoResponse;
use log::*;
use service::AppState;

/// GET a live Server-Sent Events stream of the messages published to a topic.
///
/// Every broker message becomes one `data:` event. The stream stays open until the
/// client disconnects, the session reaches its maximum lifetime, or the broker fails.
pub async fn stream(
    State(app_state): State<AppState>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, Error> {
    debug!("Opening SSE stream for topic {topic}");

    let (session_id, events) = app_state
        .sse_manager
        .open(app_state.connector_ref(), &topic)
        .await?;

    debug!("SSE session {session_id} streaming topic {topic}");

    let keep_alive = KeepAlive::new().interval(app_state.sse_manager.policy().keep_alive);
    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(events).keep_alive(keep_alive),
    ))
}

/// GET without a topic. Rejected before any broker work happens.
pub async fn missing_topic() -> impl IntoResponse {
    (StatusCode::BAD_REQUEST, "topic is not provided")
}
