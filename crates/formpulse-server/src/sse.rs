//! Server-sent events for live dashboards

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
};
use formpulse_core::{pump, StreamEvent};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};

use crate::AppState;

/// `GET /api/sse/:form_id`
///
/// The stream task ends, and releases its hub handle, once the client
/// disconnects and axum drops the body.
pub async fn live_stream(
    Path(form_id): Path<String>,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(state.config.stream_buffer.max(1));
    tokio::spawn(pump(
        state.hub().clone(),
        form_id,
        tx,
        state.config.keepalive(),
    ));

    Sse::new(ReceiverStream::new(rx).map(|event| Ok(to_sse(event))))
}

pub fn to_sse(event: StreamEvent) -> Event {
    match event {
        StreamEvent::Hello { ts } => Event::default()
            .event("message")
            .data(serde_json::json!({ "type": "hello", "ts": ts }).to_string()),
        StreamEvent::Update(payload) => Event::default()
            .event("message")
            .data(String::from_utf8_lossy(&payload)),
        StreamEvent::KeepAlive => Event::default().comment("ping"),
    }
}
