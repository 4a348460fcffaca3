//! Server-Sent Events endpoint
//!
//! The assistant service broadcasts no domain events; clients only
//! watch this stream for connection status, so a shared heartbeat
//! stream is enough.

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /api/events - heartbeat-only SSE stream
pub async fn event_stream(
    State(_state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    nashir_common::sse::create_heartbeat_sse_stream("nashir-ai")
}
