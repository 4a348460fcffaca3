//! Server-Sent Events broadcaster
//!
//! Streams NashirEvent to connected staff clients: publishes, chat
//! messages, task moves, theme switches. Drives the live notification
//! tray and chat panes in the newsroom UI.

use axum::{
    extract::State,
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::api::session::{request_locale, require_staff, CurrentUser};
use crate::error::ApiError;
use crate::AppState;

/// GET /api/events - SSE event stream (staff)
pub async fn event_stream(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    require_staff(&user, request_locale(&headers))?;
    debug!("SSE client connected: {}", user.username);

    let rx = state.events.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default().event(event.event_type()).data(json))),
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    None
                }
            },
            Err(e) => {
                // Lagged subscriber; drop the gap and continue
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
