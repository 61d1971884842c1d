//! Prompt streaming service - maps relay events onto SSE payloads.

use std::convert::Infallible;

use axum::response::sse::Event;
use cligate_core::{PromptRequest, RelayEvent, SIGNAL_EXIT_CODE};
use cligate_relay::Relay;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::error;

use crate::dto::SseData;

/// Converts one relay event to its wire payload.
pub fn to_sse_data(event: RelayEvent) -> SseData {
    match event {
        RelayEvent::Stdout(text) => SseData::Text { text },
        RelayEvent::Stderr(error) => SseData::Error { error },
        RelayEvent::Exit(code) => SseData::done(code),
    }
}

/// Serializes a payload into an SSE `data:` event.
pub fn sse_event(data: &impl serde::Serialize) -> Result<Event, Infallible> {
    Ok(Event::default().json_data(data).unwrap_or_else(|e| {
        error!("Failed to serialize SSE payload: {}", e);
        Event::default().comment("serialization error")
    }))
}

/// Starts a streamed prompt and returns its payloads.
///
/// A spawn failure still produces an error payload followed by a terminal one,
/// so every stream ends with exactly one `done`.
pub fn prompt_events(relay: &Relay, request: &PromptRequest) -> BoxStream<'static, SseData> {
    match relay.stream(request) {
        Ok(events) => events.map(to_sse_data).boxed(),
        Err(e) => {
            error!("Failed to start stream: {}", e);
            stream::iter([SseData::Error { error: e.to_string() }, SseData::done(SIGNAL_EXIT_CODE)]).boxed()
        }
    }
}
