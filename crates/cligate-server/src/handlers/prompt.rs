//! Prompt handlers: buffered JSON and SSE streaming.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, KeepAliveStream, Sse},
        IntoResponse,
    },
    Json,
};
use cligate_core::PromptRequest;
use futures::stream::{Stream, StreamExt};
use tracing::info;

use crate::dto::PromptResponse;
use crate::error::AppError;
use crate::services::stream::{prompt_events, sse_event};
use crate::ServerState;

/// Runs a prompt and returns the tool's stdout once it exits.
pub async fn prompt(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, AppError> {
    log_request("Prompt", &req);
    let response = state.relay.prompt(&req).await?;
    Ok(Json(PromptResponse { response }))
}

/// Streams a prompt's output as SSE `data:` events, ending with `done`.
///
/// If the caller disconnects first, the response stream is dropped and the
/// relay terminates the child process.
pub async fn stream(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<PromptRequest>,
) -> impl IntoResponse {
    log_request("Streaming prompt", &req);
    let events = prompt_events(&state.relay, &req).map(|data| sse_event(&data));
    ([("x-accel-buffering", "no")], sse(events))
}

fn sse<S>(events: S) -> Sse<KeepAliveStream<S>>
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    Sse::new(events).keep_alive(KeepAlive::default())
}

fn log_request(kind: &str, req: &PromptRequest) {
    let preview = match req.prompt.char_indices().nth(50) {
        Some((cut, _)) => &req.prompt[..cut],
        None => &req.prompt,
    };
    info!("{} (model: {}): {}...", kind, req.model, preview);
}
