//! JSON-RPC tool protocol over SSE (`/sse`).

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, StreamExt};

use crate::dto::RpcNotification;
use crate::services::rpc::{dispatch, parse_message};
use crate::services::stream::sse_event;
use crate::ServerState;

/// Opens the event stream with a `connection/ready` notification, then
/// answers the posted JSON-RPC message, if any.
pub async fn sse(State(state): State<Arc<ServerState>>, body: Bytes) -> impl IntoResponse {
    let ready = stream::once(async { sse_event(&RpcNotification::ready()) });

    let reply = stream::once(async move {
        match parse_message(&body) {
            Ok(Some(request)) => Some(dispatch(&state.tools, request).await),
            Ok(None) => None,
            Err(response) => Some(response),
        }
    })
    .filter_map(|response| async move { response.map(|r| sse_event(&r)) });

    (
        [("x-accel-buffering", "no")],
        Sse::new(ready.chain(reply)).keep_alive(KeepAlive::default()),
    )
}
