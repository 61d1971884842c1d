//! Tool-call adapter handlers (`/mcp/tools/*`).

use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::warn;

use crate::dto::{ToolCallRequest, ToolCallResponse, ToolListResponse};
use crate::error::AppError;
use crate::ServerState;

/// Lists the callable tools.
pub async fn list(State(state): State<Arc<ServerState>>) -> Json<ToolListResponse> {
    Json(ToolListResponse { tools: state.tools.list() })
}

/// Calls a tool by name and wraps its output as a text block.
pub async fn call(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<ToolCallRequest>,
) -> Result<Json<ToolCallResponse>, AppError> {
    let text = state.tools.call(&req.name, req.arguments).await.inspect_err(|e| {
        warn!("Tool call '{}' failed: {}", req.name, e);
    })?;
    Ok(Json(ToolCallResponse::text(text)))
}
