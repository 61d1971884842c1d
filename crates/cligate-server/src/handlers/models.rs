//! Model listing handler.

use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::info;

use crate::dto::ModelsResponse;
use crate::error::AppError;
use crate::ServerState;

/// Lists the models reported by the external tool.
pub async fn list(State(state): State<Arc<ServerState>>) -> Result<Json<ModelsResponse>, AppError> {
    let models = state.relay.list_models().await?;
    info!("Listed {} models", models.len());
    Ok(Json(ModelsResponse { models }))
}
