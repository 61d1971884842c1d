//! HTTP route handlers for the gateway.

pub mod models;
pub mod prompt;
pub mod rpc;
pub mod tools;

use axum::Json;

use crate::dto::HealthResponse;

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}
