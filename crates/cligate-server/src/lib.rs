//! HTTP/SSE gateway in front of a command-line LLM tool.
//!
//! Routes:
//!
//! | Method & Path | Handler |
//! |---------------|---------|
//! | `POST /prompt` | buffered prompt, `{"response": ...}` |
//! | `POST /sse/prompt` | streamed prompt, SSE `text` / `error` / `done` |
//! | `GET /models` | `{"models": [...]}` |
//! | `GET /health` | `{"status": "healthy"}` |
//! | `POST /mcp/tools/list` | tool descriptors |
//! | `POST /mcp/tools/call` | `{"content": [{"type": "text", ...}]}` |
//! | `GET, POST /sse` | JSON-RPC tool protocol over SSE |

pub mod dto;
pub mod error;
pub mod handlers;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::Router;
use cligate_config::GatewayConfig;
use cligate_relay::Relay;
use cligate_tools::ToolRegistry;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared server state accessible from all handlers.
pub struct ServerState {
    pub config: GatewayConfig,
    pub relay: Arc<Relay>,
    pub tools: ToolRegistry,
}

impl ServerState {
    /// Builds the relay and tool registry from configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let relay = Arc::new(Relay::from_config(&config));
        let tools = ToolRegistry::with_defaults(relay.clone());
        Self { config, relay, tools }
    }
}

/// Builds the application router.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let logged_routes = Router::new()
        .route("/prompt", post(handlers::prompt::prompt))
        .route("/sse/prompt", post(handlers::prompt::stream))
        .route("/models", get(handlers::models::list))
        .route("/mcp/tools/list", post(handlers::tools::list))
        .route("/mcp/tools/call", post(handlers::tools::call))
        .route("/sse", get(handlers::rpc::sse).post(handlers::rpc::sse))
        .layer(trace_layer);

    Router::new()
        .merge(logged_routes)
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}
