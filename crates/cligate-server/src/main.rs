//! HTTP server entry point.
//!
//! Loads configuration from the environment (and `.env`), builds the router,
//! and serves it on `HOST:PORT` (default `0.0.0.0:3000`).

use std::sync::Arc;

use anyhow::{Context, Result};
use cligate_config::GatewayConfig;
use cligate_server::{build_router, ServerState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .init();

    let config = GatewayConfig::from_env().context("invalid configuration")?;
    info!(
        "External tool: {} {} (forwarding {} credential variables)",
        config.command.program,
        config.command.subcommand,
        config.forwarded_env.len()
    );

    let addr = config.bind_addr();
    let app = build_router(Arc::new(ServerState::new(config)));

    info!("Starting LLM SSE/MCP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
