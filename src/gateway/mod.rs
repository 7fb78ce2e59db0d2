//! WebSocket gateway for driving the execution engine from a UI.
//!
//! One HTTP server exposes a health endpoint and a `/ws` upgrade; each
//! WebSocket connection gets its own [`ws::Session`] holding at most one
//! executor at a time.

pub mod ws;

use crate::config::Config;
use crate::providers::{create_provider, Provider};
use anyhow::Result;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Shared state for all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<dyn Provider>,
}

fn is_public_bind(host: &str) -> bool {
    !matches!(host, "127.0.0.1" | "localhost" | "::1")
}

/// Run the gateway until the process is stopped.
pub async fn run_gateway(config: Config) -> Result<()> {
    let host = config.gateway.host.clone();
    let port = config.gateway.port;

    // The gateway carries no authentication; keep it off public interfaces.
    if is_public_bind(&host) {
        anyhow::bail!(
            "refusing to bind the gateway to {host} — it would be exposed beyond this machine; \
             use host = \"127.0.0.1\" in [gateway]"
        );
    }

    let provider = create_provider(&config)?;
    let state = AppState {
        config: Arc::new(config),
        provider,
    };

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Gateway listening on ws://{host}:{port}/ws");

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/ws", get(ws::handle_ws))
        .with_state(state);

    axum::serve(listener, app).await?;
    Ok(())
}

/// GET /health — liveness probe, no secrets leaked.
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "provider": state.config.provider.as_deref().unwrap_or("unconfigured"),
    }))
}
