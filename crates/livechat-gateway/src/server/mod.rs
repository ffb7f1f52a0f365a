//! Gateway server setup
//!
//! Routes, listener and the top-level `run` entry point.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::{GatewayState, GatewayStats};

use crate::maintenance::Maintenance;
use axum::{extract::State, routing::get, Json, Router};
use livechat_common::{AppConfig, AppError};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(gateway_handler))
        .route("/health", get(health_check))
        .route("/stats", get(stats))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Live counters
async fn stats(State(state): State<GatewayState>) -> Json<GatewayStats> {
    Json(state.stats())
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `app` on an already bound listener until ctrl-c
pub async fn serve(listener: TcpListener, app: Router) -> Result<(), AppError> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Server(format!("Server error: {e}")))
}

/// Run the gateway server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    tracing::info!("Starting Gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Server(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/ws", addr);

    serve(listener, app).await
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .gateway
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gateway address: {e}")))?;

    let state = GatewayState::new(config);
    let maintenance = Maintenance::spawn(&state);

    let result = run_server(create_app(state.clone()), addr).await;

    maintenance.shutdown();
    let closed = state.registry().shutdown();
    tracing::info!(closed, "Gateway stopped");

    result
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
