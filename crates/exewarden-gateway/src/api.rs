//! HTTP API handlers using axum.
//!
//! Every command answers 200 with a JSON body; failures are reported in the
//! body's `status`/`message`, never through the HTTP status code.

use axum::{extract::State, routing::{get, post}, Json, Router};
use std::sync::Arc;
use tracing::debug;

use crate::{
    gateway::StatusGateway,
    types::{CommandResponse, StatusSnapshot},
};

/// Creates the API router.
pub fn create_router(gateway: Arc<StatusGateway>) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/start", post(start_handler))
        .route("/api/stop", post(stop_handler))
        .route("/api/health", get(health_handler))
        .with_state(gateway)
}

async fn status_handler(State(gateway): State<Arc<StatusGateway>>) -> Json<StatusSnapshot> {
    debug!("Status requested");
    Json(gateway.query())
}

async fn start_handler(State(gateway): State<Arc<StatusGateway>>) -> Json<CommandResponse> {
    Json(gateway.start().await)
}

/// May take up to the configured graceful plus force-kill timeouts.
async fn stop_handler(State(gateway): State<Arc<StatusGateway>>) -> Json<CommandResponse> {
    Json(gateway.stop().await)
}

/// Liveness of the supervisor itself, not of the child.
async fn health_handler() -> &'static str {
    "OK"
}
