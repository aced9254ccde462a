//! Health Check Handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::startup::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub live_connections: usize,
}

/// Basic health check
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        live_connections: state.registry.connection_count(),
    })
}
