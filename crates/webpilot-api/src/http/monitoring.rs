//! Health and probe handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub execution_status: String,
    pub node_types: Vec<String>,
    pub recovery_strategies: Vec<String>,
    pub event_subscribers: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime().as_secs(),
        execution_status: state.engine.status().status.to_string(),
        node_types: state.engine.registry().node_types(),
        recovery_strategies: state.recovery.strategy_names(),
        event_subscribers: state.engine.events().subscriber_count(),
    })
}

/// Ready once at least one node handler is registered.
pub async fn readiness_probe(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.engine.registry().is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    } else {
        (StatusCode::OK, "ok")
    }
}

pub async fn liveness_probe() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
