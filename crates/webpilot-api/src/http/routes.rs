//! HTTP route definitions.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::http::{execution, fix, monitoring};
use crate::state::AppState;
use crate::websocket::ws_handler;

/// Build the application router.
///
/// CORS is permissive: the graph editor is served from another origin.
pub fn create_router(state: Arc<AppState>) -> Router {
    let execution_routes = Router::new()
        .route("/status", get(execution::status))
        .route("/stop", post(execution::stop))
        .route("/pause-control", post(execution::pause_control))
        .route("/capture-dom", post(execution::capture_dom))
        .route("/logs", get(execution::logs))
        .route("/events", get(execution::events));

    let fix_routes = Router::new()
        .route("/analyze", post(fix::analyze_errors))
        .route("/apply", post(fix::apply_fix));

    Router::new()
        .route("/execute", post(execution::execute))
        .nest("/execution", execution_routes)
        .nest("/fix", fix_routes)
        .route("/health", get(monitoring::health))
        .route("/readyz", get(monitoring::readiness_probe))
        .route("/livez", get(monitoring::liveness_probe))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
