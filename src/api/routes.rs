//! API route definitions
//!
//! - /health - liveness, uptime, ML mode
//! - /api/v1/anomalies - store listings
//! - /api/v1/forecast - stress forecasts
//! - /api/v1/nodes - registry, history, reading ingest
//! - /api/v1/activity - global activity feed
//! - /api/v1/score - stateless scoring
//! - /api/v1/config - active config, dry-run validation

use axum::{routing::{get, post}, Router};

use super::handlers::{self, DashboardState};

/// Versioned API routes, nested under `/api/v1`
pub fn api_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/anomalies", get(handlers::list_anomalies))
        .route("/anomalies/:node_id", get(handlers::list_node_anomalies))
        .route("/forecast", get(handlers::get_forecast))
        .route("/nodes", get(handlers::list_nodes))
        .route("/nodes/:node_id/history", get(handlers::get_node_history))
        .route("/nodes/:node_id/readings", post(handlers::post_reading))
        .route("/activity", get(handlers::get_activity))
        .route("/score", post(handlers::score_reading))
        .route("/config", get(handlers::get_config))
        .route("/config/validate", post(handlers::validate_config))
        .with_state(state)
}

/// Root-level liveness endpoint
pub fn health_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state)
}
