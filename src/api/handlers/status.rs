//! Liveness endpoint

use axum::extract::State;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::DashboardState;
use crate::api::envelope::ApiResponse;
use crate::types::DetectionSource;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub city: String,
    pub system_status: String,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub nodes: usize,
    /// "remote" when an ML service is configured, otherwise "fallback"
    pub ml_mode: DetectionSource,
    pub store_backend: &'static str,
    pub readings_processed: u64,
    pub anomalies_detected: u64,
}

/// GET /health
pub async fn get_health(State(state): State<DashboardState>) -> Response {
    let app_state = state.app_state.read().await;

    ApiResponse::ok(HealthResponse {
        status: "ok",
        city: state.config.city.name.clone(),
        system_status: app_state.status.to_string(),
        started_at: app_state.started_at,
        uptime_secs: app_state.uptime_secs(),
        nodes: state.config.nodes.len(),
        ml_mode: state.gateway.mode(),
        store_backend: state.store.backend_name(),
        readings_processed: app_state.readings_processed,
        anomalies_detected: app_state.anomalies_detected,
    })
}
