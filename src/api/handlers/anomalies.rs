//! Anomaly listing endpoints

use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::{query_rejected, DashboardState};
use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::config::defaults::{ANOMALY_LIST_LIMIT, ANOMALY_WINDOW_HOURS};
use crate::types::AnomalyRecord;
use axum::extract::rejection::QueryRejection;

/// Longest listing window accepted (one week)
pub const MAX_WINDOW_HOURS: u32 = 24 * 7;
/// Largest page accepted
pub const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct AnomalyQuery {
    #[serde(default = "default_hours")]
    pub hours: u32,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    #[serde(default = "default_hours")]
    pub hours: u32,
}

const fn default_hours() -> u32 {
    ANOMALY_WINDOW_HOURS
}

const fn default_limit() -> usize {
    ANOMALY_LIST_LIMIT
}

#[derive(Debug, Serialize)]
pub struct AnomalyList {
    pub hours_window: u32,
    pub count: usize,
    pub anomalies: Vec<AnomalyRecord>,
}

fn validate_window(hours: u32) -> Result<u32, Response> {
    if hours == 0 || hours > MAX_WINDOW_HOURS {
        return Err(ApiErrorResponse::bad_request(format!(
            "hours must be 1-{MAX_WINDOW_HOURS}, got {hours}"
        )));
    }
    Ok(hours)
}

/// GET /api/v1/anomalies?hours=24&limit=50
pub async fn list_anomalies(
    State(state): State<DashboardState>,
    query: Result<Query<AnomalyQuery>, QueryRejection>,
) -> Response {
    let Query(q) = match query {
        Ok(q) => q,
        Err(rejection) => return query_rejected(rejection),
    };
    let hours = match validate_window(q.hours) {
        Ok(h) => h,
        Err(resp) => return resp,
    };
    if q.limit == 0 || q.limit > MAX_LIST_LIMIT {
        return ApiErrorResponse::bad_request(format!(
            "limit must be 1-{MAX_LIST_LIMIT}, got {}",
            q.limit
        ));
    }

    match state.store.list_anomalies(hours, q.limit) {
        Ok(anomalies) => ApiResponse::ok(AnomalyList {
            hours_window: hours,
            count: anomalies.len(),
            anomalies,
        }),
        Err(e) => {
            error!(error = %e, "Anomaly listing failed");
            ApiErrorResponse::internal("Failed to read anomaly store")
        }
    }
}

/// GET /api/v1/anomalies/:node_id?hours=24
pub async fn list_node_anomalies(
    State(state): State<DashboardState>,
    Path(node_id): Path<String>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> Response {
    if let Err(resp) = state.node_or_404(&node_id) {
        return resp;
    }
    let Query(q) = match query {
        Ok(q) => q,
        Err(rejection) => return query_rejected(rejection),
    };
    let hours = match validate_window(q.hours) {
        Ok(h) => h,
        Err(resp) => return resp,
    };

    match state.store.list_anomalies_for_node(&node_id, hours) {
        Ok(anomalies) => ApiResponse::ok(AnomalyList {
            hours_window: hours,
            count: anomalies.len(),
            anomalies,
        }),
        Err(e) => {
            error!(node_id = %node_id, error = %e, "Node anomaly listing failed");
            ApiErrorResponse::internal("Failed to read anomaly store")
        }
    }
}
