//! Forecast endpoint

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::{query_rejected, DashboardState};
use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::forecast::{ForecastError, DEFAULT_HORIZON_MINUTES};
use crate::ml::MlError;
use crate::types::ForecastSeries;

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    /// Absent or empty = every node
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default = "default_horizon")]
    pub horizon: u32,
}

const fn default_horizon() -> u32 {
    DEFAULT_HORIZON_MINUTES
}

#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub horizon_minutes: u32,
    pub forecasts: Vec<ForecastSeries>,
}

/// GET /api/v1/forecast?node_id=&horizon=60
pub async fn get_forecast(
    State(state): State<DashboardState>,
    query: Result<Query<ForecastQuery>, QueryRejection>,
) -> Response {
    let Query(q) = match query {
        Ok(q) => q,
        Err(rejection) => return query_rejected(rejection),
    };
    let node_id = q.node_id.as_deref().map(str::trim).filter(|id| !id.is_empty());

    match state.gateway.forecast(node_id, q.horizon).await {
        Ok(forecasts) => ApiResponse::ok(ForecastResponse {
            horizon_minutes: q.horizon,
            forecasts,
        }),
        Err(MlError::Forecast(e @ ForecastError::UnknownNode(_))) => ApiErrorResponse::not_found(e.to_string()),
        Err(MlError::Forecast(e @ ForecastError::InvalidHorizon(_))) => ApiErrorResponse::bad_request(e.to_string()),
        Err(e) => {
            error!(error = %e, "Forecast failed");
            ApiErrorResponse::internal("Forecast unavailable")
        }
    }
}
