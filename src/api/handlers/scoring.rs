//! Stateless scoring endpoint

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use super::{json_rejected, DashboardState};
use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::processing::{sub_scores, SubScores};
use crate::types::{ScoredReading, SensorReading};

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    #[serde(flatten)]
    pub scored: ScoredReading,
    pub sub_scores: SubScores,
}

/// POST /api/v1/score
///
/// Scores and classifies a reading without recording it anywhere.
pub async fn score_reading(
    State(state): State<DashboardState>,
    body: Result<Json<SensorReading>, JsonRejection>,
) -> Response {
    let Json(reading) = match body {
        Ok(body) => body,
        Err(rejection) => return json_rejected(rejection),
    };

    let breakdown = match sub_scores(&reading) {
        Ok(s) => s,
        Err(e) => return ApiErrorResponse::bad_request(e.to_string()),
    };
    match state.gateway.score(&reading).await {
        Ok(scored) => ApiResponse::ok(ScoreResponse {
            scored,
            sub_scores: breakdown,
        }),
        Err(e) => ApiErrorResponse::bad_request(e.to_string()),
    }
}
