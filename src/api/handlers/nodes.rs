//! Node registry, per-node history, reading ingest and the activity feed

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::{json_rejected, DashboardState};
use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::pipeline::LatestReading;
use crate::types::{ActivityEntry, AnomalyRecord, HistoricalPoint, ScoredReading, SensorNode, SensorReading};

#[derive(Debug, Serialize)]
pub struct NodeSummary {
    #[serde(flatten)]
    pub node: SensorNode,
    pub latest: Option<LatestReading>,
}

#[derive(Debug, Serialize)]
pub struct NodeHistory {
    pub node_id: String,
    /// Oldest first
    pub points: Vec<HistoricalPoint>,
    /// Newest first
    pub activity: Vec<ActivityEntry>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub node_id: String,
    pub scored: ScoredReading,
    pub activity: ActivityEntry,
    pub anomaly: Option<AnomalyRecord>,
}

#[derive(Debug, Serialize)]
pub struct ActivityFeed {
    pub count: usize,
    pub activity: Vec<ActivityEntry>,
}

/// GET /api/v1/nodes
pub async fn list_nodes(State(state): State<DashboardState>) -> Response {
    let app_state = state.app_state.read().await;
    let nodes: Vec<NodeSummary> = state
        .config
        .nodes
        .iter()
        .map(|node| NodeSummary {
            node: node.clone(),
            latest: app_state.latest_for(&node.id).cloned(),
        })
        .collect();
    ApiResponse::ok(nodes)
}

/// GET /api/v1/nodes/:node_id/history
pub async fn get_node_history(State(state): State<DashboardState>, Path(node_id): Path<String>) -> Response {
    if let Err(resp) = state.node_or_404(&node_id) {
        return resp;
    }
    let app_state = state.app_state.read().await;
    ApiResponse::ok(NodeHistory {
        points: app_state.history.node_history(&node_id),
        activity: app_state.history.node_activity(&node_id),
        node_id,
    })
}

/// POST /api/v1/nodes/:node_id/readings
pub async fn post_reading(
    State(state): State<DashboardState>,
    Path(node_id): Path<String>,
    body: Result<Json<SensorReading>, JsonRejection>,
) -> Response {
    let node = match state.node_or_404(&node_id) {
        Ok(node) => node.clone(),
        Err(resp) => return resp,
    };
    let Json(reading) = match body {
        Ok(body) => body,
        Err(rejection) => return json_rejected(rejection),
    };

    match state.pipeline.ingest(&node, &reading, Utc::now()).await {
        Ok(processed) => {
            if processed.anomaly.is_some() {
                info!(node_id = %node.id, stress_index = processed.scored.stress_index, "Anomaly ingested via API");
            }
            ApiResponse::created(IngestResponse {
                node_id: node.id,
                scored: processed.scored,
                activity: processed.activity,
                anomaly: processed.anomaly,
            })
        }
        Err(e) => ApiErrorResponse::bad_request(e.to_string()),
    }
}

/// GET /api/v1/activity
pub async fn get_activity(State(state): State<DashboardState>) -> Response {
    let activity = state.app_state.read().await.history.recent_activity();
    ApiResponse::ok(ActivityFeed {
        count: activity.len(),
        activity,
    })
}
