//! API route handlers
//!
//! Request handling logic for all API endpoints:
//! - Liveness and pipeline counters
//! - Anomaly listings from the store
//! - Stress forecasts through the ML gateway
//! - Node registry, per-node history and reading ingest
//! - Stateless scoring
//! - Active config and dry-run config validation

mod status;
mod anomalies;
mod forecast;
mod nodes;
mod scoring;
mod config;

pub use status::*;
pub use anomalies::*;
pub use forecast::*;
pub use nodes::*;
pub use scoring::*;
pub use config::*;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::response::Response;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::envelope::ApiErrorResponse;
use crate::config::CityConfig;
use crate::ml::MlGateway;
use crate::pipeline::{AppState, ReadingPipeline};
use crate::storage::AnomalyStore;
use crate::types::SensorNode;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct DashboardState {
    pub config: Arc<CityConfig>,
    /// Application state from the pipeline
    pub app_state: Arc<RwLock<AppState>>,
    pub store: Arc<dyn AnomalyStore>,
    pub gateway: Arc<MlGateway>,
    pub pipeline: Arc<ReadingPipeline>,
}

impl DashboardState {
    /// Everything except the config is taken from the pipeline.
    pub fn new(config: Arc<CityConfig>, pipeline: Arc<ReadingPipeline>) -> Self {
        Self {
            config,
            app_state: Arc::clone(pipeline.app_state()),
            store: Arc::clone(pipeline.store()),
            gateway: Arc::clone(pipeline.gateway()),
            pipeline,
        }
    }

    /// Look up a node or build the 404 response.
    pub(crate) fn node_or_404(&self, node_id: &str) -> Result<&SensorNode, Response> {
        self.config
            .node(node_id)
            .ok_or_else(|| ApiErrorResponse::not_found(format!("Unknown node: {node_id}")))
    }
}

pub(crate) fn query_rejected(rejection: QueryRejection) -> Response {
    ApiErrorResponse::bad_request(rejection.body_text())
}

pub(crate) fn json_rejected(rejection: JsonRejection) -> Response {
    ApiErrorResponse::bad_request(rejection.body_text())
}
