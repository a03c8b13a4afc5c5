//! Shared application state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use crate::history::{HistoryCapacities, HistoryTracker};
use crate::types::ScoredReading;

/// Shared state read by API handlers and written by the pipeline.
///
/// Wrapped in `Arc<tokio::sync::RwLock<>>`. Every append takes the write
/// lock once; history stays in reading-timestamp order even when appends
/// arrive out of order.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Activity feed and per-node trend buffers
    pub history: HistoryTracker,

    /// Most recent scored reading per node id
    pub latest: HashMap<String, LatestReading>,

    pub started_at: DateTime<Utc>,

    /// Monotonic start instant for uptime
    pub uptime: Instant,

    pub readings_processed: u64,

    pub anomalies_detected: u64,

    pub status: SystemStatus,
}

/// Latest scored reading for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestReading {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub scored: ScoredReading,
}

impl AppState {
    pub fn new(capacities: HistoryCapacities) -> Self {
        Self {
            history: HistoryTracker::new(capacities),
            latest: HashMap::new(),
            started_at: Utc::now(),
            uptime: Instant::now(),
            readings_processed: 0,
            anomalies_detected: 0,
            status: SystemStatus::Initializing,
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.uptime.elapsed().as_secs()
    }

    pub fn latest_for(&self, node_id: &str) -> Option<&LatestReading> {
        self.latest.get(node_id)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(HistoryCapacities::default())
    }
}

/// System operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemStatus {
    /// Starting up, nothing ingested yet
    Initializing,
    /// Replaying historical readings into the store
    Backfilling,
    /// Normal operation
    Monitoring,
    /// Live feed stopped
    Stopped,
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemStatus::Initializing => write!(f, "Initializing"),
            SystemStatus::Backfilling => write!(f, "Backfilling"),
            SystemStatus::Monitoring => write!(f, "Monitoring"),
            SystemStatus::Stopped => write!(f, "Stopped"),
        }
    }
}
