//! Anomaly Store
//!
//! Pluggable persistence for [`AnomalyRecord`]s so the API does not care
//! where anomalies live:
//! - `MockStore`: bounded in-memory store, backfilled at startup
//! - `SledStore`: on-disk store keyed by big-endian timestamp
//!
//! The store is opened once in `main` and handed to the API state as an
//! `Arc<dyn AnomalyStore>`.

mod mock;
mod sled_store;

pub use mock::MockStore;
pub use sled_store::SledStore;

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};
use crate::types::AnomalyRecord;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage lock poisoned: {0}")]
    Poisoned(String),
}

/// Thread-safe anomaly persistence.
pub trait AnomalyStore: Send + Sync {
    fn record(&self, anomaly: &AnomalyRecord) -> Result<(), StoreError>;

    /// Records at or after `cutoff`, newest first, optionally for one node
    /// and capped at `limit`.
    fn list_since(
        &self,
        cutoff: DateTime<Utc>,
        node_id: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<AnomalyRecord>, StoreError>;

    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;

    /// Anomalies from the last `hours_window` hours, newest first.
    fn list_anomalies(&self, hours_window: u32, limit: usize) -> Result<Vec<AnomalyRecord>, StoreError> {
        self.list_since(window_start(hours_window), None, Some(limit))
    }

    /// Anomalies for one node from the last `hours_window` hours, newest first.
    fn list_anomalies_for_node(&self, node_id: &str, hours_window: u32) -> Result<Vec<AnomalyRecord>, StoreError> {
        self.list_since(window_start(hours_window), Some(node_id), None)
    }
}

fn window_start(hours_window: u32) -> DateTime<Utc> {
    Utc::now() - Duration::hours(i64::from(hours_window))
}

/// Open the backend named in configuration.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn AnomalyStore>, StoreError> {
    let store: Arc<dyn AnomalyStore> = match config.backend {
        StoreBackend::Mock => Arc::new(MockStore::new(config.mock_capacity)),
        StoreBackend::Sled => Arc::new(SledStore::open(&config.path)?),
    };
    tracing::info!(backend = store.backend_name(), "Anomaly store opened");
    Ok(store)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::types::Signal;

    pub fn record(node_id: &str, minutes_ago: i64, stress_index: u8) -> AnomalyRecord {
        AnomalyRecord {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            node_id: node_id.to_string(),
            node_name: format!("Node {node_id}"),
            sector: "Sector 70".to_string(),
            anomaly_score: f64::from(stress_index) / 100.0,
            signals: [Signal::Noise].into_iter().collect(),
            explanation: "Noise level 90 dB exceeds baseline".to_string(),
            stress_index,
        }
    }
}
