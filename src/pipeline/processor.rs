//! Per-reading orchestration: score, detect, build records, append.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{AppState, SystemStatus};
use crate::ml::{scored_reading, MlGateway};
use crate::processing::{calculate_stress_index, ScoringError};
use crate::simulator::SensorSimulator;
use crate::storage::AnomalyStore;
use crate::types::{ActivityEntry, AnomalyRecord, HistoricalPoint, ScoredReading, SensorNode, SensorReading};

/// Everything derived from one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedReading {
    pub scored: ScoredReading,
    pub activity: ActivityEntry,
    pub point: HistoricalPoint,
    /// Present only when the reading was flagged
    pub anomaly: Option<AnomalyRecord>,
}

/// Counts from a startup backfill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillStats {
    pub readings: u64,
    pub anomalies: u64,
}

pub struct ReadingPipeline {
    gateway: Arc<MlGateway>,
    store: Arc<dyn AnomalyStore>,
    app_state: Arc<RwLock<AppState>>,
}

impl ReadingPipeline {
    pub fn new(gateway: Arc<MlGateway>, store: Arc<dyn AnomalyStore>, app_state: Arc<RwLock<AppState>>) -> Self {
        Self {
            gateway,
            store,
            app_state,
        }
    }

    pub fn gateway(&self) -> &Arc<MlGateway> {
        &self.gateway
    }

    pub fn store(&self) -> &Arc<dyn AnomalyStore> {
        &self.store
    }

    pub fn app_state(&self) -> &Arc<RwLock<AppState>> {
        &self.app_state
    }

    /// Score and classify a reading without touching shared state.
    pub async fn process(
        &self,
        node: &SensorNode,
        reading: &SensorReading,
        timestamp: DateTime<Utc>,
    ) -> Result<ProcessedReading, ScoringError> {
        let scored = self.gateway.score(reading).await?;
        Ok(assemble(node, scored, timestamp))
    }

    /// Process a reading, then append it to the history tracker and, when
    /// flagged, the anomaly store.
    ///
    /// Store failures are logged and do not fail the ingest.
    pub async fn ingest(
        &self,
        node: &SensorNode,
        reading: &SensorReading,
        timestamp: DateTime<Utc>,
    ) -> Result<ProcessedReading, ScoringError> {
        let processed = self.process(node, reading, timestamp).await?;
        self.commit(&node.id, &processed).await;
        Ok(processed)
    }

    /// Replay `hours` of simulated readings ending at `end` for every node.
    ///
    /// Detection uses the local fallback only, so a slow or absent ML
    /// service cannot stall startup.
    pub async fn backfill<R: Rng>(
        &self,
        simulator: &mut SensorSimulator<R>,
        nodes: &[SensorNode],
        end: DateTime<Utc>,
        hours: u32,
        interval_minutes: u32,
    ) -> BackfillStats {
        let mut stats = BackfillStats::default();
        if hours == 0 || interval_minutes == 0 {
            return stats;
        }

        self.app_state.write().await.status = SystemStatus::Backfilling;

        let steps = i64::from(hours) * 60 / i64::from(interval_minutes);
        let start = end - Duration::hours(i64::from(hours));

        for step in 0..steps {
            let timestamp = start + Duration::minutes(step * i64::from(interval_minutes));
            for node in nodes {
                let reading = simulator.sample(node, timestamp).reading;
                let stress_index = match calculate_stress_index(&reading) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!(node_id = %node.id, error = %e, "Skipping invalid backfill reading");
                        continue;
                    }
                };
                let detection = self.gateway.local().classify(&reading, stress_index);
                let processed = assemble(node, scored_reading(reading, stress_index, detection), timestamp);

                stats.readings += 1;
                if processed.anomaly.is_some() {
                    stats.anomalies += 1;
                }
                self.commit(&node.id, &processed).await;
            }
        }

        info!(
            readings = stats.readings,
            anomalies = stats.anomalies,
            hours,
            "Backfill complete"
        );
        stats
    }

    async fn commit(&self, node_id: &str, processed: &ProcessedReading) {
        {
            let mut state = self.app_state.write().await;
            state
                .history
                .record(processed.activity.clone(), processed.point.clone());
            let is_newest = state
                .latest
                .get(node_id)
                .map_or(true, |prev| prev.timestamp <= processed.point.timestamp);
            if is_newest {
                state.latest.insert(
                    node_id.to_string(),
                    super::LatestReading {
                        timestamp: processed.point.timestamp,
                        scored: processed.scored.clone(),
                    },
                );
            }
            state.readings_processed += 1;
            if processed.anomaly.is_some() {
                state.anomalies_detected += 1;
            }
        }

        if let Some(anomaly) = &processed.anomaly {
            debug!(node_id, stress_index = anomaly.stress_index, "Anomaly recorded");
            if let Err(e) = self.store.record(anomaly) {
                warn!(node_id, error = %e, "Failed to persist anomaly");
            }
        }
    }
}

fn assemble(node: &SensorNode, scored: ScoredReading, timestamp: DateTime<Utc>) -> ProcessedReading {
    ProcessedReading {
        activity: ActivityEntry::from_scored(&node.id, &scored, timestamp),
        point: HistoricalPoint::from_scored(&scored, timestamp),
        anomaly: AnomalyRecord::from_scored(node, &scored, timestamp),
        scored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CityConfig;
    use crate::ml::LocalFallback;
    use crate::storage::MockStore;
    use crate::types::{EventType, Signal};

    fn pipeline() -> (ReadingPipeline, CityConfig) {
        let config = CityConfig::default();
        let gateway = Arc::new(MlGateway::local_only(LocalFallback::new(
            config.nodes.clone(),
            config.city.utc_offset(),
            Some(3),
        )));
        let store: Arc<dyn AnomalyStore> = Arc::new(MockStore::default());
        let state = Arc::new(RwLock::new(AppState::new(config.history.capacities())));
        (ReadingPipeline::new(gateway, store, state), config)
    }

    #[tokio::test]
    async fn test_process_does_not_append() {
        let (pipeline, config) = pipeline();
        let node = &config.nodes[0];
        let processed = pipeline
            .process(node, &SensorReading::new(50.0, 20.0, 50, 5), Utc::now())
            .await
            .unwrap();
        assert_eq!(processed.activity.value, 21);
        assert_eq!(processed.activity.event_type, EventType::Normal);
        assert!(processed.anomaly.is_none());
        assert_eq!(pipeline.app_state().read().await.readings_processed, 0);
    }

    #[tokio::test]
    async fn test_ingest_anomaly_reaches_store() {
        let (pipeline, config) = pipeline();
        let node = &config.nodes[1];
        let processed = pipeline
            .ingest(node, &SensorReading::new(50.0, 20.0, 50, 30), Utc::now())
            .await
            .unwrap();

        let anomaly = processed.anomaly.unwrap();
        assert!(anomaly.signals.contains(&Signal::Crowd));
        assert_eq!(anomaly.node_id, node.id);
        assert_eq!(pipeline.store().len().unwrap(), 1);

        let state = pipeline.app_state().read().await;
        assert_eq!(state.anomalies_detected, 1);
        assert_eq!(state.history.node_history(&node.id).len(), 1);
        assert!(state.latest_for(&node.id).is_some());
    }

    #[tokio::test]
    async fn test_older_reading_does_not_replace_latest() {
        let (pipeline, config) = pipeline();
        let node = &config.nodes[0];
        let now = Utc::now();
        pipeline
            .ingest(node, &SensorReading::new(50.0, 20.0, 50, 5), now)
            .await
            .unwrap();
        pipeline
            .ingest(node, &SensorReading::new(92.0, 20.0, 50, 5), now - Duration::seconds(1))
            .await
            .unwrap();

        let state = pipeline.app_state().read().await;
        let latest = state.latest_for(&node.id).unwrap();
        assert_eq!(latest.timestamp, now);
        assert_eq!(latest.scored.stress_index, 21);
        let points: Vec<_> = state.history.node_history(&node.id).iter().map(|p| p.timestamp).collect();
        assert_eq!(points, vec![now - Duration::seconds(1), now]);
    }

    #[tokio::test]
    async fn test_ingest_rejects_invalid() {
        let (pipeline, config) = pipeline();
        let result = pipeline
            .ingest(&config.nodes[0], &SensorReading::new(50.0, f64::INFINITY, 50, 5), Utc::now())
            .await;
        assert!(result.is_err());
        assert_eq!(pipeline.app_state().read().await.readings_processed, 0);
    }

    #[tokio::test]
    async fn test_backfill_fills_history() {
        let (pipeline, config) = pipeline();
        let mut sim = SensorSimulator::seeded(8, 0.05, config.city.utc_offset());
        let stats = pipeline.backfill(&mut sim, &config.nodes, Utc::now(), 2, 15).await;

        assert_eq!(stats.readings, 8 * 5);
        let state = pipeline.app_state().read().await;
        assert_eq!(state.readings_processed, 40);
        assert_eq!(state.history.node_history("CP-MOH-01").len(), 8);
        assert_eq!(state.history.recent_activity().len(), 40);
        assert_eq!(pipeline.store().len().unwrap() as u64, stats.anomalies);
    }
}
