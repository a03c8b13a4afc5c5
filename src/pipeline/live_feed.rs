//! Live mock feed: one simulated reading per node every tick until cancelled.

use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{ReadingPipeline, SystemStatus};
use crate::simulator::SensorSimulator;
use crate::types::SensorNode;

/// Totals reported when the feed stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub ticks: u64,
    pub readings: u64,
    pub anomalies: u64,
}

pub struct LiveFeed<R: Rng> {
    pipeline: Arc<ReadingPipeline>,
    simulator: SensorSimulator<R>,
    nodes: Vec<SensorNode>,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl<R: Rng> LiveFeed<R> {
    /// A zero interval is raised to one second.
    pub fn new(
        pipeline: Arc<ReadingPipeline>,
        simulator: SensorSimulator<R>,
        nodes: Vec<SensorNode>,
        interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        let interval = if interval.is_zero() { Duration::from_secs(1) } else { interval };
        Self {
            pipeline,
            simulator,
            nodes,
            interval,
            cancel_token,
        }
    }

    /// Run until the cancel token fires. Returns final statistics.
    pub async fn run(mut self) -> FeedStats {
        let mut stats = FeedStats::default();
        let mut ticker = tokio::time::interval(self.interval);

        info!(
            nodes = self.nodes.len(),
            interval = ?self.interval,
            "Live feed started"
        );
        self.pipeline.app_state().write().await.status = SystemStatus::Monitoring;

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[LiveFeed] Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {}
            }

            stats.ticks += 1;
            let now = Utc::now();
            for node in &self.nodes {
                let sample = self.simulator.sample(node, now);
                match self.pipeline.ingest(node, &sample.reading, now).await {
                    Ok(processed) => {
                        stats.readings += 1;
                        if processed.anomaly.is_some() {
                            stats.anomalies += 1;
                            info!(
                                node_id = %node.id,
                                stress_index = processed.scored.stress_index,
                                injected = ?sample.injected,
                                explanation = %processed.scored.explanation,
                                "Anomaly detected"
                            );
                        }
                    }
                    Err(e) => warn!(node_id = %node.id, error = %e, "Dropping simulated reading"),
                }
            }
        }

        self.pipeline.app_state().write().await.status = SystemStatus::Stopped;
        info!(
            ticks = stats.ticks,
            readings = stats.readings,
            anomalies = stats.anomalies,
            "Live feed stopped"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CityConfig;
    use crate::ml::{LocalFallback, MlGateway};
    use crate::pipeline::AppState;
    use crate::storage::{AnomalyStore, MockStore};
    use tokio::sync::RwLock;

    #[tokio::test]
    async fn test_feed_stops_on_cancel() {
        let config = CityConfig::default();
        let gateway = Arc::new(MlGateway::local_only(LocalFallback::new(
            config.nodes.clone(),
            config.city.utc_offset(),
            Some(4),
        )));
        let store: Arc<dyn AnomalyStore> = Arc::new(MockStore::default());
        let state = Arc::new(RwLock::new(AppState::default()));
        let pipeline = Arc::new(ReadingPipeline::new(gateway, store, state.clone()));

        let token = CancellationToken::new();
        let feed = LiveFeed::new(
            pipeline,
            SensorSimulator::seeded(4, 0.0, config.city.utc_offset()),
            config.nodes.clone(),
            Duration::from_millis(10),
            token.clone(),
        );
        let handle = tokio::spawn(feed.run());

        tokio::time::sleep(Duration::from_millis(60)).await;
        token.cancel();
        let stats = handle.await.unwrap();

        assert!(stats.ticks >= 1);
        assert_eq!(stats.readings, stats.ticks * 5);
        let state = state.read().await;
        assert_eq!(state.status, SystemStatus::Stopped);
        assert_eq!(state.readings_processed, stats.readings);
    }
}
