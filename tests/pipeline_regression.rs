//! Pipeline Regression Tests
//!
//! Drives simulated days through the full reading pipeline (scoring,
//! detection, history, anomaly store) and asserts on data integrity:
//! bounded logs, no NaN values, signals only on anomalies, store and
//! counters agreeing, and reproducibility for a fixed seed.

use citypulse::config::CityConfig;
use citypulse::ml::{LocalFallback, MlGateway, RemoteMlClient};
use citypulse::pipeline::{AppState, LiveFeed, ReadingPipeline, SystemStatus};
use citypulse::processing::NOMINAL_EXPLANATION;
use citypulse::simulator::SensorSimulator;
use citypulse::storage::{AnomalyStore, MockStore};
use citypulse::types::{DetectionSource, SensorNode, SensorReading};

use axum::routing::post;
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

const SEED: u64 = 42;

fn build_pipeline(config: &CityConfig, remote: Option<RemoteMlClient>) -> Arc<ReadingPipeline> {
    let local = LocalFallback::new(config.nodes.clone(), config.city.utc_offset(), Some(SEED));
    let gateway = Arc::new(MlGateway::new(remote, local));
    let store: Arc<dyn AnomalyStore> = Arc::new(MockStore::new(config.store.mock_capacity));
    let app_state = Arc::new(RwLock::new(AppState::new(config.history.capacities())));
    Arc::new(ReadingPipeline::new(gateway, store, app_state))
}

fn unreachable_remote() -> RemoteMlClient {
    RemoteMlClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap()
}

/// Local `/detect` service that holds its first reply for `first_delay` and
/// answers every later call at once. Returns the base URL.
async fn spawn_slow_detector(first_delay: Duration) -> String {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = Router::new().route(
        "/detect",
        post(move || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    tokio::time::sleep(first_delay).await;
                }
                Json(json!({
                    "is_anomaly": false,
                    "anomaly_score": 0.2,
                    "signals": [],
                    "explanation": "All sensor readings within normal parameters"
                }))
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Backfill `hours` ending at a fixed instant; returns the pipeline.
async fn run_backfill(hours: u32, anomaly_rate: f64) -> Arc<ReadingPipeline> {
    let config = CityConfig::default();
    let pipeline = build_pipeline(&config, None);
    let mut simulator = SensorSimulator::seeded(SEED, anomaly_rate, config.city.utc_offset());
    let end = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
    pipeline.backfill(&mut simulator, &config.nodes, end, hours, 15).await;
    pipeline
}

// ============================================================================
// Backfill integrity
// ============================================================================

#[tokio::test]
async fn backfill_day_respects_log_caps() {
    let pipeline = run_backfill(24, 0.05).await;
    let state = pipeline.app_state().read().await;

    assert_eq!(state.readings_processed, 24 * 4 * 5);
    assert_eq!(state.history.recent_activity().len(), 50);
    for node in CityConfig::default().nodes {
        assert_eq!(state.history.node_activity(&node.id).len(), 20);
        assert_eq!(state.history.node_history(&node.id).len(), 20);
        assert!(state.latest_for(&node.id).is_some());
    }
}

#[tokio::test]
async fn backfill_produces_no_nan_and_valid_ranges() {
    let pipeline = run_backfill(12, 0.1).await;
    let state = pipeline.app_state().read().await;

    for node in CityConfig::default().nodes {
        for point in state.history.node_history(&node.id) {
            assert!(point.stress_index <= 100);
            assert!(point.noise.is_finite() && point.temperature.is_finite());
            assert!(point.air_quality >= 0 && point.crowd_density >= 0);
        }
        let latest = state.latest_for(&node.id).unwrap();
        assert_eq!(latest.scored.source, DetectionSource::Fallback);
        if latest.scored.is_anomaly {
            assert!(!latest.scored.signals.is_empty());
        } else {
            assert!(latest.scored.signals.is_empty());
            assert_eq!(latest.scored.explanation, NOMINAL_EXPLANATION);
        }
    }
}

#[tokio::test]
async fn store_matches_anomaly_counter() {
    let pipeline = run_backfill(6, 0.3).await;
    let detected = pipeline.app_state().read().await.anomalies_detected;
    assert!(detected > 0, "a 30% anomaly rate should flag something");
    assert_eq!(pipeline.store().len().unwrap() as u64, detected);
}

#[tokio::test]
async fn seeded_backfill_is_reproducible() {
    let a = run_backfill(4, 0.1).await;
    let b = run_backfill(4, 0.1).await;
    let (a, b) = (a.app_state().read().await, b.app_state().read().await);

    for node in CityConfig::default().nodes {
        let sa: Vec<u8> = a.history.node_history(&node.id).iter().map(|p| p.stress_index).collect();
        let sb: Vec<u8> = b.history.node_history(&node.id).iter().map(|p| p.stress_index).collect();
        assert_eq!(sa, sb, "node {} diverged", node.id);
    }
    assert_eq!(a.anomalies_detected, b.anomalies_detected);
}

// ============================================================================
// Remote fallback
// ============================================================================

#[tokio::test]
async fn unreachable_remote_falls_back_on_ingest() {
    let config = CityConfig::default();
    let pipeline = build_pipeline(&config, Some(unreachable_remote()));
    assert!(pipeline.gateway().has_remote());

    let node = &config.nodes[0];
    let processed = pipeline
        .ingest(node, &SensorReading::new(50.0, 38.0, 60, 8), Utc::now())
        .await
        .unwrap();

    assert_eq!(processed.scored.source, DetectionSource::Fallback);
    assert!(processed.scored.is_anomaly);
    assert_eq!(processed.scored.explanation, "Temperature 38°C indicates heat stress");
    assert_eq!(pipeline.store().len().unwrap(), 1);
}

#[tokio::test]
async fn unreachable_remote_falls_back_on_forecast() {
    let config = CityConfig::default();
    let pipeline = build_pipeline(&config, Some(unreachable_remote()));

    let series = pipeline.gateway().forecast(Some("CP-MOH-02"), 30).await.unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].source, DetectionSource::Fallback);
    assert_eq!(series[0].points.len(), 3);

    assert!(pipeline.gateway().forecast(Some("CP-MOH-99"), 30).await.is_err());
}

#[tokio::test]
async fn slow_remote_keeps_node_history_chronological() {
    let config = CityConfig::default();
    let base_url = spawn_slow_detector(Duration::from_millis(600)).await;
    let remote = RemoteMlClient::new(&base_url, Duration::from_secs(5)).unwrap();
    let pipeline = build_pipeline(&config, Some(remote));
    let node = config.nodes[0].clone();

    let ingest = |pipeline: Arc<ReadingPipeline>, node: SensorNode| {
        tokio::spawn(async move {
            pipeline
                .ingest(&node, &SensorReading::new(60.0, 25.0, 70, 5), Utc::now())
                .await
        })
    };
    let first = ingest(Arc::clone(&pipeline), node.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = ingest(Arc::clone(&pipeline), node.clone());

    // The second reading is committed while the first still waits on detect.
    let second = second.await.unwrap().unwrap();
    let first = first.await.unwrap().unwrap();
    assert!(first.point.timestamp < second.point.timestamp);
    assert_eq!(first.scored.source, DetectionSource::Remote);
    assert_eq!(second.scored.source, DetectionSource::Remote);

    let state = pipeline.app_state().read().await;
    let timestamps: Vec<_> = state.history.node_history(&node.id).iter().map(|p| p.timestamp).collect();
    assert_eq!(timestamps, vec![first.point.timestamp, second.point.timestamp]);
    let activity: Vec<_> = state.history.node_activity(&node.id).iter().map(|e| e.timestamp).collect();
    assert_eq!(activity, vec![second.activity.timestamp, first.activity.timestamp]);
    assert_eq!(state.latest_for(&node.id).unwrap().timestamp, second.point.timestamp);
}

// ============================================================================
// Live feed
// ============================================================================

#[tokio::test]
async fn live_feed_ingests_until_cancelled() {
    let config = CityConfig::default();
    let pipeline = build_pipeline(&config, None);
    let cancel = CancellationToken::new();
    let feed = LiveFeed::new(
        Arc::clone(&pipeline),
        SensorSimulator::seeded(SEED, 0.0, config.city.utc_offset()),
        config.nodes.clone(),
        Duration::from_secs(60),
        cancel.clone(),
    );

    let handle = tokio::spawn(feed.run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    let stats = handle.await.unwrap();

    // The first tick fires immediately; the next is a minute away.
    assert_eq!(stats.ticks, 1);
    assert_eq!(stats.readings, 5);
    let state = pipeline.app_state().read().await;
    assert_eq!(state.readings_processed, 5);
    assert_eq!(state.status, SystemStatus::Stopped);
}
