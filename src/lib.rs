//! CityPulse: Urban Stress Monitoring
//!
//! Turns raw environmental sensor readings (noise, temperature, air quality,
//! crowd density) into an Urban Stress Index, flags anomalies, explains them
//! and forecasts short-horizon stress per sensor node.
//!
//! ## Architecture
//!
//! - **Processing**: pure scoring, classification and explanation rules
//! - **ML Gateway**: remote detector/forecaster with a local fallback
//! - **Forecast**: smoothed random-walk stress forecasts
//! - **History**: bounded activity feeds and per-node trend buffers
//! - **Storage**: mock (in-memory) or sled-backed anomaly store
//! - **Pipeline**: per-reading orchestration, live feed and backfill
//! - **API**: axum JSON endpoints for the dashboard

pub mod api;
pub mod config;
pub mod forecast;
pub mod history;
pub mod ml;
pub mod pipeline;
pub mod processing;
pub mod simulator;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::CityConfig;

// Re-export commonly used types
pub use types::{
    ActivityEntry, AnomalyRecord, DetectionSource, EventType, ForecastPoint, ForecastSeries,
    HistoricalPoint, ScoredReading, SensorNode, SensorReading, SeverityTier, Signal, Trend, ZoneType,
};

// Re-export scoring entry points
pub use processing::{calculate_stress_index, classify, explain, ScoringError};

// Re-export gateway and storage
pub use ml::{MlError, MlGateway};
pub use storage::{AnomalyStore, MockStore, SledStore, StoreError};
