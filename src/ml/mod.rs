//! ML Gateway
//!
//! Anomaly detection and forecasting are served by an external ML
//! microservice when one is configured. Every call goes through
//! [`MlGateway`], which tries the remote client first and, on any error,
//! logs a warning and answers from [`LocalFallback`] instead. Remote failures
//! never reach the caller.
//!
//! The stress index itself is always computed locally; only the
//! anomaly verdict, signals and explanation come from the detector.

mod fallback;
mod remote;

pub use fallback::LocalFallback;
pub use remote::{DetectRequest, RemoteMlClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::config::CityConfig;
use crate::forecast::{validate_horizon, ForecastError};
use crate::processing::{calculate_stress_index, severity_tier, ScoringError};
use crate::types::{DetectionSource, ForecastSeries, ScoredReading, SensorReading, Signal};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MlError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ML service returned status {0}")]
    ServerError(reqwest::StatusCode),

    #[error("Malformed ML response: {0}")]
    Decode(String),

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

// ============================================================================
// Detection
// ============================================================================

/// Anomaly verdict for one reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub is_anomaly: bool,
    pub anomaly_score: f64,
    #[serde(default)]
    pub signals: BTreeSet<Signal>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub source: DetectionSource,
}

/// Produces an anomaly verdict for a reading and its stress index.
#[async_trait]
pub trait AnomalyDetector: Send + Sync {
    async fn detect(&self, reading: &SensorReading, stress_index: u8) -> Result<Detection, MlError>;
}

/// Produces stress forecasts for one node (`Some(id)`) or all nodes.
#[async_trait]
pub trait Forecaster: Send + Sync {
    async fn forecast(&self, node_id: Option<&str>, horizon_minutes: u32) -> Result<Vec<ForecastSeries>, MlError>;
}

// ============================================================================
// Gateway
// ============================================================================

/// Remote-first detector and forecaster with a local fallback.
pub struct MlGateway {
    remote: Option<RemoteMlClient>,
    local: LocalFallback,
}

impl MlGateway {
    pub fn new(remote: Option<RemoteMlClient>, local: LocalFallback) -> Self {
        Self { remote, local }
    }

    /// Fallback only; no network calls are ever made.
    pub fn local_only(local: LocalFallback) -> Self {
        Self::new(None, local)
    }

    /// Build from configuration. The remote client is created only when
    /// `ml.base_url` is set.
    pub fn from_config(config: &CityConfig, seed: Option<u64>) -> Result<Self, MlError> {
        let remote = match config.ml.base_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Some(RemoteMlClient::new(url, config.ml.timeout())?),
            _ => None,
        };
        let local = LocalFallback::new(config.nodes.clone(), config.city.utc_offset(), seed);
        Ok(Self::new(remote, local))
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// "remote" when a service is configured, "fallback" otherwise.
    pub fn mode(&self) -> DetectionSource {
        if self.has_remote() {
            DetectionSource::Remote
        } else {
            DetectionSource::Fallback
        }
    }

    pub fn local(&self) -> &LocalFallback {
        &self.local
    }

    /// Detect with the remote service, falling back on any error.
    pub async fn detect(&self, reading: &SensorReading, stress_index: u8) -> Detection {
        if let Some(remote) = &self.remote {
            match remote.detect(reading, stress_index).await {
                Ok(detection) => return detection,
                Err(e) => warn!(error = %e, "ML detect failed, using local fallback"),
            }
        }
        self.local.classify(reading, stress_index)
    }

    /// Forecast with the remote service, falling back on any error.
    ///
    /// Horizon and node id are validated locally first so both paths reject
    /// the same requests.
    pub async fn forecast(&self, node_id: Option<&str>, horizon_minutes: u32) -> Result<Vec<ForecastSeries>, MlError> {
        validate_horizon(horizon_minutes)?;
        if let Some(id) = node_id {
            if !self.local.knows_node(id) {
                return Err(ForecastError::UnknownNode(id.to_string()).into());
            }
        }

        if let Some(remote) = &self.remote {
            match remote.forecast(node_id, horizon_minutes).await {
                Ok(series) => return Ok(series),
                Err(e) => warn!(error = %e, "ML forecast failed, using local fallback"),
            }
        }
        self.local.forecast(node_id, horizon_minutes).await
    }

    /// Score a reading and attach the detector's verdict.
    ///
    /// # Errors
    ///
    /// Fails only when the reading itself is invalid.
    pub async fn score(&self, reading: &SensorReading) -> Result<ScoredReading, ScoringError> {
        let stress_index = calculate_stress_index(reading)?;
        let detection = self.detect(reading, stress_index).await;
        debug!(
            stress_index,
            is_anomaly = detection.is_anomaly,
            source = ?detection.source,
            "Reading scored"
        );
        Ok(scored_reading(*reading, stress_index, detection))
    }
}

/// Combine a reading, its stress index and a detection.
///
/// The detection is carried over as is; only the severity tier is derived here.
pub fn scored_reading(reading: SensorReading, stress_index: u8, detection: Detection) -> ScoredReading {
    ScoredReading {
        reading,
        stress_index,
        severity: severity_tier(stress_index),
        signals: detection.signals,
        is_anomaly: detection.is_anomaly,
        anomaly_score: detection.anomaly_score,
        explanation: detection.explanation,
        source: detection.source,
    }
}
