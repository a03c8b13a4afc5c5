//! HTTP client for the external ML microservice

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{AnomalyDetector, Detection, Forecaster, MlError};
use crate::types::{DetectionSource, ForecastSeries, SensorReading};

/// Body of `POST {base}/detect`.
#[derive(Debug, Clone, Serialize)]
pub struct DetectRequest {
    #[serde(flatten)]
    pub reading: SensorReading,
    pub stress_index: u8,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    forecasts: Vec<ForecastSeries>,
}

/// reqwest-backed detector and forecaster.
#[derive(Clone)]
pub struct RemoteMlClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteMlClient {
    /// Every request made by this client is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MlError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AnomalyDetector for RemoteMlClient {
    async fn detect(&self, reading: &SensorReading, stress_index: u8) -> Result<Detection, MlError> {
        let body = DetectRequest {
            reading: *reading,
            stress_index,
        };
        let resp = self
            .http
            .post(format!("{}/detect", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(MlError::ServerError(resp.status()));
        }

        let mut detection: Detection = resp.json().await?;
        if !detection.anomaly_score.is_finite() {
            return Err(MlError::Decode(format!("anomaly_score = {}", detection.anomaly_score)));
        }
        detection.source = DetectionSource::Remote;
        debug!(is_anomaly = detection.is_anomaly, score = detection.anomaly_score, "Remote detection");
        Ok(detection)
    }
}

#[async_trait]
impl Forecaster for RemoteMlClient {
    async fn forecast(&self, node_id: Option<&str>, horizon_minutes: u32) -> Result<Vec<ForecastSeries>, MlError> {
        let mut query: Vec<(&str, String)> = vec![("horizon", horizon_minutes.to_string())];
        if let Some(id) = node_id {
            query.push(("node_id", id.to_string()));
        }

        let resp = self
            .http
            .get(format!("{}/forecast", self.base_url))
            .query(&query)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(MlError::ServerError(resp.status()));
        }

        let body: ForecastResponse = resp.json().await?;
        if body.forecasts.is_empty() {
            return Err(MlError::Decode("empty forecast list".to_string()));
        }
        Ok(body
            .forecasts
            .into_iter()
            .map(|mut series| {
                series.source = DetectionSource::Remote;
                series
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = RemoteMlClient::new("http://ml.local:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://ml.local:8000");
    }

    #[test]
    fn test_detect_request_shape() {
        let body = DetectRequest {
            reading: SensorReading::new(72.5, 31.0, 95, 14),
            stress_index: 58,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["noise"], 72.5);
        assert_eq!(json["air_quality"], 95);
        assert_eq!(json["stress_index"], 58);
    }

    #[test]
    fn test_detection_decodes_unknown_signal() {
        let raw = r#"{"is_anomaly":true,"anomaly_score":0.91,"signals":["noise","vibration"],"explanation":"x"}"#;
        let detection: Detection = serde_json::from_str(raw).unwrap();
        assert!(detection.signals.contains(&crate::types::Signal::Other("vibration".into())));
        assert_eq!(detection.source, DetectionSource::Fallback);
    }

    #[tokio::test]
    async fn test_unreachable_is_error() {
        let client = RemoteMlClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let result = client.detect(&SensorReading::new(50.0, 20.0, 50, 5), 21).await;
        assert!(matches!(result, Err(MlError::Http(_))));
    }
}
