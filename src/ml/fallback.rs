//! Local fallback for the ML service
//!
//! Rule-table classification plus the template explanations, and the
//! smoothed random-walk forecast generator. Used whenever the remote service
//! is absent or fails.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Mutex, PoisonError};

use super::{AnomalyDetector, Detection, Forecaster, MlError};
use crate::forecast::generate_forecasts;
use crate::processing::{classify, explain};
use crate::types::{DetectionSource, ForecastSeries, SensorNode, SensorReading};

pub struct LocalFallback {
    nodes: Vec<SensorNode>,
    local_offset: FixedOffset,
    rng: Mutex<StdRng>,
}

impl LocalFallback {
    /// Seeded when `seed` is given, entropy otherwise.
    pub fn new(nodes: Vec<SensorNode>, local_offset: FixedOffset, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            nodes,
            local_offset,
            rng: Mutex::new(rng),
        }
    }

    pub fn nodes(&self) -> &[SensorNode] {
        &self.nodes
    }

    pub fn knows_node(&self, node_id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == node_id)
    }

    /// Rule-table verdict. The anomaly score is the stress index scaled to 0-1.
    pub fn classify(&self, reading: &SensorReading, stress_index: u8) -> Detection {
        let classification = classify(reading, stress_index);
        let mut signals = classification.signals;
        let explanation = explain(reading, &mut signals, stress_index);

        Detection {
            is_anomaly: classification.is_anomaly,
            anomaly_score: f64::from(stress_index) / 100.0,
            signals,
            explanation,
            source: DetectionSource::Fallback,
        }
    }

    /// Forecast from an explicit start instant.
    pub fn forecast_from(
        &self,
        node_id: Option<&str>,
        start: DateTime<Utc>,
        horizon_minutes: u32,
    ) -> Result<Vec<ForecastSeries>, MlError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(generate_forecasts(
            &mut *rng,
            &self.nodes,
            node_id,
            start,
            self.local_offset,
            horizon_minutes,
        )?)
    }
}

#[async_trait]
impl AnomalyDetector for LocalFallback {
    async fn detect(&self, reading: &SensorReading, stress_index: u8) -> Result<Detection, MlError> {
        Ok(self.classify(reading, stress_index))
    }
}

#[async_trait]
impl Forecaster for LocalFallback {
    async fn forecast(&self, node_id: Option<&str>, horizon_minutes: u32) -> Result<Vec<ForecastSeries>, MlError> {
        self.forecast_from(node_id, Utc::now(), horizon_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::COMPOSITE_EXPLANATION;
    use crate::types::Signal;
    use chrono::TimeZone;

    fn fallback(seed: u64) -> LocalFallback {
        LocalFallback::new(
            SensorNode::default_nodes(),
            FixedOffset::east_opt(330 * 60).unwrap(),
            Some(seed),
        )
    }

    #[test]
    fn test_composite_at_85() {
        let detection = fallback(1).classify(&SensorReading::new(80.0, 34.0, 110, 20), 85);
        assert!(detection.is_anomaly);
        assert_eq!(detection.signals, [Signal::Composite].into_iter().collect());
        assert_eq!(detection.explanation, COMPOSITE_EXPLANATION);
        assert!((detection.anomaly_score - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_seeded_forecasts_repeat() {
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 3, 0, 0).unwrap();
        let a = fallback(11).forecast_from(None, start, 60).unwrap();
        let b = fallback(11).forecast_from(None, start, 60).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
    }

    #[tokio::test]
    async fn test_trait_objects() {
        let fb = fallback(2);
        let detector: &dyn AnomalyDetector = &fb;
        let d = detector.detect(&SensorReading::new(50.0, 20.0, 130, 5), 30).await.unwrap();
        assert_eq!(d.explanation, "AQI 130 above safe threshold");

        let forecaster: &dyn Forecaster = &fb;
        let series = forecaster.forecast(Some("CP-MOH-04"), 30).await.unwrap();
        assert_eq!(series[0].points.len(), 3);
    }
}
