//! Forecast points and per-node series

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DetectionSource;

/// One predicted sample. Generated on request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub minutes_ahead: u32,
    pub predicted_stress: u8,
    pub predicted_noise: f64,
    pub predicted_temp: f64,
    pub predicted_aqi: i32,
    pub predicted_crowd: i32,
    /// 0.0-1.0, non-increasing with `minutes_ahead`
    pub confidence: f64,
}

/// Direction of a forecast series from its first to its last point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Increasing => write!(f, "increasing"),
            Trend::Decreasing => write!(f, "decreasing"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// Forecast for a single node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub node_id: String,
    #[serde(default)]
    pub node_name: String,
    pub generated_at: DateTime<Utc>,
    pub horizon_minutes: u32,
    pub points: Vec<ForecastPoint>,
    pub trend: Trend,
    #[serde(default)]
    pub source: DetectionSource,
}
