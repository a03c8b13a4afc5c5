//! Sensor readings and their scored form

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Raw Reading
// ============================================================================

/// One sample from an urban sensor node.
///
/// Field aliases accept the camelCase shape emitted by the dashboard and the
/// mock generators (`airQuality`, `crowdDensity`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Ambient noise (dB)
    pub noise: f64,
    /// Air temperature (°C)
    pub temperature: f64,
    /// Air quality index
    #[serde(alias = "airQuality")]
    pub air_quality: i32,
    /// People counted in the node's field of view
    #[serde(alias = "crowdDensity")]
    pub crowd_density: i32,
}

impl SensorReading {
    pub fn new(noise: f64, temperature: f64, air_quality: i32, crowd_density: i32) -> Self {
        Self {
            noise,
            temperature,
            air_quality,
            crowd_density,
        }
    }
}

// ============================================================================
// Signals
// ============================================================================

/// Tag naming which threshold (or combination) flagged a reading.
///
/// Serialized as the plain tag string. Tags the ML service returns that this
/// crate does not know are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Signal {
    Noise,
    Heat,
    AirQuality,
    Crowd,
    /// Stress index above the anomaly threshold with no single dominant cause
    Composite,
    Other(String),
}

impl Signal {
    pub fn as_str(&self) -> &str {
        match self {
            Signal::Noise => "noise",
            Signal::Heat => "heat",
            Signal::AirQuality => "air_quality",
            Signal::Crowd => "crowd",
            Signal::Composite => "composite",
            Signal::Other(tag) => tag,
        }
    }
}

impl From<String> for Signal {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "noise" => Signal::Noise,
            "heat" => Signal::Heat,
            "air_quality" => Signal::AirQuality,
            "crowd" => Signal::Crowd,
            "composite" => Signal::Composite,
            _ => Signal::Other(tag),
        }
    }
}

impl From<&str> for Signal {
    fn from(tag: &str) -> Self {
        Signal::from(tag.to_string())
    }
}

impl From<Signal> for String {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Severity
// ============================================================================

/// Coarse display tier derived from the stress index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub enum SeverityTier {
    #[default]
    Nominal,
    Elevated,
    Critical,
}

impl std::fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeverityTier::Nominal => write!(f, "Nominal"),
            SeverityTier::Elevated => write!(f, "Elevated"),
            SeverityTier::Critical => write!(f, "Critical"),
        }
    }
}

/// Which implementation produced a detection or forecast.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    /// External ML microservice
    Remote,
    /// Local rule table / generator
    #[default]
    Fallback,
}

// ============================================================================
// Scored Reading
// ============================================================================

/// A reading together with everything derived from it.
///
/// Never persisted on its own; recomputed for every reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredReading {
    #[serde(flatten)]
    pub reading: SensorReading,
    /// Urban Stress Index, 0-100
    pub stress_index: u8,
    pub severity: SeverityTier,
    /// Empty unless `is_anomaly`
    pub signals: BTreeSet<Signal>,
    pub is_anomaly: bool,
    /// Anomaly score reported by the detector (local fallback uses stress / 100)
    pub anomaly_score: f64,
    pub explanation: String,
    pub source: DetectionSource,
}
