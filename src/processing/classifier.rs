//! Anomaly classification
//!
//! Each sensor threshold is evaluated independently and the fired tags are
//! OR-combined. A reading is anomalous when any tag fired or the stress index
//! exceeds [`ANOMALY_STRESS_THRESHOLD`].
//!
//! The severity tier uses its own cut points (75 / 50), which deliberately
//! differ from the anomaly cut point (80). A reading at USI 77 is shown as
//! Critical but is not flagged as an anomaly unless a sensor threshold fired.

use std::collections::BTreeSet;

use crate::types::{SensorReading, SeverityTier, Signal};

/// Noise above this fires the `noise` tag (dB)
pub const NOISE_THRESHOLD_DB: f64 = 85.0;
/// Temperature above this fires the `heat` tag (°C)
pub const HEAT_THRESHOLD_C: f64 = 35.0;
/// AQI above this fires the `air_quality` tag
pub const AQI_THRESHOLD: i32 = 120;
/// Crowd count above this fires the `crowd` tag
pub const CROWD_THRESHOLD: i32 = 25;

/// Stress index above this is anomalous on its own
pub const ANOMALY_STRESS_THRESHOLD: u8 = 80;
/// Stress index at or above this is shown as Critical
pub const CRITICAL_TIER_THRESHOLD: u8 = 75;
/// Stress index at or above this is shown as Elevated
pub const ELEVATED_TIER_THRESHOLD: u8 = 50;

/// Output of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_anomaly: bool,
    /// Empty when `is_anomaly` is false
    pub signals: BTreeSet<Signal>,
    pub severity: SeverityTier,
}

/// Classify a reading given its already-computed stress index.
pub fn classify(reading: &SensorReading, stress_index: u8) -> Classification {
    let mut signals = BTreeSet::new();

    if reading.noise > NOISE_THRESHOLD_DB {
        signals.insert(Signal::Noise);
    }
    if reading.temperature > HEAT_THRESHOLD_C {
        signals.insert(Signal::Heat);
    }
    if reading.air_quality > AQI_THRESHOLD {
        signals.insert(Signal::AirQuality);
    }
    if reading.crowd_density > CROWD_THRESHOLD {
        signals.insert(Signal::Crowd);
    }

    let stressed = stress_index > ANOMALY_STRESS_THRESHOLD;
    if stressed && signals.is_empty() {
        signals.insert(Signal::Composite);
    }

    Classification {
        is_anomaly: stressed || !signals.is_empty(),
        signals,
        severity: severity_tier(stress_index),
    }
}

/// Display tier for a stress index.
pub fn severity_tier(stress_index: u8) -> SeverityTier {
    if stress_index >= CRITICAL_TIER_THRESHOLD {
        SeverityTier::Critical
    } else if stress_index >= ELEVATED_TIER_THRESHOLD {
        SeverityTier::Elevated
    } else {
        SeverityTier::Nominal
    }
}
