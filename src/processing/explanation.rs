//! Rule-table explanations (ML service fallback)
//!
//! Produces the explanation string when the external explanation service is
//! unreachable or answered with a non-success status. A successful remote
//! response bypasses this module entirely.
//!
//! Rules are evaluated top to bottom, first match wins:
//!
//! 1. `noise`       → "Noise level {dB} dB exceeds baseline"
//! 2. `heat`        → "Temperature {°C}°C indicates heat stress"
//! 3. `air_quality` → "AQI {aqi} above safe threshold"
//! 4. USI > 80      → multi-sensor correlation (tags `composite`)
//! 5. `crowd`       → "Crowd density {n} exceeds comfortable capacity"
//! 6. otherwise     → nominal status

use std::collections::BTreeSet;

use super::ANOMALY_STRESS_THRESHOLD;
use crate::types::{SensorReading, Signal};

pub const NOMINAL_EXPLANATION: &str = "All sensor readings within normal parameters";
pub const COMPOSITE_EXPLANATION: &str = "Multi-sensor correlation indicates urban stress anomaly";

/// Produce the fallback explanation for a classified reading.
///
/// `signals` gains the `composite` tag when the multi-sensor rule matches.
pub fn explain(reading: &SensorReading, signals: &mut BTreeSet<Signal>, stress_index: u8) -> String {
    if signals.contains(&Signal::Noise) {
        return format!("Noise level {} dB exceeds baseline", reading.noise);
    }
    if signals.contains(&Signal::Heat) {
        return format!("Temperature {}°C indicates heat stress", reading.temperature);
    }
    if signals.contains(&Signal::AirQuality) {
        return format!("AQI {} above safe threshold", reading.air_quality);
    }
    if stress_index > ANOMALY_STRESS_THRESHOLD {
        signals.insert(Signal::Composite);
        return COMPOSITE_EXPLANATION.to_string();
    }
    if signals.contains(&Signal::Crowd) {
        return format!("Crowd density {} exceeds comfortable capacity", reading.crowd_density);
    }
    NOMINAL_EXPLANATION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_wins_over_heat() {
        let reading = SensorReading::new(90.0, 38.0, 50, 5);
        let mut signals = BTreeSet::from([Signal::Noise, Signal::Heat]);
        let text = explain(&reading, &mut signals, 60);
        assert_eq!(text, "Noise level 90 dB exceeds baseline");
    }

    #[test]
    fn test_fractional_values_keep_precision() {
        let reading = SensorReading::new(50.0, 36.5, 50, 5);
        let mut signals = BTreeSet::from([Signal::Heat]);
        assert_eq!(
            explain(&reading, &mut signals, 55),
            "Temperature 36.5°C indicates heat stress"
        );
    }

    #[test]
    fn test_air_quality_message() {
        let reading = SensorReading::new(50.0, 20.0, 142, 5);
        let mut signals = BTreeSet::from([Signal::AirQuality, Signal::Crowd]);
        assert_eq!(explain(&reading, &mut signals, 40), "AQI 142 above safe threshold");
    }

    #[test]
    fn test_composite_added_when_missing() {
        let reading = SensorReading::new(80.0, 33.0, 110, 26);
        let mut signals = BTreeSet::from([Signal::Crowd]);
        let text = explain(&reading, &mut signals, 82);
        assert_eq!(text, COMPOSITE_EXPLANATION);
        assert!(signals.contains(&Signal::Composite));
        assert!(signals.contains(&Signal::Crowd));
    }

    #[test]
    fn test_crowd_only_below_stress_threshold() {
        let reading = SensorReading::new(55.0, 22.0, 60, 28);
        let mut signals = BTreeSet::from([Signal::Crowd]);
        assert_eq!(
            explain(&reading, &mut signals, 41),
            "Crowd density 28 exceeds comfortable capacity"
        );
    }

    #[test]
    fn test_nominal_when_nothing_fired() {
        let reading = SensorReading::new(50.0, 20.0, 50, 5);
        let mut signals = BTreeSet::new();
        assert_eq!(explain(&reading, &mut signals, 21), NOMINAL_EXPLANATION);
        assert!(signals.is_empty());
    }
}
