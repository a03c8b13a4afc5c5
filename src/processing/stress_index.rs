//! Urban Stress Index (USI) Scoring
//!
//! Deterministic, rule-based score calculation for a single sensor reading.
//! Each sensor is mapped onto a 0-100 sub-score with a fixed linear mapping,
//! then combined with fixed weights:
//!
//! - 40% Noise (40 dB → 0, 100 dB → 100)
//! - 25% Temperature (15 °C → 0, 40 °C → 100)
//! - 20% Air quality (AQI 0 → 0, AQI 150 → 100)
//! - 15% Crowd density (0 → 0, 30 people → 100)
//!
//! Sub-scores are capped at 100 but not floored, so a very quiet or cold
//! reading pulls the composite down; the composite is floored at 0.

use serde::Serialize;

use super::ScoringError;
use crate::types::SensorReading;

/// Noise level mapped to a sub-score of 0 (dB)
pub const NOISE_FLOOR_DB: f64 = 40.0;
/// Noise range covered by the 0-100 sub-score (dB)
pub const NOISE_SPAN_DB: f64 = 60.0;
/// Temperature mapped to a sub-score of 0 (°C)
pub const TEMP_FLOOR_C: f64 = 15.0;
/// Temperature range covered by the 0-100 sub-score (°C)
pub const TEMP_SPAN_C: f64 = 25.0;
/// AQI mapped to a sub-score of 100
pub const AQI_SPAN: f64 = 150.0;
/// Crowd count mapped to a sub-score of 100
pub const CROWD_SPAN: f64 = 30.0;

pub const NOISE_WEIGHT: f64 = 0.40;
pub const TEMP_WEIGHT: f64 = 0.25;
pub const AIR_WEIGHT: f64 = 0.20;
pub const CROWD_WEIGHT: f64 = 0.15;

/// Per-sensor contributions before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubScores {
    pub noise: f64,
    pub temperature: f64,
    pub air_quality: f64,
    pub crowd: f64,
}

impl SubScores {
    /// Weighted composite, before rounding and clamping.
    pub fn weighted(&self) -> f64 {
        (self.noise * NOISE_WEIGHT)
            + (self.temperature * TEMP_WEIGHT)
            + (self.air_quality * AIR_WEIGHT)
            + (self.crowd * CROWD_WEIGHT)
    }
}

/// Reject readings that would produce a misleading score.
pub fn validate_reading(reading: &SensorReading) -> Result<(), ScoringError> {
    if !reading.noise.is_finite() {
        return Err(ScoringError::invalid("noise", reading.noise));
    }
    if !reading.temperature.is_finite() {
        return Err(ScoringError::invalid("temperature", reading.temperature));
    }
    if reading.air_quality < 0 {
        return Err(ScoringError::invalid("air_quality", reading.air_quality));
    }
    if reading.crowd_density < 0 {
        return Err(ScoringError::invalid("crowd_density", reading.crowd_density));
    }
    Ok(())
}

/// Compute the per-sensor sub-scores for a reading.
pub fn sub_scores(reading: &SensorReading) -> Result<SubScores, ScoringError> {
    validate_reading(reading)?;

    Ok(SubScores {
        noise: cap(((reading.noise - NOISE_FLOOR_DB) / NOISE_SPAN_DB) * 100.0),
        temperature: cap(((reading.temperature - TEMP_FLOOR_C) / TEMP_SPAN_C) * 100.0),
        air_quality: cap((f64::from(reading.air_quality) / AQI_SPAN) * 100.0),
        crowd: cap((f64::from(reading.crowd_density) / CROWD_SPAN) * 100.0),
    })
}

/// Calculate the Urban Stress Index (0-100) for a reading.
///
/// # Errors
///
/// Returns [`ScoringError::InvalidInput`] when noise or temperature is not a
/// finite number, or AQI / crowd density is negative.
pub fn calculate_stress_index(reading: &SensorReading) -> Result<u8, ScoringError> {
    let scores = sub_scores(reading)?;
    Ok(round_to_index(scores.weighted()))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_to_index(weighted: f64) -> u8 {
    weighted.round().clamp(0.0, 100.0) as u8
}

fn cap(score: f64) -> f64 {
    score.min(100.0)
}
