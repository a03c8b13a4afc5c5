//! Forecast fallback generator
//!
//! Synthesizes a short-horizon stress forecast per node when the external
//! forecasting service is unavailable. Each series is a first-order
//! exponentially smoothed random walk drifting toward a diurnal target:
//!
//! ```text
//! next = round(prev * 0.7 + (45 * base_factor) * 0.3 + ε),  ε ~ U(-5, 5)
//! ```
//!
//! clamped to [20, 85]. The random source is injected so callers (and tests)
//! control seeding.

use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use rand::Rng;
use thiserror::Error;

use crate::types::{DetectionSource, ForecastPoint, ForecastSeries, SensorNode, Trend};

/// Spacing between forecast points (minutes)
pub const FORECAST_STEP_MINUTES: u32 = 15;
/// Horizon used when the caller does not specify one (minutes)
pub const DEFAULT_HORIZON_MINUTES: u32 = 60;
/// Longest horizon accepted (minutes)
pub const MAX_HORIZON_MINUTES: u32 = 1_440;
/// Minimum first-to-last change classified as a trend
pub const TREND_DELTA: i16 = 8;

const STRESS_FLOOR: f64 = 20.0;
const STRESS_CEILING: f64 = 85.0;
const SEED_STRESS_MIN: u8 = 45;
const SEED_STRESS_MAX: u8 = 65;
const SMOOTHING: f64 = 0.7;
const DIURNAL_TARGET: f64 = 45.0;
const PERTURBATION: f64 = 5.0;

const CONFIDENCE_START: f64 = 0.9;
const CONFIDENCE_DECAY_PER_MINUTE: f64 = 0.003;
const CONFIDENCE_FLOOR: f64 = 0.65;

/// Forecast request errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForecastError {
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Horizon must be a multiple of 15 between 15 and 1440 minutes, got {0}")]
    InvalidHorizon(u32),
}

/// Diurnal multiplier for an hour of the (local) day.
///
/// Evening rush 17:00-19:00 overrides the daytime factor.
pub fn base_factor(hour: u32) -> f64 {
    if (17..19).contains(&hour) {
        1.4
    } else if (8..20).contains(&hour) {
        1.2
    } else {
        0.8
    }
}

/// Confidence for a point `minutes_ahead` into the future.
pub fn confidence_at(minutes_ahead: u32) -> f64 {
    (CONFIDENCE_START - CONFIDENCE_DECAY_PER_MINUTE * f64::from(minutes_ahead)).max(CONFIDENCE_FLOOR)
}

/// Classify the change from the first to the last predicted stress.
pub fn trend_between(first: u8, last: u8) -> Trend {
    let delta = i16::from(last) - i16::from(first);
    if delta > TREND_DELTA {
        Trend::Increasing
    } else if -delta > TREND_DELTA {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Trend of a generated series; empty or single-point series are stable.
pub fn classify_trend(points: &[ForecastPoint]) -> Trend {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => trend_between(first.predicted_stress, last.predicted_stress),
        _ => Trend::Stable,
    }
}

/// Accept multiples of `FORECAST_STEP_MINUTES` up to `MAX_HORIZON_MINUTES`.
pub fn validate_horizon(horizon_minutes: u32) -> Result<u32, ForecastError> {
    if horizon_minutes == 0
        || horizon_minutes > MAX_HORIZON_MINUTES
        || horizon_minutes % FORECAST_STEP_MINUTES != 0
    {
        return Err(ForecastError::InvalidHorizon(horizon_minutes));
    }
    Ok(horizon_minutes)
}

/// Generate one series for `node`, stepping from `start` to `start + horizon`.
///
/// `local_offset` decides which hour of day each step falls into.
pub fn generate_series<R: Rng + ?Sized>(
    rng: &mut R,
    node: &SensorNode,
    start: DateTime<Utc>,
    local_offset: FixedOffset,
    horizon_minutes: u32,
) -> Result<ForecastSeries, ForecastError> {
    let horizon_minutes = validate_horizon(horizon_minutes)?;

    let mut previous_stress = f64::from(rng.gen_range(SEED_STRESS_MIN..=SEED_STRESS_MAX));
    let mut points = Vec::with_capacity((horizon_minutes / FORECAST_STEP_MINUTES + 1) as usize);

    for minutes_ahead in (0..=horizon_minutes).step_by(FORECAST_STEP_MINUTES as usize) {
        let timestamp = start + Duration::minutes(i64::from(minutes_ahead));
        let hour = timestamp.with_timezone(&local_offset).hour();

        let drift = DIURNAL_TARGET * base_factor(hour);
        let noise = rng.gen_range(-PERTURBATION..=PERTURBATION);
        let stress = (previous_stress * SMOOTHING + drift * (1.0 - SMOOTHING) + noise)
            .round()
            .clamp(STRESS_FLOOR, STRESS_CEILING);
        previous_stress = stress;

        points.push(derive_point(rng, timestamp, minutes_ahead, stress));
    }

    let trend = classify_trend(&points);
    Ok(ForecastSeries {
        node_id: node.id.clone(),
        node_name: node.name.clone(),
        generated_at: start,
        horizon_minutes,
        points,
        trend,
        source: DetectionSource::Fallback,
    })
}

/// Generate series for one node (by id) or for every node when `node_id` is `None`.
pub fn generate_forecasts<R: Rng + ?Sized>(
    rng: &mut R,
    nodes: &[SensorNode],
    node_id: Option<&str>,
    start: DateTime<Utc>,
    local_offset: FixedOffset,
    horizon_minutes: u32,
) -> Result<Vec<ForecastSeries>, ForecastError> {
    match node_id {
        Some(id) => {
            let node = nodes
                .iter()
                .find(|n| n.id == id)
                .ok_or_else(|| ForecastError::UnknownNode(id.to_string()))?;
            Ok(vec![generate_series(rng, node, start, local_offset, horizon_minutes)?])
        }
        None => nodes
            .iter()
            .map(|node| generate_series(rng, node, start, local_offset, horizon_minutes))
            .collect(),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn derive_point<R: Rng + ?Sized>(
    rng: &mut R,
    timestamp: DateTime<Utc>,
    minutes_ahead: u32,
    stress: f64,
) -> ForecastPoint {
    let noise = 45.0 + stress * 0.45 + rng.gen_range(-2.0..=2.0);
    let temp = 24.0 + stress * 0.12 + rng.gen_range(-1.0..=1.0);
    let aqi = 40.0 + stress * 1.1 + rng.gen_range(-5.0..=5.0);
    let crowd = (stress * 0.25 + rng.gen_range(-2.0..=2.0)).max(0.0);

    ForecastPoint {
        timestamp,
        minutes_ahead,
        predicted_stress: stress as u8,
        predicted_noise: round1(noise),
        predicted_temp: round1(temp),
        predicted_aqi: aqi.round() as i32,
        predicted_crowd: crowd.round() as i32,
        confidence: confidence_at(minutes_ahead),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
