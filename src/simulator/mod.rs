//! Sensor Simulator
//!
//! Produces plausible readings for a [`SensorNode`] at a given instant by
//! scaling the node's baselines with hour-of-day, seasonal and zone
//! multipliers, then adding Gaussian variance. A configurable fraction of
//! readings carries an injected anomaly (noise spike, heat wave, pollution
//! event or crowd surge).
//!
//! The RNG is owned by the simulator and injected at construction so a fixed
//! seed reproduces the exact same stream.

pub mod patterns;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::Serialize;

use crate::types::{SensorNode, SensorReading};
use patterns::{Season, SensorFactors};

// ============================================================================
// Variance and Clamps
// ============================================================================

/// Relative standard deviation per channel
const NOISE_SIGMA: f64 = 0.08;
const TEMP_SIGMA: f64 = 0.03;
const AQI_SIGMA: f64 = 0.12;
const CROWD_SIGMA: f64 = 0.15;

const NOISE_RANGE: (f64, f64) = (35.0, 100.0);
const TEMP_RANGE: (f64, f64) = (10.0, 45.0);
const AQI_RANGE: (f64, f64) = (20.0, 300.0);
const CROWD_RANGE: (f64, f64) = (0.0, 40.0);

/// Ceilings after anomaly injection
const NOISE_SPIKE_CAP: f64 = 100.0;
const HEAT_WAVE_CAP: f64 = 45.0;
const POLLUTION_CAP: f64 = 400.0;
const CROWD_SURGE_CAP: f64 = 50.0;

// ============================================================================
// Injected Anomalies
// ============================================================================

/// Kind of anomaly injected into a simulated reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectedAnomaly {
    NoiseSpike,
    HeatWave,
    PollutionEvent,
    CrowdSurge,
}

impl InjectedAnomaly {
    pub const ALL: [InjectedAnomaly; 4] = [
        InjectedAnomaly::NoiseSpike,
        InjectedAnomaly::HeatWave,
        InjectedAnomaly::PollutionEvent,
        InjectedAnomaly::CrowdSurge,
    ];
}

/// One simulated sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulatedReading {
    pub reading: SensorReading,
    pub injected: Option<InjectedAnomaly>,
}

/// Raw channel values before rounding.
#[derive(Debug, Clone, Copy)]
struct RawChannels {
    noise: f64,
    temp: f64,
    aqi: f64,
    crowd: f64,
}

// ============================================================================
// Simulator
// ============================================================================

pub struct SensorSimulator<R: Rng = StdRng> {
    rng: R,
    anomaly_rate: f64,
    local_offset: FixedOffset,
}

impl SensorSimulator<StdRng> {
    /// Reproducible simulator.
    pub fn seeded(seed: u64, anomaly_rate: f64, local_offset: FixedOffset) -> Self {
        Self::new(StdRng::seed_from_u64(seed), anomaly_rate, local_offset)
    }

    pub fn from_entropy(anomaly_rate: f64, local_offset: FixedOffset) -> Self {
        Self::new(StdRng::from_entropy(), anomaly_rate, local_offset)
    }

    /// Seeded when `seed` is given, entropy otherwise.
    pub fn with_optional_seed(seed: Option<u64>, anomaly_rate: f64, local_offset: FixedOffset) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed, anomaly_rate, local_offset),
            None => Self::from_entropy(anomaly_rate, local_offset),
        }
    }
}

impl<R: Rng> SensorSimulator<R> {
    /// `anomaly_rate` is clamped to [0, 1].
    pub fn new(rng: R, anomaly_rate: f64, local_offset: FixedOffset) -> Self {
        let anomaly_rate = if anomaly_rate.is_finite() { anomaly_rate.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            rng,
            anomaly_rate,
            local_offset,
        }
    }

    pub fn anomaly_rate(&self) -> f64 {
        self.anomaly_rate
    }

    /// Sample a reading, injecting an anomaly with probability `anomaly_rate`.
    pub fn sample(&mut self, node: &SensorNode, at: DateTime<Utc>) -> SimulatedReading {
        let mut raw = self.baseline_channels(node, at);

        let injected = if self.anomaly_rate > 0.0 && self.rng.gen_bool(self.anomaly_rate) {
            let kind = InjectedAnomaly::ALL[self.rng.gen_range(0..InjectedAnomaly::ALL.len())];
            raw = self.apply_anomaly(raw, kind);
            Some(kind)
        } else {
            None
        };

        SimulatedReading {
            reading: finish(raw),
            injected,
        }
    }

    /// Sample a reading with no anomaly injection.
    pub fn baseline_reading(&mut self, node: &SensorNode, at: DateTime<Utc>) -> SensorReading {
        finish(self.baseline_channels(node, at))
    }

    /// Sample a reading with a specific anomaly injected.
    pub fn anomalous_reading(&mut self, node: &SensorNode, at: DateTime<Utc>, kind: InjectedAnomaly) -> SensorReading {
        let raw = self.baseline_channels(node, at);
        finish(self.apply_anomaly(raw, kind))
    }

    /// Combined multipliers for a node at an instant (local time).
    pub fn factors(&self, node: &SensorNode, at: DateTime<Utc>) -> SensorFactors {
        let local = at.with_timezone(&self.local_offset);
        patterns::diurnal(local.hour())
            .combine(Season::from_month(local.month()).factors())
            .combine(patterns::zone(node.zone))
    }

    fn baseline_channels(&mut self, node: &SensorNode, at: DateTime<Utc>) -> RawChannels {
        let f = self.factors(node, at);

        let noise = node.base_noise * f.noise * (1.0 + self.gaussian(NOISE_SIGMA));
        let temp = node.base_temp * f.temp * (1.0 + self.gaussian(TEMP_SIGMA));
        let aqi = node.base_aqi * f.aqi * (1.0 + self.gaussian(AQI_SIGMA));
        let crowd = (node.base_crowd * f.crowd * (1.0 + self.gaussian(CROWD_SIGMA))).max(0.0);

        RawChannels {
            noise: noise.clamp(NOISE_RANGE.0, NOISE_RANGE.1),
            temp: temp.clamp(TEMP_RANGE.0, TEMP_RANGE.1),
            aqi: aqi.clamp(AQI_RANGE.0, AQI_RANGE.1),
            crowd: crowd.clamp(CROWD_RANGE.0, CROWD_RANGE.1),
        }
    }

    fn apply_anomaly(&mut self, mut raw: RawChannels, kind: InjectedAnomaly) -> RawChannels {
        match kind {
            InjectedAnomaly::NoiseSpike => {
                raw.noise = (raw.noise * 1.5 + self.rng.gen_range(10.0..20.0)).min(NOISE_SPIKE_CAP);
            }
            InjectedAnomaly::HeatWave => {
                raw.temp = (raw.temp * 1.2 + self.rng.gen_range(3.0..6.0)).min(HEAT_WAVE_CAP);
            }
            InjectedAnomaly::PollutionEvent => {
                raw.aqi = (raw.aqi * 1.8 + self.rng.gen_range(30.0..60.0)).min(POLLUTION_CAP);
            }
            InjectedAnomaly::CrowdSurge => {
                raw.crowd = (raw.crowd * 2.0 + self.rng.gen_range(5.0..15.0)).min(CROWD_SURGE_CAP);
            }
        }
        raw
    }

    /// Zero-mean Gaussian with standard deviation `sigma`.
    fn gaussian(&mut self, sigma: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        z * sigma
    }
}

/// Noise and temperature to one decimal; AQI and crowd truncated to integers.
#[allow(clippy::cast_possible_truncation)]
fn finish(raw: RawChannels) -> SensorReading {
    SensorReading {
        noise: (raw.noise * 10.0).round() / 10.0,
        temperature: (raw.temp * 10.0).round() / 10.0,
        air_quality: raw.aqi.trunc() as i32,
        crowd_density: raw.crowd.trunc() as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(330 * 60).unwrap()
    }

    fn node(id: &str) -> SensorNode {
        SensorNode::default_nodes().into_iter().find(|n| n.id == id).unwrap()
    }

    #[test]
    fn test_same_seed_same_stream() {
        let n = node("CP-MOH-01");
        let start = Utc.with_ymd_and_hms(2025, 5, 1, 6, 0, 0).unwrap();
        let mut a = SensorSimulator::seeded(7, 0.1, ist());
        let mut b = SensorSimulator::seeded(7, 0.1, ist());
        for i in 0..50 {
            let at = start + Duration::minutes(i * 15);
            assert_eq!(a.sample(&n, at), b.sample(&n, at));
        }
    }

    #[test]
    fn test_readings_stay_in_clamps() {
        let mut sim = SensorSimulator::seeded(42, 0.0, ist());
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for n in SensorNode::default_nodes() {
            for i in 0..96 {
                let r = sim.baseline_reading(&n, start + Duration::minutes(i * 15));
                assert!((35.0..=100.0).contains(&r.noise), "noise {}", r.noise);
                assert!((10.0..=45.0).contains(&r.temperature), "temp {}", r.temperature);
                assert!((20..=300).contains(&r.air_quality), "aqi {}", r.air_quality);
                assert!((0..=40).contains(&r.crowd_density), "crowd {}", r.crowd_density);
            }
        }
    }

    #[test]
    fn test_zero_rate_never_injects() {
        let mut sim = SensorSimulator::seeded(1, 0.0, ist());
        let n = node("CP-MOH-02");
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        assert!((0..200).all(|_| sim.sample(&n, at).injected.is_none()));
    }

    #[test]
    fn test_full_rate_always_injects() {
        let mut sim = SensorSimulator::seeded(1, 1.0, ist());
        let n = node("CP-MOH-02");
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        assert!((0..50).all(|_| sim.sample(&n, at).injected.is_some()));
    }

    #[test]
    fn test_pollution_event_raises_aqi() {
        let n = node("CP-MOH-05");
        let at = Utc.with_ymd_and_hms(2025, 11, 5, 4, 0, 0).unwrap();
        let mut sim = SensorSimulator::seeded(3, 0.0, ist());
        let r = sim.anomalous_reading(&n, at, InjectedAnomaly::PollutionEvent);
        // 1.8x a clamped floor of 20 plus at least 30
        assert!(r.air_quality >= 66);
        assert!(r.air_quality <= 400);
    }

    #[test]
    fn test_noise_spike_capped() {
        let n = node("CP-MOH-05");
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();
        let mut sim = SensorSimulator::seeded(9, 0.0, ist());
        for _ in 0..50 {
            let r = sim.anomalous_reading(&n, at, InjectedAnomaly::NoiseSpike);
            assert!(r.noise <= 100.0);
            assert!(r.noise >= 35.0 * 1.5 + 10.0 - 0.05);
        }
    }

    #[test]
    fn test_factors_use_local_hour() {
        let sim = SensorSimulator::seeded(0, 0.0, ist());
        let n = node("CP-MOH-03");
        // 12:30 UTC = 18:00 IST, crowd peak
        let at = Utc.with_ymd_and_hms(2025, 4, 1, 12, 30, 0).unwrap();
        let f = sim.factors(&n, at);
        assert!((f.crowd - 1.15 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_rate_sanitized() {
        let sim = SensorSimulator::seeded(0, f64::NAN, ist());
        assert_eq!(sim.anomaly_rate(), 0.0);
        let sim = SensorSimulator::seeded(0, 3.0, ist());
        assert_eq!(sim.anomaly_rate(), 1.0);
    }
}
