//! Regional activity patterns for Mohali/Chandigarh
//!
//! Hour-of-day, seasonal and land-use multipliers applied to each node's
//! baseline readings. Derived from CPCB air quality, Meteostat station 42101
//! and regional traffic/noise studies.

use crate::types::ZoneType;

/// One multiplier per sensor channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorFactors {
    pub noise: f64,
    pub temp: f64,
    pub aqi: f64,
    pub crowd: f64,
}

impl SensorFactors {
    pub const fn uniform(value: f64) -> Self {
        Self {
            noise: value,
            temp: value,
            aqi: value,
            crowd: value,
        }
    }

    /// Channel-wise product.
    pub fn combine(self, other: Self) -> Self {
        Self {
            noise: self.noise * other.noise,
            temp: self.temp * other.temp,
            aqi: self.aqi * other.aqi,
            crowd: self.crowd * other.crowd,
        }
    }
}

const DIURNAL_NOISE: [f64; 24] = [
    0.6, 0.5, 0.5, 0.5, 0.55, 0.65, 0.75, 0.85, 0.95, 1.0, 0.95, 0.9, //
    0.85, 0.85, 0.9, 0.95, 1.0, 1.05, 1.1, 1.05, 0.95, 0.85, 0.75, 0.65,
];

const DIURNAL_TEMP: [f64; 24] = [
    0.85, 0.82, 0.80, 0.78, 0.77, 0.78, 0.82, 0.88, 0.93, 0.97, 1.0, 1.02, //
    1.05, 1.08, 1.1, 1.08, 1.05, 1.0, 0.95, 0.92, 0.90, 0.88, 0.87, 0.86,
];

const DIURNAL_AQI: [f64; 24] = [
    0.85, 0.82, 0.80, 0.80, 0.82, 0.88, 0.95, 1.05, 1.1, 1.05, 0.95, 0.90, //
    0.88, 0.90, 0.92, 0.95, 1.0, 1.08, 1.12, 1.1, 1.05, 0.98, 0.92, 0.88,
];

const DIURNAL_CROWD: [f64; 24] = [
    0.1, 0.08, 0.05, 0.05, 0.1, 0.2, 0.4, 0.6, 0.85, 1.0, 0.95, 0.85, //
    0.75, 0.8, 0.85, 0.9, 0.95, 1.1, 1.15, 1.1, 0.9, 0.7, 0.5, 0.3,
];

/// Hour-of-day multipliers (hour 0-23; out-of-range hours wrap).
pub fn diurnal(hour: u32) -> SensorFactors {
    let h = (hour % 24) as usize;
    SensorFactors {
        noise: DIURNAL_NOISE[h],
        temp: DIURNAL_TEMP[h],
        aqi: DIURNAL_AQI[h],
        crowd: DIURNAL_CROWD[h],
    }
}

/// North-Indian climate seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    /// March - June
    Summer,
    /// July - September
    Monsoon,
    /// October - November (stubble burning, AQI peak)
    PostMonsoon,
    /// December - February
    Winter,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=6 => Season::Summer,
            7..=9 => Season::Monsoon,
            10 | 11 => Season::PostMonsoon,
            _ => Season::Winter,
        }
    }

    pub const fn factors(self) -> SensorFactors {
        match self {
            Season::Summer => SensorFactors { noise: 1.0, temp: 1.3, aqi: 0.9, crowd: 0.9 },
            Season::Monsoon => SensorFactors { noise: 0.95, temp: 0.85, aqi: 0.7, crowd: 0.85 },
            Season::PostMonsoon => SensorFactors { noise: 1.0, temp: 0.9, aqi: 1.3, crowd: 1.0 },
            Season::Winter => SensorFactors { noise: 1.0, temp: 0.65, aqi: 1.5, crowd: 1.1 },
        }
    }
}

/// Land-use multipliers.
pub const fn zone(zone: ZoneType) -> SensorFactors {
    match zone {
        ZoneType::Commercial => SensorFactors { noise: 1.2, temp: 1.05, aqi: 1.1, crowd: 1.3 },
        ZoneType::Residential => SensorFactors { noise: 0.85, temp: 0.98, aqi: 0.95, crowd: 0.7 },
        ZoneType::Mixed => SensorFactors::uniform(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_from_month() {
        assert_eq!(Season::from_month(1), Season::Winter);
        assert_eq!(Season::from_month(4), Season::Summer);
        assert_eq!(Season::from_month(8), Season::Monsoon);
        assert_eq!(Season::from_month(10), Season::PostMonsoon);
        assert_eq!(Season::from_month(12), Season::Winter);
    }

    #[test]
    fn test_evening_crowd_peak() {
        let peak = (0..24).max_by(|a, b| diurnal(*a).crowd.total_cmp(&diurnal(*b).crowd));
        assert_eq!(peak, Some(18));
    }

    #[test]
    fn test_mixed_zone_is_neutral() {
        assert_eq!(zone(ZoneType::Mixed), SensorFactors::uniform(1.0));
    }

    #[test]
    fn test_combine_multiplies() {
        let f = SensorFactors::uniform(2.0).combine(Season::Winter.factors());
        assert!((f.aqi - 3.0).abs() < 1e-12);
        assert!((f.temp - 1.3).abs() < 1e-12);
    }
}
