//! Shared data structures for the CityPulse urban-sensing pipeline
//!
//! This module defines the records that flow between the stages:
//! - SensorReading (raw node sample)
//! - ScoredReading (USI + classification + explanation)
//! - ActivityEntry / HistoricalPoint (windowed history)
//! - ForecastPoint / ForecastSeries (short-horizon forecasts)
//! - SensorNode / AnomalyRecord (registry and store records)

mod reading;
mod activity;
mod forecast;
mod node;

pub use reading::*;
pub use activity::*;
pub use forecast::*;
pub use node::*;
