//! Activity log entries and per-node historical points

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ScoredReading, SeverityTier};

/// Event classification shown in the activity feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum EventType {
    #[default]
    Normal,
    Elevated,
    Critical,
}

impl From<SeverityTier> for EventType {
    fn from(tier: SeverityTier) -> Self {
        match tier {
            SeverityTier::Nominal => EventType::Normal,
            SeverityTier::Elevated => EventType::Elevated,
            SeverityTier::Critical => EventType::Critical,
        }
    }
}

/// One entry per processed reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
    pub event_type: EventType,
    /// Stress index of the reading
    pub value: u8,
}

impl ActivityEntry {
    pub fn from_scored(node_id: &str, scored: &ScoredReading, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            node_id: node_id.to_string(),
            event_type: scored.severity.into(),
            value: scored.stress_index,
        }
    }
}

/// Trend-chart sample for one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub timestamp: DateTime<Utc>,
    pub stress_index: u8,
    pub noise: f64,
    pub temperature: f64,
    pub air_quality: i32,
    pub crowd_density: i32,
}

impl HistoricalPoint {
    pub fn from_scored(scored: &ScoredReading, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            stress_index: scored.stress_index,
            noise: scored.reading.noise,
            temperature: scored.reading.temperature,
            air_quality: scored.reading.air_quality,
            crowd_density: scored.reading.crowd_density,
        }
    }
}
