//! Sensor node registry entries and stored anomaly records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{ScoredReading, Signal};

/// Land-use class of the area a node sits in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    Commercial,
    Residential,
    #[default]
    Mixed,
}

impl std::fmt::Display for ZoneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneType::Commercial => write!(f, "commercial"),
            ZoneType::Residential => write!(f, "residential"),
            ZoneType::Mixed => write!(f, "mixed"),
        }
    }
}

/// A deployed sensor node and its typical readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorNode {
    pub id: String,
    pub name: String,
    pub sector: String,
    #[serde(default)]
    pub zone: ZoneType,
    /// Typical noise level (dB)
    pub base_noise: f64,
    /// Typical temperature (°C)
    pub base_temp: f64,
    /// Typical AQI
    pub base_aqi: f64,
    /// Typical crowd count
    pub base_crowd: f64,
}

impl SensorNode {
    /// The five pilot nodes deployed around Mohali.
    pub fn default_nodes() -> Vec<SensorNode> {
        vec![
            Self::pilot("CP-MOH-01", "IT Park Sector 70", "Sector 70", ZoneType::Commercial, 58.0, 28.0, 85.0, 12.0),
            Self::pilot("CP-MOH-02", "Phase 11", "Phase 11", ZoneType::Residential, 48.0, 27.0, 75.0, 6.0),
            Self::pilot("CP-MOH-03", "Phase 7", "Phase 7", ZoneType::Mixed, 52.0, 27.5, 80.0, 10.0),
            Self::pilot("CP-MOH-04", "Sector 77", "Sector 77", ZoneType::Residential, 45.0, 26.5, 72.0, 5.0),
            Self::pilot("CP-MOH-05", "Phase 3B2", "Phase 3B2", ZoneType::Commercial, 60.0, 28.5, 88.0, 15.0),
        ]
    }

    #[allow(clippy::too_many_arguments)]
    fn pilot(
        id: &str,
        name: &str,
        sector: &str,
        zone: ZoneType,
        base_noise: f64,
        base_temp: f64,
        base_aqi: f64,
        base_crowd: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            sector: sector.to_string(),
            zone,
            base_noise,
            base_temp,
            base_aqi,
            base_crowd,
        }
    }
}

/// An anomaly as exposed by the store listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub node_id: String,
    pub node_name: String,
    pub sector: String,
    pub anomaly_score: f64,
    pub signals: BTreeSet<Signal>,
    pub explanation: String,
    pub stress_index: u8,
}

impl AnomalyRecord {
    /// Build a store record for an anomalous reading. Returns `None` for
    /// readings that were not flagged.
    pub fn from_scored(node: &SensorNode, scored: &ScoredReading, timestamp: DateTime<Utc>) -> Option<Self> {
        if !scored.is_anomaly {
            return None;
        }
        Some(Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            sector: node.sector.clone(),
            anomaly_score: scored.anomaly_score,
            signals: scored.signals.clone(),
            explanation: scored.explanation.clone(),
            stress_index: scored.stress_index,
        })
    }
}
