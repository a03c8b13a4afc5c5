//! City Configuration - deployment settings as operator-tunable TOML values
//!
//! Each section implements `Default` with the values in [`super::defaults`],
//! so an empty or missing file yields a working mock deployment.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use super::validation::{check_plausibility, validate_unknown_keys};
use crate::history::HistoryCapacities;
use crate::types::SensorNode;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "CITYPULSE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "citypulse.toml";

// ============================================================================
// Errors
// ============================================================================

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Config parse error ({}): {source}", .path.display())]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a CityPulse deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityConfig {
    #[serde(default)]
    pub city: CityInfo,

    #[serde(default)]
    pub server: ServerConfig,

    /// External ML / forecast microservice
    #[serde(default)]
    pub ml: MlServiceConfig,

    /// Mock sensor feed
    #[serde(default)]
    pub simulator: SimulatorConfig,

    /// Bounded log capacities
    #[serde(default)]
    pub history: HistoryConfig,

    /// Anomaly store backend
    #[serde(default)]
    pub store: StoreConfig,

    /// Sensor node registry
    #[serde(default = "SensorNode::default_nodes")]
    pub nodes: Vec<SensorNode>,
}

impl Default for CityConfig {
    fn default() -> Self {
        Self {
            city: CityInfo::default(),
            server: ServerConfig::default(),
            ml: MlServiceConfig::default(),
            simulator: SimulatorConfig::default(),
            history: HistoryConfig::default(),
            store: StoreConfig::default(),
            nodes: SensorNode::default_nodes(),
        }
    }
}

impl CityConfig {
    /// Load configuration using the standard search order:
    /// 1. `$CITYPULSE_CONFIG` environment variable
    /// 2. `./citypulse.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), city = %config.city.name, "Loaded config from CITYPULSE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from CITYPULSE_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "CITYPULSE_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(city = %config.city.name, "Loaded config from ./citypulse.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./citypulse.toml, using defaults");
                }
            }
        }

        info!("No citypulse.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        log_warnings(&contents, &config);
        Ok(config)
    }

    /// Parse and validate a TOML string (no file involved).
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        log_warnings(contents, &config);
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate all settings for internal consistency.
    ///
    /// Rules:
    /// - History capacities must be > 0
    /// - ML timeout must be > 0 and the base URL, when set, must be http(s)
    /// - Simulator interval > 0, anomaly rate within 0-1
    /// - UTC offset within ±14 h
    /// - Node ids non-empty and unique
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let h = &self.history;
        for (name, value) in [
            ("history.activity_capacity", h.activity_capacity),
            ("history.node_activity_capacity", h.node_activity_capacity),
            ("history.node_history_capacity", h.node_history_capacity),
            ("store.mock_capacity", self.store.mock_capacity),
        ] {
            if value == 0 {
                errors.push(format!("{name} must be greater than 0"));
            }
        }

        if self.ml.timeout_ms == 0 {
            errors.push("ml.timeout_ms must be greater than 0".to_string());
        }
        if let Some(url) = &self.ml.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(format!("ml.base_url must start with http:// or https:// (got {url})"));
            }
        }

        if self.simulator.interval_secs == 0 {
            errors.push("simulator.interval_secs must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.simulator.anomaly_rate) {
            errors.push(format!(
                "simulator.anomaly_rate ({}) must be between 0 and 1",
                self.simulator.anomaly_rate
            ));
        }
        if self.simulator.backfill_interval_minutes == 0 {
            errors.push("simulator.backfill_interval_minutes must be greater than 0".to_string());
        }

        if self.city.utc_offset_minutes.abs() > 14 * 60 {
            errors.push(format!(
                "city.utc_offset_minutes ({}) must be within ±840",
                self.city.utc_offset_minutes
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                errors.push("nodes: node id must not be empty".to_string());
            } else if !seen.insert(node.id.as_str()) {
                errors.push(format!("nodes: duplicate node id {}", node.id));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Look up a node by id.
    pub fn node(&self, node_id: &str) -> Option<&SensorNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }
}

fn log_warnings(raw_toml: &str, config: &CityConfig) {
    for w in validate_unknown_keys(raw_toml)
        .into_iter()
        .chain(check_plausibility(config))
    {
        warn!(field = %w.field, "{}", w);
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Deployment identity and local time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityInfo {
    #[serde(default = "default_city_name")]
    pub name: String,

    /// Local time offset from UTC (minutes). Drives diurnal patterns.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
}

fn default_city_name() -> String {
    defaults::CITY_NAME.to_string()
}

const fn default_utc_offset() -> i32 {
    defaults::UTC_OFFSET_MINUTES
}

impl Default for CityInfo {
    fn default() -> Self {
        Self {
            name: default_city_name(),
            utc_offset_minutes: default_utc_offset(),
        }
    }
}

impl CityInfo {
    /// Local offset; an out-of-range value degrades to UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Overridden by the `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,

    /// Allowed CORS origins. Empty = same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            cors_origins: Vec::new(),
        }
    }
}

/// External ML microservice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlServiceConfig {
    /// Base URL, e.g. `http://localhost:8000`. Unset = local fallback only.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request timeout (milliseconds).
    #[serde(default = "default_ml_timeout")]
    pub timeout_ms: u64,
}

const fn default_ml_timeout() -> u64 {
    defaults::ML_TIMEOUT_MS
}

impl Default for MlServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_ml_timeout(),
        }
    }
}

impl MlServiceConfig {
    pub const fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

/// Mock sensor feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Run the live mock feed.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_anomaly_rate")]
    pub anomaly_rate: f64,

    /// Fixed seed for reproducible runs. Unset = seeded from entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_backfill_hours")]
    pub backfill_hours: u32,

    #[serde(default = "default_backfill_interval")]
    pub backfill_interval_minutes: u32,
}

const fn default_true() -> bool {
    true
}

const fn default_interval_secs() -> u64 {
    defaults::SIMULATOR_INTERVAL_SECS
}

const fn default_anomaly_rate() -> f64 {
    defaults::SIMULATOR_ANOMALY_RATE
}

const fn default_backfill_hours() -> u32 {
    defaults::BACKFILL_HOURS
}

const fn default_backfill_interval() -> u32 {
    defaults::BACKFILL_INTERVAL_MINUTES
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            anomaly_rate: default_anomaly_rate(),
            seed: None,
            backfill_hours: default_backfill_hours(),
            backfill_interval_minutes: default_backfill_interval(),
        }
    }
}

/// Bounded log capacities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_activity_capacity")]
    pub activity_capacity: usize,

    #[serde(default = "default_node_activity_capacity")]
    pub node_activity_capacity: usize,

    #[serde(default = "default_node_history_capacity")]
    pub node_history_capacity: usize,
}

const fn default_activity_capacity() -> usize {
    defaults::ACTIVITY_LOG_CAPACITY
}

const fn default_node_activity_capacity() -> usize {
    defaults::NODE_ACTIVITY_CAPACITY
}

const fn default_node_history_capacity() -> usize {
    defaults::NODE_HISTORY_CAPACITY
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            activity_capacity: default_activity_capacity(),
            node_activity_capacity: default_node_activity_capacity(),
            node_history_capacity: default_node_history_capacity(),
        }
    }
}

impl HistoryConfig {
    pub const fn capacities(&self) -> HistoryCapacities {
        HistoryCapacities {
            activity: self.activity_capacity,
            node_activity: self.node_activity_capacity,
            node_history: self.node_history_capacity,
        }
    }
}

/// Which anomaly store to run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-memory, backfilled from the simulator at startup
    #[default]
    Mock,
    /// Persistent sled database
    Sled,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mock" => Ok(StoreBackend::Mock),
            "sled" => Ok(StoreBackend::Sled),
            other => Err(format!("unknown store backend: {other} (expected mock or sled)")),
        }
    }
}

/// Anomaly store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Directory for the sled backend.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Capacity of the mock backend.
    #[serde(default = "default_mock_capacity")]
    pub mock_capacity: usize,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(defaults::SLED_STORE_PATH)
}

const fn default_mock_capacity() -> usize {
    defaults::MOCK_STORE_CAPACITY
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
            mock_capacity: default_mock_capacity(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
