//! System-wide default constants.
//!
//! Centralises the numbers that `citypulse.toml` can override.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Server
// ============================================================================

/// HTTP bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:8080";

// ============================================================================
// City
// ============================================================================

/// Deployment city name (display only).
pub const CITY_NAME: &str = "Mohali";

/// Local time offset from UTC (minutes). 330 = IST.
pub const UTC_OFFSET_MINUTES: i32 = 330;

// ============================================================================
// History Windows
// ============================================================================

/// Global activity feed capacity (entries).
pub const ACTIVITY_LOG_CAPACITY: usize = 50;

/// Per-node activity log capacity (entries).
pub const NODE_ACTIVITY_CAPACITY: usize = 20;

/// Per-node trend-chart capacity (points).
pub const NODE_HISTORY_CAPACITY: usize = 20;

// ============================================================================
// ML Service
// ============================================================================

/// Request timeout for the external ML service (milliseconds).
pub const ML_TIMEOUT_MS: u64 = 3_000;

// ============================================================================
// Simulation
// ============================================================================

/// Seconds between live mock readings per node.
pub const SIMULATOR_INTERVAL_SECS: u64 = 5;

/// Fraction of simulated readings with an injected anomaly.
pub const SIMULATOR_ANOMALY_RATE: f64 = 0.02;

/// Hours of readings replayed into the store at startup.
pub const BACKFILL_HOURS: u32 = 24;

/// Spacing of backfilled readings (minutes).
pub const BACKFILL_INTERVAL_MINUTES: u32 = 15;

// ============================================================================
// Anomaly Store
// ============================================================================

/// Records kept by the in-memory mock store before the oldest is dropped.
pub const MOCK_STORE_CAPACITY: usize = 500;

/// Directory for the sled-backed store.
pub const SLED_STORE_PATH: &str = "./data/anomalies";

/// Default listing window (hours).
pub const ANOMALY_WINDOW_HOURS: u32 = 24;

/// Default listing limit (records).
pub const ANOMALY_LIST_LIMIT: usize = 50;
