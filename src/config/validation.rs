//! Config validation: unknown-key detection with Levenshtein suggestions
//! and plausibility checks on legal-but-odd values.
//!
//! Two-pass parse: the raw TOML is first read into `toml::Value`, its key
//! tree walked and compared against the known field names, then serde
//! deserializes as usual. Warnings never fail a load; hard errors live in
//! [`super::CityConfig::validate`].

use serde::Serialize;
use std::collections::HashSet;

use super::CityConfig;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path for `CityConfig`.
///
/// Entries of the `[[nodes]]` array are checked under the `nodes.` prefix.
/// Kept in step with the structs in `city_config.rs` by hand.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [city]
        "city",
        "city.name",
        "city.utc_offset_minutes",
        // [server]
        "server",
        "server.addr",
        "server.cors_origins",
        // [ml]
        "ml",
        "ml.base_url",
        "ml.timeout_ms",
        // [simulator]
        "simulator",
        "simulator.enabled",
        "simulator.interval_secs",
        "simulator.anomaly_rate",
        "simulator.seed",
        "simulator.backfill_hours",
        "simulator.backfill_interval_minutes",
        // [history]
        "history",
        "history.activity_capacity",
        "history.node_activity_capacity",
        "history.node_history_capacity",
        // [store]
        "store",
        "store.backend",
        "store.path",
        "store.mock_capacity",
        // [[nodes]]
        "nodes",
        "nodes.id",
        "nodes.name",
        "nodes.sector",
        "nodes.zone",
        "nodes.base_noise",
        "nodes.base_temp",
        "nodes.base_aqi",
        "nodes.base_crowd",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively collect the dotted key paths of a `toml::Value` tree.
///
/// `{ a = { b = 1 } }` yields `["a", "a.b"]`. Tables inside arrays are
/// walked under the array's own path, so `[[nodes]] id = "x"` yields
/// `["nodes", "nodes.id"]`. Duplicates are removed, first occurrence kept.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    collect_keys(value, prefix, &mut keys);
    let mut seen = HashSet::new();
    keys.retain(|k| seen.insert(k.clone()));
    keys
}

fn collect_keys(value: &toml::Value, prefix: &str, out: &mut Vec<String>) {
    match value {
        toml::Value::Table(table) => {
            for (k, v) in table {
                let path = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                out.push(path.clone());
                collect_keys(v, &path, out);
            }
        }
        toml::Value::Array(items) if !prefix.is_empty() => {
            for item in items.iter().filter(|v| v.is_table()) {
                collect_keys(item, prefix, out);
            }
        }
        _ => {}
    }
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Closest known key within edit distance 3. Ties go to the alphabetically
/// first key.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return a warning for every unknown key.
///
/// A string that does not parse yields no warnings; serde reports it later.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Plausibility Checks
// ============================================================================

/// Anomaly rates above this flood the feed
const SUSPICIOUS_ANOMALY_RATE: f64 = 0.5;
/// ML timeouts above this stall ingest noticeably (ms)
const SUSPICIOUS_ML_TIMEOUT_MS: u64 = 30_000;

/// Values that pass [`CityConfig::validate`] but are probably mistakes.
pub fn check_plausibility(config: &CityConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut warn = |field: String, message: String| {
        warnings.push(ValidationWarning {
            field,
            message,
            suggestion: None,
        });
    };

    if config.simulator.anomaly_rate > SUSPICIOUS_ANOMALY_RATE {
        warn(
            "simulator.anomaly_rate".to_string(),
            format!(
                "simulator.anomaly_rate = {} will flag most simulated readings",
                config.simulator.anomaly_rate
            ),
        );
    }
    if config.ml.timeout_ms > SUSPICIOUS_ML_TIMEOUT_MS {
        warn(
            "ml.timeout_ms".to_string(),
            format!("ml.timeout_ms = {} exceeds {SUSPICIOUS_ML_TIMEOUT_MS} ms", config.ml.timeout_ms),
        );
    }

    for node in &config.nodes {
        for (name, value, lo, hi) in [
            ("base_noise", node.base_noise, 20.0, 130.0),
            ("base_temp", node.base_temp, -30.0, 55.0),
            ("base_aqi", node.base_aqi, 0.0, 500.0),
            ("base_crowd", node.base_crowd, 0.0, 200.0),
        ] {
            if !(lo..=hi).contains(&value) {
                warn(
                    format!("nodes.{name}"),
                    format!("node {}: {name} = {value} is outside typical range ({lo}-{hi})", node.id),
                );
            }
        }
    }

    warnings
}

// ============================================================================
// Tests
// ============================================================================
