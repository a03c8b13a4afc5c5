//! Config Validation Tests
//!
//! Exercise the config layer on its own: TOML parsing, hard validation
//! errors, typo detection and plausibility warnings.

use citypulse::config::validation::{check_plausibility, suggest_correction, known_config_keys, validate_unknown_keys};
use citypulse::config::{CityConfig, ConfigError, StoreBackend};
use std::io::Write;

fn validation_errors(config: &CityConfig) -> Vec<String> {
    match config.validate() {
        Err(ConfigError::Validation(errors)) => errors,
        Err(other) => panic!("unexpected error: {other}"),
        Ok(()) => Vec::new(),
    }
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn defaults_validate() {
    let config = CityConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.city.name, "Mohali");
    assert_eq!(config.city.utc_offset_minutes, 330);
    assert_eq!(config.nodes.len(), 5);
}

#[test]
fn full_toml_parses() {
    let config = CityConfig::from_toml_str(
        r#"
[city]
name = "Chandigarh"
utc_offset_minutes = 330

[server]
addr = "127.0.0.1:9000"
cors_origins = ["http://localhost:5173"]

[ml]
base_url = "http://localhost:8000"
timeout_ms = 1500

[simulator]
enabled = false
anomaly_rate = 0.1
seed = 7

[history]
activity_capacity = 100

[store]
backend = "sled"
path = "/tmp/citypulse-test"

[[nodes]]
id = "CH-01"
name = "Sector 17 Plaza"
sector = "Sector 17"
zone = "commercial"
base_noise = 62.0
base_temp = 27.0
base_aqi = 90.0
base_crowd = 20.0
"#,
    )
    .unwrap();

    assert_eq!(config.city.name, "Chandigarh");
    assert_eq!(config.server.addr, "127.0.0.1:9000");
    assert_eq!(config.ml.base_url.as_deref(), Some("http://localhost:8000"));
    assert_eq!(config.ml.timeout().as_millis(), 1500);
    assert!(!config.simulator.enabled);
    assert_eq!(config.simulator.seed, Some(7));
    assert_eq!(config.history.activity_capacity, 100);
    // unset keys keep their defaults
    assert_eq!(config.history.node_history_capacity, 20);
    assert_eq!(config.store.backend, StoreBackend::Sled);
    assert_eq!(config.nodes.len(), 1);
    assert!(config.node("CH-01").is_some());
    assert!(config.node("CP-MOH-01").is_none());
}

#[test]
fn to_toml_round_trips_through_parser() {
    let mut config = CityConfig::default();
    config.simulator.seed = Some(42);
    let text = config.to_toml().unwrap();
    let parsed = CityConfig::from_toml_str(&text).unwrap();
    assert_eq!(parsed.simulator.seed, Some(42));
    assert_eq!(parsed.nodes, config.nodes);
}

#[test]
fn load_from_file_reads_and_validates() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[simulator]\ninterval_secs = 0").unwrap();
    let err = CityConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));

    let err = CityConfig::load_from_file(std::path::Path::new("/nonexistent/citypulse.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn malformed_toml_is_parse_error() {
    let err = CityConfig::from_toml_str("[server\naddr = 1").unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn store_backend_from_str() {
    assert_eq!("SLED".parse::<StoreBackend>().unwrap(), StoreBackend::Sled);
    assert_eq!("mock".parse::<StoreBackend>().unwrap(), StoreBackend::Mock);
    assert!("postgres".parse::<StoreBackend>().is_err());
}

// ============================================================================
// Hard Validation Errors
// ============================================================================

#[test]
fn zero_capacities_rejected() {
    let mut config = CityConfig::default();
    config.history.activity_capacity = 0;
    config.history.node_history_capacity = 0;
    config.store.mock_capacity = 0;
    let errors = validation_errors(&config);
    assert_eq!(errors.len(), 3, "{errors:?}");
    assert!(errors.iter().any(|e| e.contains("history.activity_capacity")));
    assert!(errors.iter().any(|e| e.contains("store.mock_capacity")));
}

#[test]
fn zero_timeout_rejected() {
    let mut config = CityConfig::default();
    config.ml.timeout_ms = 0;
    let errors = validation_errors(&config);
    assert!(errors.iter().any(|e| e.contains("ml.timeout_ms")));
}

#[test]
fn non_http_url_rejected() {
    let mut config = CityConfig::default();
    config.ml.base_url = Some("ftp://models.local".to_string());
    let errors = validation_errors(&config);
    assert!(errors.iter().any(|e| e.contains("ml.base_url")));
}

#[test]
fn anomaly_rate_out_of_range_rejected() {
    let mut config = CityConfig::default();
    config.simulator.anomaly_rate = 1.5;
    assert!(validation_errors(&config).iter().any(|e| e.contains("anomaly_rate")));
}

#[test]
fn utc_offset_out_of_range_rejected() {
    let mut config = CityConfig::default();
    config.city.utc_offset_minutes = 900;
    assert!(validation_errors(&config).iter().any(|e| e.contains("utc_offset_minutes")));
}

#[test]
fn duplicate_and_empty_node_ids_rejected() {
    let mut config = CityConfig::default();
    config.nodes[1].id = config.nodes[0].id.clone();
    config.nodes[2].id = "  ".to_string();
    let errors = validation_errors(&config);
    assert!(errors.iter().any(|e| e.contains("duplicate node id CP-MOH-01")));
    assert!(errors.iter().any(|e| e.contains("must not be empty")));
}

#[test]
fn all_errors_reported_together() {
    let mut config = CityConfig::default();
    config.ml.timeout_ms = 0;
    config.simulator.interval_secs = 0;
    config.simulator.backfill_interval_minutes = 0;
    assert_eq!(validation_errors(&config).len(), 3);
}

// ============================================================================
// Warnings
// ============================================================================

#[test]
fn typo_in_section_key_suggests_fix() {
    let warnings = validate_unknown_keys("[ml]\ntimeout_sm = 500\n");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("ml.timeout_ms"));
}

#[test]
fn unknown_section_warns_without_failing_load() {
    let toml = "[metrics]\nenabled = true\n";
    let warnings = validate_unknown_keys(toml);
    assert!(warnings.iter().any(|w| w.field == "metrics"));
    assert!(CityConfig::from_toml_str(toml).is_ok());
}

#[test]
fn every_known_section_has_a_key() {
    let known = known_config_keys();
    for section in ["city", "server", "ml", "simulator", "history", "store", "nodes"] {
        assert!(known.contains(section), "missing {section}");
    }
    assert_eq!(
        suggest_correction("store.backnd", &known).as_deref(),
        Some("store.backend")
    );
}

#[test]
fn plausibility_flags_odd_node_baseline() {
    let mut config = CityConfig::default();
    config.nodes[4].base_aqi = 900.0;
    let warnings = check_plausibility(&config);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("CP-MOH-05"));
}
