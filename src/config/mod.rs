//! City Configuration Module
//!
//! Deployment configuration loaded from TOML: server address, ML service
//! endpoint, simulator pacing, history capacities, store backend and the
//! sensor node registry.
//!
//! ## Loading Order
//!
//! 1. `CITYPULSE_CONFIG` environment variable (path to TOML file)
//! 2. `citypulse.toml` in the current working directory
//! 3. Built-in defaults
//!
//! Unknown keys and implausible values are logged as warnings on load
//! (see [`validation`]); hard errors come from `CityConfig::validate`.
//!
//! ## Usage
//!
//! Load once at startup and pass the value to whatever needs it:
//!
//! ```ignore
//! let config = CityConfig::load();
//! let state = AppState::new(config.history.capacities());
//! ```

mod city_config;
pub mod defaults;
pub mod validation;

pub use city_config::*;
