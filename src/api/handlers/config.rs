//! Config inspection endpoints

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use super::{json_rejected, DashboardState};
use crate::api::envelope::ApiResponse;
use crate::config::validation::{check_plausibility, ValidationWarning};
use crate::config::{CityConfig, ConfigError};

/// GET /api/v1/config - the active configuration
pub async fn get_config(State(state): State<DashboardState>) -> Response {
    ApiResponse::ok(&*state.config)
}

/// Result of a dry-run validation.
#[derive(Debug, Serialize)]
pub struct ConfigCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ValidationWarning>,
}

/// POST /api/v1/config/validate
///
/// Checks a candidate config (JSON, missing sections take defaults) without
/// applying it. Changes take effect only on restart.
pub async fn validate_config(body: Result<Json<CityConfig>, JsonRejection>) -> Response {
    let Json(candidate) = match body {
        Ok(body) => body,
        Err(rejection) => return json_rejected(rejection),
    };

    let errors = match candidate.validate() {
        Ok(()) => Vec::new(),
        Err(ConfigError::Validation(errors)) => errors,
        Err(other) => vec![other.to_string()],
    };
    ApiResponse::ok(ConfigCheck {
        valid: errors.is_empty(),
        errors,
        warnings: check_plausibility(&candidate),
    })
}
