//! REST API module using Axum
//!
//! JSON endpoints consumed by the CityPulse dashboard. Every response uses
//! the `{data, meta}` / `{error, meta}` envelope from [`envelope`].

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::DashboardState;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Comma-separated allowed origins; overrides `server.cors_origins`.
pub const CORS_ENV_VAR: &str = "CITYPULSE_CORS_ORIGINS";

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Origins come from `CITYPULSE_CORS_ORIGINS` when set, otherwise from the
/// config file.
fn build_cors_layer(configured: &[String]) -> CorsLayer {
    let origins: Vec<String> = match std::env::var(CORS_ENV_VAR) {
        Ok(raw) => raw.split(',').map(|o| o.trim().to_string()).collect(),
        Err(_) => configured.to_vec(),
    };
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter(|o| !o.is_empty())
        .filter_map(|o| o.parse().ok())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed.is_empty() {
        layer
    } else {
        tracing::info!(origins = ?origins, "CORS: allowing configured origins");
        layer.allow_origin(allowed)
    }
}

/// Create the complete application router.
pub fn create_app(state: DashboardState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors_origins);

    Router::new()
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(routes::health_routes(state))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
