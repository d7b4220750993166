//! HTTP routes for the livestream service.
//!
//! Defines the Axum router and application state.

use crate::auth::{AccessTokenIssuer, ServiceTokenVerifier};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, service_auth, ServiceAuthState};
use crate::services::{HealthReporter, MediaServerClient};
use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Whole-request timeout applied by the router, in seconds.
pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Access token issuer (media API key and secret).
    pub issuer: AccessTokenIssuer,

    /// Service token verifier (service secret).
    pub verifier: ServiceTokenVerifier,

    /// Media server admin API client.
    pub media: MediaServerClient,

    /// Dependency health reporter.
    pub health: HealthReporter,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/`, `/health/` - JSON health report
/// - `/health/simple/`, `/ready/`, `/live/` - plain-text probes
/// - `/metrics` - Prometheus metrics
/// - `/token/` - access token issuance (service token optional)
/// - `/rooms/`, `/rooms/:room/participants/`, `/test-connection/` - media
///   admin queries (service token required when `REQUIRE_SERVICE_AUTH` is set)
/// - the API routes again under `/v1/livestream/`
/// - CORS, TraceLayer, HTTP metrics, and a 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let token_auth = Arc::new(ServiceAuthState {
        verifier: state.verifier.clone(),
        required: false,
    });
    let admin_auth = Arc::new(ServiceAuthState {
        verifier: state.verifier.clone(),
        required: state.config.require_service_auth,
    });

    let health_routes = Router::new()
        .route("/", get(handlers::health_report))
        .route("/health/", get(handlers::health_report))
        .route("/health/simple/", get(handlers::simple_health_check))
        .route("/ready/", get(handlers::readiness_check))
        .route("/live/", get(handlers::liveness_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let token_routes = Router::new()
        .route("/token/", post(handlers::issue_token))
        .route("/v1/livestream/generate-token/", post(handlers::issue_token))
        .route_layer(middleware::from_fn_with_state(token_auth, service_auth))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/rooms/", get(handlers::list_rooms))
        .route(
            "/rooms/:room/participants/",
            get(handlers::list_participants),
        )
        .route("/test-connection/", get(handlers::test_connection))
        .route("/v1/livestream/rooms/", get(handlers::list_rooms))
        .route(
            "/v1/livestream/rooms/:room/participants/",
            get(handlers::list_participants),
        )
        .route(
            "/v1/livestream/test-connection/",
            get(handlers::test_connection),
        )
        .route_layer(middleware::from_fn_with_state(admin_auth, service_auth))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. CorsLayer - answers preflight before routing
    // 4. http_metrics_middleware (outermost)
    health_routes
        .merge(metrics_routes)
        .merge(token_routes)
        .merge(admin_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECONDS)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_config_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Config>();
    }
}
