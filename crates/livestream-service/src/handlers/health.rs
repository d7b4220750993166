//! Health check handlers.
//!
//! - `/` and `/health/`: full JSON health report (200, or 503 when unhealthy)
//! - `/health/simple/`: plain "OK" for load balancers
//! - `/ready/`: readiness probe, checks the database only
//! - `/live/`: liveness probe, checks nothing

use crate::models::{HealthReport, HealthStatus};
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Full health report.
///
/// `healthy` and `warning` both return 200 so a cache outage does not pull the
/// pod from rotation; only `unhealthy` returns 503.
#[tracing::instrument(skip_all, name = "ls.handlers.health")]
pub async fn health_report(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthReport>) {
    let report = state.health.report().await;

    let status = match report.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (status, Json(report))
}

/// Simple health probe.
pub async fn simple_health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Error text is generic; the actual database error is logged.
#[tracing::instrument(skip_all, name = "ls.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.health.readiness().await {
        Ok(()) => (StatusCode::OK, "READY".to_string()),
        Err(e) => {
            tracing::warn!(target: "ls.health", error = %e, "Readiness check failed: database error");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "NOT READY - database unavailable".to_string(),
            )
        }
    }
}

/// Liveness probe handler.
///
/// Does not check any dependencies; failure means the process is hung.
pub async fn liveness_check() -> &'static str {
    "ALIVE"
}
