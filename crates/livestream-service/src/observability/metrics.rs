//! Metric definitions for the livestream service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ls_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods only
//! - `endpoint`: known route templates, everything else is `/other`
//! - `role`: `host`, `audience`
//! - `outcome`: `accepted`, `rejected`, `not_applicable`
//! - `endpoint` (media): `primary`, `fallback`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used to render
/// `/metrics`.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("ls_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Media calls can legitimately take up to the configured timeout
        .set_buckets_for_metric(
            Matcher::Prefix("ls_media_request".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set media request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `ls_http_requests_total`, `ls_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("ls_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ls_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize a request path to a bounded route template.
///
/// Room names are caller-controlled, so participant paths collapse to
/// `{room}`.
pub(crate) fn normalize_endpoint(path: &str) -> String {
    match path {
        "/" | "/health/" | "/health/simple/" | "/ready/" | "/live/" | "/metrics" | "/token/"
        | "/rooms/" | "/test-connection/" | "/v1/livestream/generate-token/"
        | "/v1/livestream/rooms/" | "/v1/livestream/test-connection/" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

fn normalize_dynamic_endpoint(path: &str) -> String {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match segments.as_slice() {
        ["rooms", _, "participants"] => "/rooms/{room}/participants/".to_string(),
        ["v1", "livestream", "rooms", _, "participants"] => {
            "/v1/livestream/rooms/{room}/participants/".to_string()
        }
        _ => "/other".to_string(),
    }
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record an issued access token.
///
/// Metric: `ls_tokens_issued_total`
/// Labels: `role`
pub fn record_token_issued(role: &str) {
    counter!("ls_tokens_issued_total", "role" => role.to_string()).increment(1);
}

/// Record a service token verification outcome.
///
/// Metric: `ls_service_auth_total`
/// Labels: `outcome`
pub fn record_service_auth(outcome: &str) {
    counter!("ls_service_auth_total", "outcome" => outcome.to_string()).increment(1);
}

// ============================================================================
// Media Server Metrics
// ============================================================================

/// Record one attempt against a media server endpoint.
///
/// Metric: `ls_media_requests_total`, `ls_media_request_duration_seconds`
/// Labels: `operation`, `endpoint`, `status`
///
/// Operations: "list_rooms", "list_participants", "test_connection"
/// Endpoint: "primary", "fallback"
/// Status: "success", "error"
pub fn record_media_request(operation: &str, endpoint: &str, status: &str, duration: Duration) {
    histogram!("ls_media_request_duration_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("ls_media_requests_total",
        "operation" => operation.to_string(),
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Health Metrics
// ============================================================================

/// Record a health report.
///
/// Metric: `ls_health_checks_total`
/// Labels: `status`
pub fn record_health_check(status: &str) {
    counter!("ls_health_checks_total", "status" => status.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(400), "error");
        assert_eq!(categorize_status_code(503), "error");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
    }

    #[test]
    fn test_normalize_static_endpoints() {
        assert_eq!(normalize_endpoint("/"), "/");
        assert_eq!(normalize_endpoint("/health/"), "/health/");
        assert_eq!(normalize_endpoint("/token/"), "/token/");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(
            normalize_endpoint("/v1/livestream/generate-token/"),
            "/v1/livestream/generate-token/"
        );
    }

    #[test]
    fn test_normalize_participant_paths() {
        assert_eq!(
            normalize_endpoint("/rooms/my-stream/participants/"),
            "/rooms/{room}/participants/"
        );
        assert_eq!(
            normalize_endpoint("/v1/livestream/rooms/abc/participants/"),
            "/v1/livestream/rooms/{room}/participants/"
        );
    }

    #[test]
    fn test_normalize_unknown_paths() {
        assert_eq!(normalize_endpoint("/admin"), "/other");
        assert_eq!(normalize_endpoint("/rooms/a/b/c/"), "/other");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_http_request("GET", "/health/", 200, Duration::from_millis(3));
        record_token_issued("host");
        record_service_auth("accepted");
        record_media_request("list_rooms", "primary", "error", Duration::from_millis(10));
        record_health_check("healthy");
    }
}
