//! Request and response models for the HTTP API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Token models
// =============================================================================

/// Body of `POST /token/`.
///
/// Fields are optional at the serde level so that missing values surface as
/// a validation error rather than a JSON decoding error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub identity: Option<String>,

    #[serde(default)]
    pub room_name: Option<String>,

    /// `"host"` or `"audience"`; defaults to audience.
    #[serde(default)]
    pub role: Option<String>,
}

/// Media server connection details echoed with every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub ws_url: String,
    pub http_url: String,
    pub rtc_port: u16,
    pub udp_range: String,
}

/// Response of `POST /token/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub identity: String,
    pub room_name: String,
    pub role: String,
    /// WebSocket URL the client should connect to.
    pub server_url: String,
    pub server_config: ServerConfig,
    /// Token lifetime in seconds.
    pub expires_in: i64,
}

// =============================================================================
// Media server listings
// =============================================================================

/// Outcome of a gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Success,
    Error,
}

/// Response of `GET /rooms/`.
///
/// Room objects are passed through from the media server unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomListing {
    pub rooms: Vec<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    pub status: ListingStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response of `GET /rooms/{room}/participants/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantListing {
    pub participants: Vec<serde_json::Value>,

    pub room_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    pub status: ListingStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// Connection test
// =============================================================================

/// Reachability of one media server endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointCheck {
    /// `"connected"` or `"failed"`.
    pub status: String,

    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status of this backend itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendStatus {
    pub status: String,
    pub message: String,
    /// Unix epoch seconds.
    pub timestamp: i64,
}

/// Non-secret media configuration echoed by the connection test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfigSummary {
    pub api_key: String,
    pub ws_url: String,
    pub http_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_url: Option<String>,

    pub rtc_port: u16,
    pub udp_range: String,
}

/// Response of `GET /test-connection/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestReport {
    pub backend: BackendStatus,
    /// Keyed by `"primary"` / `"fallback"`.
    pub media_tests: BTreeMap<String, EndpointCheck>,
    pub config: MediaConfigSummary,
}

// =============================================================================
// Health models
// =============================================================================

/// Status of a single health probe or of the service overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Unhealthy,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
        }
    }
}

/// Result of one dependency probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,

    /// Probe round-trip time, e.g. `"1.23ms"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_space_percent: Option<f64>,
}

/// Response of `GET /health/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    /// Unix epoch seconds at which the report was built.
    pub timestamp: i64,
    pub services: BTreeMap<String, ServiceHealth>,
    pub version: String,
    pub environment: String,
    /// Total time spent building the report, e.g. `"4.56ms"`.
    pub response_time: String,
}
