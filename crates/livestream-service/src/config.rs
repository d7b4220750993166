//! Livestream service configuration.
//!
//! Configuration is loaded from environment variables once at startup and
//! injected into handlers through `AppState`. There are no built-in secrets:
//! the media server API secret and the service signing secret must be
//! supplied. All sensitive fields are redacted in Debug output.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Default media server WebSocket URL handed to clients.
pub const DEFAULT_MEDIA_WS_URL: &str = "ws://localhost:7880";

/// Default media server HTTP URL used for admin API calls.
pub const DEFAULT_MEDIA_HTTP_URL: &str = "http://localhost:7880";

/// Default per-attempt timeout for media server admin calls.
pub const DEFAULT_MEDIA_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Lower bound for `MEDIA_REQUEST_TIMEOUT_SECONDS`.
pub const MIN_MEDIA_REQUEST_TIMEOUT_SECONDS: u64 = 5;

/// Upper bound for `MEDIA_REQUEST_TIMEOUT_SECONDS`. Primary and fallback run
/// back to back, so twice this must stay under the router request timeout.
pub const MAX_MEDIA_REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Default media server RTC (TCP) port advertised to clients.
pub const DEFAULT_MEDIA_RTC_PORT: u16 = 7881;

/// Default media server UDP port range advertised to clients.
pub const DEFAULT_MEDIA_UDP_RANGE: &str = "50000-60000";

/// Default access token lifetime (24 hours).
pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Upper bound for `ACCESS_TOKEN_TTL_SECONDS` (7 days).
pub const MAX_ACCESS_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Default path inspected by the disk free-space probe.
pub const DEFAULT_DISK_CHECK_PATH: &str = "/";

/// Default deployment environment name.
pub const DEFAULT_ENVIRONMENT: &str = "production";

/// Livestream service configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Redis connection URL.
    pub redis_url: String,

    /// Server bind address (default: "0.0.0.0:8000").
    pub bind_address: String,

    /// Media server API key, used as the `iss` claim of access tokens.
    pub media_api_key: String,

    /// Media server API secret (HS256 key shared with the media server).
    pub media_api_secret: SecretString,

    /// WebSocket URL clients connect to.
    pub media_ws_url: String,

    /// Primary HTTP base URL for the media server admin API.
    pub media_http_url: String,

    /// Optional fallback HTTP base URL, tried after the primary fails.
    pub media_fallback_url: Option<String>,

    /// Per-attempt timeout for admin API calls, in seconds.
    pub media_request_timeout_seconds: u64,

    /// RTC port advertised in token responses.
    pub media_rtc_port: u16,

    /// UDP port range advertised in token responses.
    pub media_udp_range: String,

    /// Access token lifetime in seconds.
    pub access_token_ttl_seconds: i64,

    /// Secret used to verify (and mint) service-to-service tokens.
    pub service_secret_key: SecretString,

    /// Whether admin routes require an accepted service token.
    pub require_service_auth: bool,

    /// JWT clock skew tolerance in seconds for `iat` validation.
    pub jwt_clock_skew_seconds: i64,

    /// Filesystem path inspected by the disk probe.
    pub disk_check_path: String,

    /// Deployment environment name reported by the health endpoint.
    pub environment: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("media_api_key", &self.media_api_key)
            .field("media_api_secret", &self.media_api_secret)
            .field("media_ws_url", &self.media_ws_url)
            .field("media_http_url", &self.media_http_url)
            .field("media_fallback_url", &self.media_fallback_url)
            .field(
                "media_request_timeout_seconds",
                &self.media_request_timeout_seconds,
            )
            .field("media_rtc_port", &self.media_rtc_port)
            .field("media_udp_range", &self.media_udp_range)
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("service_secret_key", &self.service_secret_key)
            .field("require_service_auth", &self.require_service_auth)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("disk_check_path", &self.disk_check_path)
            .field("environment", &self.environment)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Environment variable must not be empty: {0}")]
    EmptySecret(String),

    #[error("Invalid media request timeout configuration: {0}")]
    InvalidMediaTimeout(String),

    #[error("Invalid access token TTL configuration: {0}")]
    InvalidTokenTtl(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid media RTC port configuration: {0}")]
    InvalidRtcPort(String),

    #[error("Invalid boolean configuration: {0}")]
    InvalidBool(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = required(vars, "DATABASE_URL")?;
        let redis_url = required(vars, "REDIS_URL")?;
        let media_api_key = required(vars, "MEDIA_API_KEY")?;
        let media_api_secret = required_secret(vars, "MEDIA_API_SECRET")?;
        let service_secret_key = required_secret(vars, "SERVICE_SECRET_KEY")?;

        let bind_address = optional(vars, "BIND_ADDRESS", DEFAULT_BIND_ADDRESS);
        let media_ws_url = optional(vars, "MEDIA_WS_URL", DEFAULT_MEDIA_WS_URL);
        let media_http_url = optional(vars, "MEDIA_HTTP_URL", DEFAULT_MEDIA_HTTP_URL);
        let media_udp_range = optional(vars, "MEDIA_UDP_RANGE", DEFAULT_MEDIA_UDP_RANGE);
        let disk_check_path = optional(vars, "DISK_CHECK_PATH", DEFAULT_DISK_CHECK_PATH);
        let environment = optional(vars, "ENVIRONMENT", DEFAULT_ENVIRONMENT);

        let media_fallback_url = vars
            .get("MEDIA_FALLBACK_URL")
            .filter(|v| !v.trim().is_empty())
            .cloned();

        let media_request_timeout_seconds =
            if let Some(value_str) = vars.get("MEDIA_REQUEST_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidMediaTimeout(format!(
                        "MEDIA_REQUEST_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if !(MIN_MEDIA_REQUEST_TIMEOUT_SECONDS..=MAX_MEDIA_REQUEST_TIMEOUT_SECONDS)
                    .contains(&value)
                {
                    return Err(ConfigError::InvalidMediaTimeout(format!(
                        "MEDIA_REQUEST_TIMEOUT_SECONDS must be between {} and {}, got {}",
                        MIN_MEDIA_REQUEST_TIMEOUT_SECONDS, MAX_MEDIA_REQUEST_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_MEDIA_REQUEST_TIMEOUT_SECONDS
            };

        let media_rtc_port = if let Some(value_str) = vars.get("MEDIA_RTC_PORT") {
            let value: u16 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRtcPort(format!(
                    "MEDIA_RTC_PORT must be a valid port number, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidRtcPort(
                    "MEDIA_RTC_PORT must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_MEDIA_RTC_PORT
        };

        let access_token_ttl_seconds = if let Some(value_str) = vars.get("ACCESS_TOKEN_TTL_SECONDS")
        {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidTokenTtl(format!(
                    "ACCESS_TOKEN_TTL_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidTokenTtl(format!(
                    "ACCESS_TOKEN_TTL_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_ACCESS_TOKEN_TTL_SECONDS {
                return Err(ConfigError::InvalidTokenTtl(format!(
                    "ACCESS_TOKEN_TTL_SECONDS must not exceed {} seconds, got {}",
                    MAX_ACCESS_TOKEN_TTL_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_ACCESS_TOKEN_TTL_SECONDS
        };

        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        let require_service_auth = match vars.get("REQUIRE_SERVICE_AUTH") {
            None => false,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => {
                    return Err(ConfigError::InvalidBool(format!(
                        "REQUIRE_SERVICE_AUTH must be true or false, got '{}'",
                        other
                    )))
                }
            },
        };

        Ok(Config {
            database_url,
            redis_url,
            bind_address,
            media_api_key,
            media_api_secret,
            media_ws_url,
            media_http_url,
            media_fallback_url,
            media_request_timeout_seconds,
            media_rtc_port,
            media_udp_range,
            access_token_ttl_seconds,
            service_secret_key,
            require_service_auth,
            jwt_clock_skew_seconds,
            disk_check_path,
            environment,
        })
    }

    /// Media server admin endpoints in the order they are attempted.
    pub fn media_endpoints(&self) -> Vec<String> {
        let mut endpoints = vec![self.media_http_url.clone()];
        if let Some(fallback) = &self.media_fallback_url {
            if fallback != &self.media_http_url {
                endpoints.push(fallback.clone());
            }
        }
        endpoints
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn required_secret(vars: &HashMap<String, String>, name: &str) -> Result<SecretString, ConfigError> {
    let secret = SecretString::from(required(vars, name)?);
    if secret.expose_secret().is_empty() {
        return Err(ConfigError::EmptySecret(name.to_string()));
    }
    Ok(secret)
}

fn optional(vars: &HashMap<String, String>, name: &str, default: &str) -> String {
    vars.get(name)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}
