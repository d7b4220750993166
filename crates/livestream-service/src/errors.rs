//! Livestream service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Validation
//! messages are returned to the caller verbatim; everything else returns a
//! generic message and the detail is logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::jwt::JwtSigningError;
use serde::Serialize;
use thiserror::Error;

/// Livestream service error type.
///
/// Maps to HTTP status codes:
/// - Validation: 400 Bad Request
/// - Authentication: 401 Unauthorized
/// - Forbidden: 403 Forbidden
/// - NotFound: 404 Not Found
/// - Signing, Internal: 500 Internal Server Error
/// - UpstreamUnavailable: 503 Service Unavailable
#[derive(Debug, Error)]
pub enum LsError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl LsError {
    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            LsError::Validation(_) => 400,
            LsError::Authentication(_) => 401,
            LsError::Forbidden(_) => 403,
            LsError::NotFound(_) => 404,
            LsError::Signing(_) | LsError::Internal => 500,
            LsError::UpstreamUnavailable(_) => 503,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            LsError::Validation(_) => "VALIDATION_ERROR",
            LsError::Authentication(_) => "AUTHENTICATION_FAILED",
            LsError::Forbidden(_) => "FORBIDDEN",
            LsError::NotFound(_) => "NOT_FOUND",
            LsError::Signing(_) => "SIGNING_ERROR",
            LsError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            LsError::Internal => "INTERNAL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for LsError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = match &self {
            LsError::Validation(reason)
            | LsError::Authentication(reason)
            | LsError::Forbidden(reason)
            | LsError::NotFound(reason) => reason.clone(),
            LsError::Signing(err) => {
                tracing::error!(target: "ls.auth", error = %err, "Access token signing failed");
                "Failed to generate token".to_string()
            }
            LsError::UpstreamUnavailable(reason) => {
                tracing::warn!(target: "ls.availability", reason = %reason, "Upstream unavailable");
                "Media server temporarily unavailable".to_string()
            }
            LsError::Internal => "An internal error occurred".to_string(),
        };

        let body = ErrorResponse {
            error: message,
            code: self.code(),
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Service realm=\"livestream\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

impl From<JwtSigningError> for LsError {
    fn from(err: JwtSigningError) -> Self {
        LsError::Signing(err.to_string())
    }
}
