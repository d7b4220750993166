//! HS256 JWT utilities shared across livestream services.
//!
//! Both token families used by the service are symmetric HMAC-SHA256 JWTs:
//! - media-server access tokens, signed with the media server's API secret
//! - service-to-service tokens, signed with the service secret
//!
//! This module provides the signing and validation primitives they share:
//! - Size limit checked before any parsing
//! - Clock skew constants for `iat` validation
//! - Signature/expiry verification pinned to `HS256`
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{sign_hs256, verify_hs256, validate_iat, DEFAULT_CLOCK_SKEW};
//!
//! let token = sign_hs256(&claims, &secret)?;
//! let decoded: MyClaims = verify_hs256(&token, &secret)?;
//! validate_iat(decoded.iat, DEFAULT_CLOCK_SKEW)?;
//! ```

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected before base64 decoding or HMAC
/// computation. Access tokens issued by this service are ~400 bytes.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default JWT clock skew tolerance (5 minutes).
///
/// Tokens with `iat` more than this amount in the future are rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while validating a JWT.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds `MAX_JWT_SIZE_BYTES`.
    #[error("token exceeds maximum size")]
    TokenTooLarge,

    /// Token is not a well-formed HS256 JWT (structure, encoding, claims or algorithm).
    #[error("token is malformed")]
    MalformedToken,

    /// HMAC signature does not match the shared secret.
    #[error("token signature is invalid")]
    InvalidSignature,

    /// Token `exp` is in the past.
    #[error("token has expired")]
    Expired,

    /// Token `iat` claim is too far in the future.
    #[error("token issued in the future")]
    IatTooFarInFuture,
}

/// Errors that can occur while signing a JWT.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtSigningError {
    /// The configured signing secret is empty.
    #[error("signing secret is empty")]
    EmptySecret,

    /// The claims could not be serialized or signed.
    #[error("JWT encoding failed: {0}")]
    Encoding(String),
}

// =============================================================================
// Functions
// =============================================================================

/// Sign claims as an HS256 JWT with the given shared secret.
///
/// The header carries `alg: HS256` and `typ: JWT`, which is what the media
/// server expects for API-key/secret access tokens.
///
/// # Errors
///
/// - `EmptySecret` - the secret is an empty string
/// - `Encoding` - claim serialization or HMAC computation failed
pub fn sign_hs256<T: Serialize>(claims: &T, secret: &SecretString) -> Result<String, JwtSigningError> {
    let secret_bytes = secret.expose_secret().as_bytes();
    if secret_bytes.is_empty() {
        return Err(JwtSigningError::EmptySecret);
    }

    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".to_string());

    encode(&header, claims, &EncodingKey::from_secret(secret_bytes))
        .map_err(|e| JwtSigningError::Encoding(e.to_string()))
}

/// Verify an HS256 JWT and return its claims.
///
/// Validates:
/// - Token size (must be <= `MAX_JWT_SIZE_BYTES`), before any parsing
/// - Algorithm (only `HS256` is accepted)
/// - Signature against `secret`
/// - Expiration (`exp` required, no leeway)
///
/// The `iat` claim is not inspected here; callers use [`validate_iat`].
///
/// # Errors
///
/// Returns a [`JwtValidationError`] describing the first failed check.
pub fn verify_hs256<T: DeserializeOwned>(
    token: &str,
    secret: &SecretString,
) -> Result<T, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.validate_aud = false;
    validation.leeway = 0;

    let decoding_key = DecodingKey::from_secret(secret.expose_secret().as_bytes());

    decode::<T>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Token verification failed");
            match e.kind() {
                ErrorKind::InvalidSignature => JwtValidationError::InvalidSignature,
                ErrorKind::ExpiredSignature => JwtValidationError::Expired,
                _ => JwtValidationError::MalformedToken,
            }
        })
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if the iat timestamp is more than
/// `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // clock_skew is bounded to MAX_CLOCK_SKEW by configuration
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestClaims {
        sub: String,
        iat: i64,
        exp: i64,
    }

    fn secret() -> SecretString {
        SecretString::from("unit-test-shared-secret")
    }

    fn fresh_claims() -> TestClaims {
        let now = chrono::Utc::now().timestamp();
        TestClaims {
            sub: "alice".to_string(),
            iat: now,
            exp: now + 3600,
        }
    }

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_clock_skew_constants() {
        assert_eq!(DEFAULT_CLOCK_SKEW.as_secs(), 300);
        assert_eq!(MAX_CLOCK_SKEW.as_secs(), 600);
    }

    #[test]
    fn test_sign_then_verify_returns_same_claims() {
        let claims = fresh_claims();
        let token = sign_hs256(&claims, &secret()).unwrap();

        let decoded: TestClaims = verify_hs256(&token, &secret()).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_header_is_hs256_jwt() {
        let token = sign_hs256(&fresh_claims(), &secret()).unwrap();
        let header_part = token.split('.').next().unwrap();
        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_part).unwrap()).unwrap();

        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");
    }

    #[test]
    fn test_sign_rejects_empty_secret() {
        let result = sign_hs256(&fresh_claims(), &SecretString::from(""));
        assert_eq!(result, Err(JwtSigningError::EmptySecret));
    }

    #[test]
    fn test_verify_with_wrong_secret_is_signature_error() {
        let token = sign_hs256(&fresh_claims(), &secret()).unwrap();

        let result: Result<TestClaims, _> =
            verify_hs256(&token, &SecretString::from("some-other-secret"));
        assert_eq!(result, Err(JwtValidationError::InvalidSignature));
    }

    #[test]
    fn test_verify_expired_token() {
        let now = chrono::Utc::now().timestamp();
        let claims = TestClaims {
            sub: "alice".to_string(),
            iat: now - 7200,
            exp: now - 10,
        };
        let token = sign_hs256(&claims, &secret()).unwrap();

        let result: Result<TestClaims, _> = verify_hs256(&token, &secret());
        assert_eq!(result, Err(JwtValidationError::Expired));
    }

    #[test]
    fn test_verify_oversized_token() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        let result: Result<TestClaims, _> = verify_hs256(&token, &secret());
        assert_eq!(result, Err(JwtValidationError::TokenTooLarge));
    }

    #[test]
    fn test_verify_malformed_tokens() {
        for token in ["", "single", "only.two", "not.valid.jwt", "a.b.c.d"] {
            let result: Result<TestClaims, _> = verify_hs256(token, &secret());
            assert_eq!(
                result,
                Err(JwtValidationError::MalformedToken),
                "expected malformed for {token:?}"
            );
        }
    }

    #[test]
    fn test_verify_rejects_other_hmac_algorithm() {
        let claims = fresh_claims();
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"unit-test-shared-secret"),
        )
        .unwrap();

        let result: Result<TestClaims, _> = verify_hs256(&token, &secret());
        assert_eq!(result, Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_verify_rejects_tampered_payload() {
        let token = sign_hs256(&fresh_claims(), &secret()).unwrap();
        let mut parts = token.split('.');
        let header_part = parts.next().unwrap();
        let _payload = parts.next().unwrap();
        let signature_part = parts.next().unwrap();

        let mut forged = fresh_claims();
        forged.sub = "mallory".to_string();
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{header_part}.{forged_payload}.{signature_part}");

        let result: Result<TestClaims, _> = verify_hs256(&tampered, &secret());
        assert_eq!(result, Err(JwtValidationError::InvalidSignature));
    }

    #[test]
    fn test_verify_requires_exp() {
        #[derive(Serialize)]
        struct NoExp {
            sub: String,
        }
        let token = sign_hs256(
            &NoExp {
                sub: "alice".to_string(),
            },
            &secret(),
        )
        .unwrap();

        let result: Result<TestClaims, _> = verify_hs256(&token, &secret());
        assert_eq!(result, Err(JwtValidationError::MalformedToken));
    }

    #[test]
    fn test_validate_iat_current_time() {
        let now = chrono::Utc::now().timestamp();
        assert!(validate_iat(now, DEFAULT_CLOCK_SKEW).is_ok());
    }

    #[test]
    fn test_validate_iat_past_time() {
        let now = chrono::Utc::now().timestamp();
        assert!(validate_iat(now - 86_400, DEFAULT_CLOCK_SKEW).is_ok());
    }

    #[test]
    fn test_validate_iat_at_boundary_exact() {
        let now = 1_700_000_000;
        let skew = Duration::from_secs(300);

        assert!(validate_iat_at(now + 300, skew, now).is_ok());
        assert_eq!(
            validate_iat_at(now + 301, skew, now),
            Err(JwtValidationError::IatTooFarInFuture)
        );
    }

    #[test]
    fn test_validate_iat_far_future() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(
            validate_iat(now + 3600, DEFAULT_CLOCK_SKEW),
            Err(JwtValidationError::IatTooFarInFuture)
        );
    }
}
