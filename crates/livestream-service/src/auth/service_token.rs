//! Service-to-service token verification.
//!
//! Peer services authenticate with `Authorization: Service <jwt>`, an HS256
//! token signed with the shared service secret. Verification yields a
//! three-way [`ServiceAuthOutcome`] so callers can distinguish "no service
//! credentials presented" from "credentials presented and refused".

use common::jwt::{self, JwtSigningError, JwtValidationError};
use common::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::instrument;

/// Authorization scheme prefix for service tokens.
pub const SERVICE_SCHEME: &str = "Service ";

/// The only peer service accepted by the verifier.
pub const RECOGNIZED_SERVICE: &str = "main_app";

/// Lifetime of minted service tokens (1 hour).
pub const SERVICE_TOKEN_TTL_SECONDS: i64 = 3600;

/// Claims carried by a service token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceClaims {
    #[serde(rename = "service")]
    pub service_name: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated peer service, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub service_name: String,
}

/// Result of inspecting an `Authorization` header for a service token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceAuthOutcome {
    /// No header, or a header using a different scheme.
    NotApplicable,
    /// A service token was presented but refused.
    Rejected(String),
    /// A valid token from a recognized service.
    Accepted(ServiceIdentity),
}

impl ServiceAuthOutcome {
    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceAuthOutcome::NotApplicable => "not_applicable",
            ServiceAuthOutcome::Rejected(_) => "rejected",
            ServiceAuthOutcome::Accepted(_) => "accepted",
        }
    }
}

#[derive(Clone)]
pub struct ServiceTokenVerifier {
    secret: SecretString,
    clock_skew: Duration,
}

impl fmt::Debug for ServiceTokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTokenVerifier")
            .field("secret", &"[REDACTED]")
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}

impl ServiceTokenVerifier {
    pub fn new(secret: SecretString, clock_skew: Duration) -> Self {
        Self { secret, clock_skew }
    }

    /// Inspect a raw `Authorization` header value.
    #[instrument(skip_all, name = "ls.auth.verify_service_token")]
    pub fn verify(&self, raw_header: Option<&str>) -> ServiceAuthOutcome {
        let Some(token) = raw_header.and_then(|h| h.strip_prefix(SERVICE_SCHEME)) else {
            return ServiceAuthOutcome::NotApplicable;
        };

        let token = token.trim();
        if token.is_empty() {
            return ServiceAuthOutcome::Rejected("Missing service token".to_string());
        }

        let claims: ServiceClaims = match jwt::verify_hs256(token, &self.secret) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(target: "ls.auth.service_token", error = %e, "Service token rejected");
                return ServiceAuthOutcome::Rejected(rejection_reason(&e).to_string());
            }
        };

        if let Err(e) = jwt::validate_iat(claims.iat, self.clock_skew) {
            tracing::debug!(target: "ls.auth.service_token", error = %e, "Service token rejected");
            return ServiceAuthOutcome::Rejected(rejection_reason(&e).to_string());
        }

        if claims.service_name != RECOGNIZED_SERVICE {
            tracing::warn!(
                target: "ls.auth.service_token",
                service = %claims.service_name,
                "Service token from unrecognized service"
            );
            return ServiceAuthOutcome::Rejected("Unrecognized service".to_string());
        }

        ServiceAuthOutcome::Accepted(ServiceIdentity {
            service_name: claims.service_name,
        })
    }

    /// Mint a service token for `service_name`, valid for one hour.
    pub fn mint(&self, service_name: &str) -> Result<String, JwtSigningError> {
        let now = chrono::Utc::now().timestamp();
        let claims = ServiceClaims {
            service_name: service_name.to_string(),
            iat: now,
            exp: now + SERVICE_TOKEN_TTL_SECONDS,
        };
        jwt::sign_hs256(&claims, &self.secret)
    }
}

fn rejection_reason(err: &JwtValidationError) -> &'static str {
    match err {
        JwtValidationError::Expired => "Token expired",
        JwtValidationError::InvalidSignature => "Invalid token signature",
        JwtValidationError::IatTooFarInFuture => "Token issued in the future",
        JwtValidationError::TokenTooLarge | JwtValidationError::MalformedToken => "Invalid token",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-service-secret";

    fn verifier() -> ServiceTokenVerifier {
        ServiceTokenVerifier::new(SecretString::from(SECRET), Duration::from_secs(300))
    }

    fn header(token: &str) -> String {
        format!("Service {token}")
    }

    #[test]
    fn test_missing_header_is_not_applicable() {
        assert_eq!(verifier().verify(None), ServiceAuthOutcome::NotApplicable);
    }

    #[test]
    fn test_other_scheme_is_not_applicable() {
        let token = verifier().mint(RECOGNIZED_SERVICE).unwrap();
        let outcome = verifier().verify(Some(&format!("Bearer {token}")));
        assert_eq!(outcome, ServiceAuthOutcome::NotApplicable);
    }

    #[test]
    fn test_valid_token_is_accepted() {
        let v = verifier();
        let token = v.mint(RECOGNIZED_SERVICE).unwrap();

        assert_eq!(
            v.verify(Some(&header(&token))),
            ServiceAuthOutcome::Accepted(ServiceIdentity {
                service_name: "main_app".to_string()
            })
        );
    }

    #[test]
    fn test_minted_claims_shape() {
        let token = verifier().mint(RECOGNIZED_SERVICE).unwrap();
        let claims: ServiceClaims =
            jwt::verify_hs256(&token, &SecretString::from(SECRET)).unwrap();

        assert_eq!(claims.service_name, "main_app");
        assert_eq!(claims.exp - claims.iat, SERVICE_TOKEN_TTL_SECONDS);
    }

    #[test]
    fn test_wire_claim_is_named_service() {
        let claims = ServiceClaims {
            service_name: "main_app".to_string(),
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json.get("service"), Some(&serde_json::json!("main_app")));
        assert!(json.get("service_name").is_none());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let other = ServiceTokenVerifier::new(
            SecretString::from("not-the-service-secret"),
            Duration::from_secs(300),
        );
        let token = other.mint(RECOGNIZED_SERVICE).unwrap();

        assert_eq!(
            verifier().verify(Some(&header(&token))),
            ServiceAuthOutcome::Rejected("Invalid token signature".to_string())
        );
    }

    #[test]
    fn test_unrecognized_service_is_rejected() {
        let v = verifier();
        let token = v.mint("billing").unwrap();

        assert_eq!(
            v.verify(Some(&header(&token))),
            ServiceAuthOutcome::Rejected("Unrecognized service".to_string())
        );
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let now = chrono::Utc::now().timestamp();
        let claims = ServiceClaims {
            service_name: RECOGNIZED_SERVICE.to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = jwt::sign_hs256(&claims, &SecretString::from(SECRET)).unwrap();

        assert_eq!(
            verifier().verify(Some(&header(&token))),
            ServiceAuthOutcome::Rejected("Token expired".to_string())
        );
    }

    #[test]
    fn test_future_iat_is_rejected() {
        let now = chrono::Utc::now().timestamp();
        let claims = ServiceClaims {
            service_name: RECOGNIZED_SERVICE.to_string(),
            iat: now + 3600,
            exp: now + 7200,
        };
        let token = jwt::sign_hs256(&claims, &SecretString::from(SECRET)).unwrap();

        assert_eq!(
            verifier().verify(Some(&header(&token))),
            ServiceAuthOutcome::Rejected("Token issued in the future".to_string())
        );
    }

    #[test]
    fn test_malformed_and_empty_tokens_are_rejected() {
        let v = verifier();
        assert!(matches!(
            v.verify(Some("Service not-a-jwt")),
            ServiceAuthOutcome::Rejected(_)
        ));
        assert_eq!(
            v.verify(Some("Service ")),
            ServiceAuthOutcome::Rejected("Missing service token".to_string())
        );
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ServiceAuthOutcome::NotApplicable.label(), "not_applicable");
        assert_eq!(
            ServiceAuthOutcome::Rejected(String::new()).label(),
            "rejected"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        assert!(!format!("{:?}", verifier()).contains(SECRET));
    }
}
