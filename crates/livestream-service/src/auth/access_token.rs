//! Media server access token issuance.
//!
//! Access tokens are HS256 JWTs signed with the media server API secret. The
//! media server verifies them with the same secret and enforces the embedded
//! [`VideoGrant`]. Tokens are stateless and never stored.

use crate::auth::grants::{Role, VideoGrant};
use crate::config::Config;
use crate::errors::LsError;
use common::jwt::{self, JwtValidationError};
use common::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;

/// Identity used for tokens the service issues to itself.
pub const ADMIN_IDENTITY: &str = "admin";

/// Claims carried by a media server access token.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Issuer: the media server API key.
    pub iss: String,

    /// Participant identity - redacted in Debug output.
    pub sub: String,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Room the token was issued for.
    pub room: String,

    /// Capability grant.
    pub video: VideoGrant,
}

impl fmt::Debug for AccessClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessClaims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("room", &self.room)
            .field("video", &self.video)
            .finish()
    }
}

/// A freshly signed access token and the metadata echoed to the caller.
#[derive(Clone)]
pub struct IssuedToken {
    pub token: String,
    pub identity: String,
    pub room_name: String,
    pub role: Role,
    pub expires_in: i64,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[REDACTED]")
            .field("identity", &"[REDACTED]")
            .field("room_name", &self.room_name)
            .field("role", &self.role)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Signs access tokens for the media server.
#[derive(Clone)]
pub struct AccessTokenIssuer {
    api_key: String,
    api_secret: SecretString,
    ttl_seconds: i64,
}

impl fmt::Debug for AccessTokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenIssuer")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl AccessTokenIssuer {
    pub fn new(api_key: String, api_secret: SecretString, ttl_seconds: i64) -> Self {
        Self {
            api_key,
            api_secret,
            ttl_seconds,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.media_api_key.clone(),
            config.media_api_secret.clone(),
            config.access_token_ttl_seconds,
        )
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issue a token for `identity` to join `room_name` with `role`.
    ///
    /// # Errors
    ///
    /// - `LsError::Validation` if identity or room name is empty
    /// - `LsError::Signing` if the token cannot be signed
    #[instrument(skip_all, name = "ls.auth.issue_access_token", fields(role = %role))]
    pub fn issue(
        &self,
        identity: &str,
        room_name: &str,
        role: Role,
    ) -> Result<IssuedToken, LsError> {
        self.issue_at(identity, room_name, role, chrono::Utc::now().timestamp())
    }

    pub(crate) fn issue_at(
        &self,
        identity: &str,
        room_name: &str,
        role: Role,
        now: i64,
    ) -> Result<IssuedToken, LsError> {
        if identity.trim().is_empty() || room_name.trim().is_empty() {
            return Err(LsError::Validation(
                "identity and room_name are required".to_string(),
            ));
        }

        let token = self.sign(identity, room_name, role, now)?;

        tracing::debug!(
            target: "ls.auth.access_token",
            room = %room_name,
            role = %role,
            expires_in = self.ttl_seconds,
            "Access token issued"
        );

        Ok(IssuedToken {
            token,
            identity: identity.to_string(),
            room_name: room_name.to_string(),
            role,
            expires_in: self.ttl_seconds,
        })
    }

    /// Issue a Host token for the service's own admin API calls.
    ///
    /// Room listing is not room-scoped, so `room` may be absent.
    pub fn admin_token(&self, room: Option<&str>) -> Result<String, LsError> {
        self.sign(
            ADMIN_IDENTITY,
            room.unwrap_or_default(),
            Role::Host,
            chrono::Utc::now().timestamp(),
        )
    }

    /// Verify a token issued by this service and return its claims.
    pub fn decode(&self, token: &str) -> Result<AccessClaims, JwtValidationError> {
        jwt::verify_hs256(token, &self.api_secret)
    }

    fn sign(&self, identity: &str, room: &str, role: Role, now: i64) -> Result<String, LsError> {
        let claims = AccessClaims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
            room: room.to_string(),
            video: VideoGrant::for_role(role, room),
        };

        Ok(jwt::sign_hs256(&claims, &self.api_secret)?)
    }
}
