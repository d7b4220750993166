//! Token issuance and service authentication.
//!
//! - `grants` - roles and the capability grant each role receives
//! - `access_token` - media server access tokens (HS256, media API secret)
//! - `service_token` - peer service tokens (HS256, service secret)

pub mod access_token;
pub mod grants;
pub mod service_token;

pub use access_token::{AccessClaims, AccessTokenIssuer, IssuedToken};
pub use grants::{Role, VideoGrant};
pub use service_token::{ServiceAuthOutcome, ServiceIdentity, ServiceTokenVerifier};
