//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports [`secrecy`] types. The livestream service holds two long-lived
//! secrets (the media server API secret and the service-to-service signing
//! secret); both are stored as `SecretString` so that deriving `Debug` on
//! configuration or state structs cannot leak them.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct MediaCredentials {
//!     api_key: String,
//!     api_secret: SecretString,
//! }
//!
//! let creds = MediaCredentials {
//!     api_key: "APIkey123".to_string(),
//!     api_secret: SecretString::from("hmac-secret"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("hmac-secret"));
//! assert_eq!(creds.api_secret.expose_secret(), "hmac-secret");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
