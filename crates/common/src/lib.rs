//! Common utilities shared across livestream components.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for HS256 JWT signing and validation helpers
pub mod jwt;
