//! Livestream Service Library
//!
//! A thin backend in front of a LiveKit-compatible media server:
//!
//! - Health reporting for orchestration probes
//! - Signed access tokens with role-based capability grants
//! - Service-to-service token verification for peer backends
//! - Room and participant listing via the media server admin API, with
//!   primary/fallback endpoints
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/*.rs -> handlers/*.rs -> auth/*.rs, services/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Access token issuance and service token verification
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Service auth and HTTP metrics middleware
//! - `models` - Request and response models
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup
//! - `services` - Health reporter and media server client

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
