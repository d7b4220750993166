//! Middleware for the livestream service.
//!
//! # Components
//!
//! - `service_auth` - service-to-service token verification
//! - `http_metrics` - request/response metrics for every route

pub mod http_metrics;
pub mod service_auth;

pub use http_metrics::http_metrics_middleware;
pub use service_auth::{service_auth, ServiceAuthState};
