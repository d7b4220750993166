//! Observability for the livestream service.
//!
//! Provides metric definitions and the Prometheus recorder setup.

pub mod metrics;
