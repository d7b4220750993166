//! HTTP request handlers for the livestream service.

pub mod health;
pub mod metrics;
pub mod rooms;
pub mod tokens;

pub use health::{health_report, liveness_check, readiness_check, simple_health_check};
pub use metrics::metrics_handler;
pub use rooms::{list_participants, list_rooms, test_connection};
pub use tokens::issue_token;
