//! Service layer for the livestream service.
//!
//! - `health` - dependency probes and health report assembly
//! - `media_client` - media server admin API client with endpoint fallback

pub mod health;
pub mod media_client;

pub use health::HealthReporter;
pub use media_client::MediaServerClient;
