//! # Livestream Test Utilities
//!
//! Shared test utilities for the livestream service.
//!
//! This crate provides:
//! - Server test harness (`TestLsServer` for E2E tests)
//! - Fixed test credentials for minting and verifying tokens
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ls_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let server = TestLsServer::spawn().await?;
//!
//!     let response = reqwest::get(format!("{}/live/", server.url())).await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;

pub use server_harness::*;
