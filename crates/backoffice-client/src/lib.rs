//! HTTP client library for the Brokerage Back-Office API.
//!
//! This crate provides a typed HTTP client for interacting with the brokerage
//! back-office backend: rollup snapshots, branch and client management,
//! permissions, and API keys.
//!
//! # Example
//!
//! ```no_run
//! use backoffice_client::{BackofficeClient, ClientConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), backoffice_client::Error> {
//!     let client = BackofficeClient::new(ClientConfig {
//!         base_url: "http://localhost:8080".into(),
//!         api_key: None,
//!         timeout: Duration::from_secs(30),
//!     })?;
//!
//!     // Check health
//!     let health = client.health_check().await?;
//!     println!("Status: {}", health.status);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{BackofficeClient, ClientConfig};
pub use error::Error;
pub use types::*;
