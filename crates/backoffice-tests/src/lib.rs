//! Integration tests for the Brokerage Back-Office API.
//!
//! These tests require the API server to be running. Configure the server URL
//! via the `API_BASE_URL` environment variable (default: `http://localhost:8080`).
//! Tests skip themselves when no server is reachable.

use backoffice_client::{BackofficeClient, ClientConfig};
use std::time::Duration;

/// Gets the API base URL from environment or uses default.
#[must_use]
pub fn get_api_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

/// Creates a test client configured for the API.
///
/// # Errors
/// Returns error if client creation fails.
pub fn create_test_client() -> Result<BackofficeClient, backoffice_client::Error> {
    BackofficeClient::new(ClientConfig {
        base_url: get_api_url(),
        api_key: None,
        timeout: Duration::from_secs(10),
    })
}

/// Returns a client if the server answers a health check, None otherwise.
/// Lets the suite pass on machines without a running server.
pub async fn connect_or_skip() -> Option<BackofficeClient> {
    let client = BackofficeClient::new(ClientConfig {
        base_url: get_api_url(),
        api_key: None,
        timeout: Duration::from_secs(2),
    })
    .ok()?;

    match client.health_check().await {
        Ok(_) => Some(client),
        Err(_) => {
            eprintln!("API server not reachable at {}, skipping", get_api_url());
            None
        }
    }
}

/// Generates a unique name to avoid conflicts between tests.
#[must_use]
pub fn unique_name(prefix: &str) -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("{}_{}_{}", prefix, ts, counter)
}
