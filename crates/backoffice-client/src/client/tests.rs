//! Unit tests for client module.

use super::*;

// ============================================================================
// ClientConfig Tests
// ============================================================================

#[test]
fn test_client_config_default() {
    let config = ClientConfig::default();

    assert_eq!(config.base_url, "http://localhost:8080");
    assert!(config.api_key.is_none());
    assert_eq!(config.timeout, Duration::from_secs(30));
}

#[test]
fn test_client_config_custom() {
    let config = ClientConfig {
        base_url: "http://api.example.com:9000".to_string(),
        api_key: Some("bk_live_test".to_string()),
        timeout: Duration::from_secs(60),
    };

    assert_eq!(config.base_url, "http://api.example.com:9000");
    assert_eq!(config.api_key.as_deref(), Some("bk_live_test"));
    assert_eq!(config.timeout, Duration::from_secs(60));
}

// ============================================================================
// BackofficeClient Tests
// ============================================================================

#[test]
fn test_client_strips_trailing_slash() {
    let client = BackofficeClient::with_base_url("http://localhost:8080/").unwrap();
    assert_eq!(client.base_url, "http://localhost:8080");
}

#[test]
fn test_client_keeps_base_url() {
    let client = BackofficeClient::with_base_url("http://api.example.com:9000").unwrap();
    assert_eq!(client.base_url, "http://api.example.com:9000");
}

#[test]
fn test_query_urls_built_through_url_parser() {
    let client = BackofficeClient::with_base_url("http://localhost:8080").unwrap();

    let mut url = client.url("/api/v1/stats/comparison").unwrap();
    url.query_pairs_mut().append_pair("branchIds", "1,2,3");
    assert_eq!(
        url.as_str(),
        "http://localhost:8080/api/v1/stats/comparison?branchIds=1%2C2%2C3"
    );
}

#[test]
fn test_invalid_base_url_rejected_at_request_build() {
    let client = BackofficeClient::with_base_url("not a url").unwrap();
    assert!(matches!(client.url("/health"), Err(Error::InvalidUrl(_))));
}

#[test]
fn test_client_clone() {
    let client = BackofficeClient::with_base_url("http://localhost:8080").unwrap();
    let cloned = client.clone();
    assert_eq!(cloned.base_url, client.base_url);
}
