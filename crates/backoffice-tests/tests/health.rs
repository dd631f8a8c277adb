//! Health check and overview endpoint tests.

use backoffice_tests::connect_or_skip;

#[tokio::test]
async fn test_health_check() {
    let Some(client) = connect_or_skip().await else {
        return;
    };

    let health = client.health_check().await.expect("Health check failed");

    assert_eq!(health.status, "healthy");
    assert!(!health.version.is_empty());
}

#[tokio::test]
async fn test_overview() {
    let Some(client) = connect_or_skip().await else {
        return;
    };

    let overview = client.get_overview().await.expect("Failed to get overview");

    assert!(overview.branch_count >= 0);
    assert!(overview.client_count >= 0);
}
