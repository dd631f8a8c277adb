//! Rollup aggregation and snapshot endpoint tests.

use backoffice_client::{AggregateStatsRequest, Error};
use backoffice_tests::connect_or_skip;
use chrono::{Duration, Utc};

#[tokio::test]
async fn test_aggregate_rejects_future_date() {
    let Some(client) = connect_or_skip().await else {
        return;
    };

    let tomorrow = Utc::now().date_naive() + Duration::days(1);
    let result = client
        .trigger_aggregation(&AggregateStatsRequest {
            date: tomorrow,
            is_last_date: false,
        })
        .await;

    assert!(matches!(result, Err(Error::Api { status: 400, .. })));
}

#[tokio::test]
async fn test_aggregate_queues_past_date() {
    let Some(client) = connect_or_skip().await else {
        return;
    };

    let yesterday = Utc::now().date_naive() - Duration::days(1);
    let response = client
        .trigger_aggregation(&AggregateStatsRequest {
            date: yesterday,
            is_last_date: false,
        })
        .await;

    // Either queued, or a concurrent run already holds the date.
    match response {
        Ok(response) => {
            assert!(response.queued);
            assert_eq!(response.date, yesterday);
        }
        Err(Error::Conflict(_)) => {}
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_snapshot_missing_date_is_not_found() {
    let Some(client) = connect_or_skip().await else {
        return;
    };

    // No trading calendar reaches back this far.
    let ancient = chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
    let result = client.get_branch_stats(1, ancient).await;

    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_comparison_rejects_bad_id_list() {
    let Some(client) = connect_or_skip().await else {
        return;
    };

    // An empty subset produces an empty branchIds parameter.
    let result = client.compare_branches(&[]).await;
    assert!(result.is_err());
}
