//! Unit tests for type serialization.

use super::*;
use rust_decimal::Decimal;
use std::str::FromStr;

// ============================================================================
// Enum Serialization Tests
// ============================================================================

#[test]
fn test_branch_model_serialization() {
    assert_eq!(
        serde_json::to_string(&BranchModel::Franchise).unwrap(),
        "\"franchise\""
    );
    let parsed: BranchModel = serde_json::from_str("\"referral\"").unwrap();
    assert_eq!(parsed, BranchModel::Referral);
}

#[test]
fn test_branch_model_display() {
    assert_eq!(BranchModel::Branch.to_string(), "branch");
    assert_eq!(BranchModel::Franchise.to_string(), "franchise");
    assert_eq!(BranchModel::Referral.to_string(), "referral");
}

#[test]
fn test_permission_serialization() {
    assert_eq!(
        serde_json::to_string(&Permission::Admin).unwrap(),
        "\"admin\""
    );
    let parsed: Permission = serde_json::from_str("\"read\"").unwrap();
    assert_eq!(parsed, Permission::Read);
}

// ============================================================================
// Request Serialization Tests
// ============================================================================

#[test]
fn test_aggregate_request_camel_case() {
    let request = AggregateStatsRequest {
        date: chrono::NaiveDate::from_ymd_opt(2024, 3, 29).unwrap(),
        is_last_date: true,
    };

    let json = serde_json::to_string(&request).unwrap();
    assert!(json.contains("\"isLastDate\":true"));
    assert!(json.contains("\"date\":\"2024-03-29\""));
}

#[test]
fn test_create_branch_request_omits_empty_activation() {
    let request = CreateBranchRequest {
        name: "North Region".to_string(),
        model: BranchModel::Branch,
        control_branch_id: Some(1),
        activated_on: None,
    };

    let json = serde_json::to_string(&request).unwrap();
    assert!(json.contains("\"controlBranchId\":1"));
    assert!(!json.contains("activatedOn"));
}

// ============================================================================
// Response Deserialization Tests
// ============================================================================

#[test]
fn test_branch_stats_response_deserialization() {
    let json = r#"{
        "branchId": 7,
        "statDate": "2024-03-15",
        "totalBrokerage": "425.50",
        "monthlyBrokerage": "3120.00",
        "projectedBrokerage": "6552.00",
        "totalClients": 40,
        "tradedClients": 12,
        "addedClients": 1,
        "totalFranchisees": 3,
        "tradedFranchisees": 2,
        "addedFranchisees": 0,
        "tradingDaysTotal": 21,
        "tradingDaysElapsed": 10,
        "segmentRevenue": [{"key": "EQ", "amount": "300.00"}],
        "modelRevenue": [{"key": "franchise", "amount": "125.50"}],
        "topClients": [{"id": 11, "name": "Acme", "amount": "90.00"}],
        "topFranchisees": [],
        "computedAt": "2024-03-16T01:00:00Z"
    }"#;

    let stats: BranchStatsResponse = serde_json::from_str(json).unwrap();
    assert_eq!(stats.branch_id, 7);
    assert_eq!(stats.total_brokerage, Decimal::from_str("425.50").unwrap());
    assert_eq!(stats.segment_revenue.len(), 1);
    assert_eq!(stats.segment_revenue[0].key, "EQ");
    assert_eq!(stats.top_clients[0].name, "Acme");
    assert_eq!(stats.trading_days_total, 21);
}

#[test]
fn test_client_summary_without_trades() {
    let json = r#"{
        "id": 3,
        "code": "CL003",
        "name": "New Client",
        "branchId": 2,
        "activatedOn": "2024-03-01",
        "notTradedDays": null
    }"#;

    let client: ClientSummary = serde_json::from_str(json).unwrap();
    assert_eq!(client.code, "CL003");
    assert!(client.not_traded_days.is_none());
}

#[test]
fn test_comparison_response_deserialization() {
    let json = r#"{
        "branchIds": [1, 2],
        "totals": [
            {
                "stat_date": "2024-03-15",
                "total_brokerage": "1000.00",
                "monthly_brokerage": "9000.00",
                "total_clients": 80,
                "traded_clients": 25,
                "added_clients": 2
            }
        ]
    }"#;

    let comparison: ComparisonResponse = serde_json::from_str(json).unwrap();
    assert_eq!(comparison.branch_ids, vec![1, 2]);
    assert_eq!(comparison.totals.len(), 1);
    assert_eq!(comparison.totals[0].total_clients, 80);
}
