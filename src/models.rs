//! Request/response DTOs with OpenAPI schemas.

use crate::db::{BranchModel, RankedEntry, RevenueBucket};
use crate::permissions::Ability;
use crate::rollup::read::SnapshotTotals;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Back-office overview statistics.
#[derive(Debug, Serialize, ToSchema)]
pub struct OverviewResponse {
    /// Active branches.
    pub branch_count: i64,
    /// Active clients.
    pub client_count: i64,
    /// Most recent snapshot date, if any run has completed.
    pub latest_snapshot_date: Option<NaiveDate>,
}

// ============================================================================
// Branches
// ============================================================================

/// Branch summary.
#[derive(Debug, Serialize, ToSchema)]
pub struct BranchSummary {
    /// Branch identifier.
    pub id: i64,
    /// Branch name.
    pub name: String,
    /// Business model.
    pub model: BranchModel,
    /// Parent (control) branch.
    #[serde(rename = "controlBranchId")]
    pub control_branch_id: Option<i64>,
    /// Activation date.
    #[serde(rename = "activatedOn")]
    pub activated_on: NaiveDate,
}

/// Branch list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct BranchesListResponse {
    /// Branches.
    pub branches: Vec<BranchSummary>,
}

/// Descendant set of a branch.
#[derive(Debug, Serialize, ToSchema)]
pub struct DescendantsResponse {
    /// Root branch of the query.
    #[serde(rename = "branchId")]
    pub branch_id: i64,
    /// Full descendant set, root included, breadth-first.
    #[serde(rename = "descendantIds")]
    pub descendant_ids: Vec<i64>,
}

// ============================================================================
// Clients
// ============================================================================

/// Client summary. `not_traded_days` is derived from the revenue ledger at
/// read time, never stored.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClientSummary {
    /// Client identifier.
    pub id: i64,
    /// External client code.
    pub code: String,
    /// Client name.
    pub name: String,
    /// Owning branch.
    #[serde(rename = "branchId")]
    pub branch_id: i64,
    /// Activation date.
    #[serde(rename = "activatedOn")]
    pub activated_on: NaiveDate,
    /// Days since the client last traded; absent if the client never traded.
    #[serde(rename = "notTradedDays")]
    pub not_traded_days: Option<i64>,
}

/// Client list query parameters.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ClientsQuery {
    /// Restrict the listing to one branch.
    #[serde(rename = "branchId")]
    pub branch_id: Option<i64>,
}

/// Client list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClientsListResponse {
    /// Clients.
    pub clients: Vec<ClientSummary>,
}

// ============================================================================
// Statistics
// ============================================================================

/// Request to enqueue a rollup job.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AggregateStatsRequest {
    /// Business date to aggregate.
    pub date: NaiveDate,
    /// Marks the month-end run.
    #[serde(rename = "isLastDate", default)]
    pub is_last_date: bool,
}

/// Response to a rollup job enqueue.
#[derive(Debug, Serialize, ToSchema)]
pub struct AggregateStatsResponse {
    /// Whether the job was queued.
    pub queued: bool,
    /// Business date.
    pub date: NaiveDate,
}

/// Snapshot query parameters.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SnapshotQuery {
    /// Business date of the snapshot.
    pub date: NaiveDate,
}

/// One branch's persisted snapshot for one date.
#[derive(Debug, Serialize, ToSchema)]
pub struct BranchStatsResponse {
    /// Branch identifier.
    #[serde(rename = "branchId")]
    pub branch_id: i64,
    /// Business date.
    #[serde(rename = "statDate")]
    pub stat_date: NaiveDate,
    /// Subtree brokerage for the date.
    #[serde(rename = "totalBrokerage")]
    pub total_brokerage: Decimal,
    /// Month-to-date brokerage.
    #[serde(rename = "monthlyBrokerage")]
    pub monthly_brokerage: Decimal,
    /// Month-end projection.
    #[serde(rename = "projectedBrokerage")]
    pub projected_brokerage: Decimal,
    /// Live clients in the subtree.
    #[serde(rename = "totalClients")]
    pub total_clients: i64,
    /// Distinct clients that traded.
    #[serde(rename = "tradedClients")]
    pub traded_clients: i64,
    /// Clients added on the date.
    #[serde(rename = "addedClients")]
    pub added_clients: i64,
    /// Live direct franchise children.
    #[serde(rename = "totalFranchisees")]
    pub total_franchisees: i64,
    /// Direct franchise children that traded.
    #[serde(rename = "tradedFranchisees")]
    pub traded_franchisees: i64,
    /// Direct franchise children added on the date.
    #[serde(rename = "addedFranchisees")]
    pub added_franchisees: i64,
    /// Trading days in the month.
    #[serde(rename = "tradingDaysTotal")]
    pub trading_days_total: i32,
    /// Trading days elapsed month-to-date.
    #[serde(rename = "tradingDaysElapsed")]
    pub trading_days_elapsed: i32,
    /// Per-segment revenue breakdown.
    #[serde(rename = "segmentRevenue")]
    pub segment_revenue: Vec<RevenueBucket>,
    /// Per-model revenue breakdown.
    #[serde(rename = "modelRevenue")]
    pub model_revenue: Vec<RevenueBucket>,
    /// Top clients by revenue.
    #[serde(rename = "topClients")]
    pub top_clients: Vec<RankedEntry>,
    /// Top franchisees by revenue.
    #[serde(rename = "topFranchisees")]
    pub top_franchisees: Vec<RankedEntry>,
    /// Run timestamp, derived from the business date so reruns match.
    #[serde(rename = "computedAt")]
    pub computed_at: DateTime<Utc>,
}

/// Comparison query parameters.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ComparisonQuery {
    /// Comma-separated branch ids.
    #[serde(rename = "branchIds")]
    pub branch_ids: String,
}

/// Comparison across a branch subset over the two most recent dates.
#[derive(Debug, Serialize, ToSchema)]
pub struct ComparisonResponse {
    /// Branch ids included in the summation.
    #[serde(rename = "branchIds")]
    pub branch_ids: Vec<i64>,
    /// Summed figures, newest date first.
    pub totals: Vec<SnapshotTotals>,
}

// ============================================================================
// Permissions
// ============================================================================

/// Effective ability set for a user.
#[derive(Debug, Serialize, ToSchema)]
pub struct AbilitiesResponse {
    /// User identifier.
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Role the defaults came from.
    pub role: String,
    /// Merged abilities, sorted by (feature, action).
    pub abilities: Vec<Ability>,
}

// ============================================================================
// API Keys
// ============================================================================

/// Permission level for API keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Read-only access.
    Read,
    /// Branch/client management access.
    Manage,
    /// Full access, including key administration and job triggers.
    Admin,
}

/// Public API key info (never includes the raw key or hash).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiKeyInfo {
    /// Key identifier.
    pub key_id: String,
    /// Human-readable name.
    pub name: String,
    /// Granted permissions.
    pub permissions: Vec<Permission>,
    /// Rate limit in requests per minute.
    pub rate_limit: u32,
    /// Creation timestamp in milliseconds.
    pub created_at: u64,
    /// Last used timestamp in milliseconds.
    pub last_used_at: Option<u64>,
}

/// Request to create an API key.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateApiKeyRequest {
    /// Human-readable name.
    pub name: String,
    /// Permissions to grant.
    pub permissions: Vec<Permission>,
    /// Rate limit in requests per minute.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
}

fn default_rate_limit() -> u32 {
    1000
}

/// Response carrying the raw key; returned exactly once at creation.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateApiKeyResponse {
    /// Key identifier.
    pub key_id: String,
    /// The raw API key.
    pub api_key: String,
    /// Human-readable name.
    pub name: String,
    /// Granted permissions.
    pub permissions: Vec<Permission>,
    /// Rate limit in requests per minute.
    pub rate_limit: u32,
}

/// API key list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiKeysListResponse {
    /// Keys.
    pub keys: Vec<ApiKeyInfo>,
}

/// API key deletion response.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteApiKeyResponse {
    /// Whether the key existed and was deleted.
    pub deleted: bool,
    /// Key identifier.
    pub key_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_request_defaults() {
        let request: AggregateStatsRequest =
            serde_json::from_str(r#"{"date": "2024-03-15"}"#).unwrap();
        assert_eq!(
            request.date,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
        assert!(!request.is_last_date);
    }

    #[test]
    fn test_aggregate_request_last_date() {
        let request: AggregateStatsRequest =
            serde_json::from_str(r#"{"date": "2024-03-29", "isLastDate": true}"#).unwrap();
        assert!(request.is_last_date);
    }

    #[test]
    fn test_permission_serialization() {
        assert_eq!(
            serde_json::to_string(&Permission::Admin).unwrap(),
            "\"admin\""
        );
        let parsed: Permission = serde_json::from_str("\"manage\"").unwrap();
        assert_eq!(parsed, Permission::Manage);
    }
}
