//! Request and response types for the back-office API.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// Business model of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchModel {
    /// Own office.
    Branch,
    /// Franchise partner.
    Franchise,
    /// Referral partner.
    Referral,
}

impl std::fmt::Display for BranchModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Branch => write!(f, "branch"),
            Self::Franchise => write!(f, "franchise"),
            Self::Referral => write!(f, "referral"),
        }
    }
}

// ============================================================================
// Health & Overview
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Back-office overview statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
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
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSummary {
    /// Branch identifier.
    pub id: i64,
    /// Branch name.
    pub name: String,
    /// Business model.
    pub model: BranchModel,
    /// Parent (control) branch.
    pub control_branch_id: Option<i64>,
    /// Activation date.
    pub activated_on: NaiveDate,
}

/// Branch list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchesListResponse {
    /// Branches.
    pub branches: Vec<BranchSummary>,
}

/// Request to create a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchRequest {
    /// Branch name.
    pub name: String,
    /// Business model.
    pub model: BranchModel,
    /// Parent (control) branch.
    pub control_branch_id: Option<i64>,
    /// Activation date; server defaults to today when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_on: Option<NaiveDate>,
}

/// Descendant set of a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescendantsResponse {
    /// Root branch of the query.
    pub branch_id: i64,
    /// Full descendant set, root included.
    pub descendant_ids: Vec<i64>,
}

// ============================================================================
// Clients
// ============================================================================

/// Client summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    /// Client identifier.
    pub id: i64,
    /// External client code.
    pub code: String,
    /// Client name.
    pub name: String,
    /// Owning branch.
    pub branch_id: i64,
    /// Activation date.
    pub activated_on: NaiveDate,
    /// Days since the client last traded; absent if the client never traded.
    pub not_traded_days: Option<i64>,
}

/// Client list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientsListResponse {
    /// Clients.
    pub clients: Vec<ClientSummary>,
}

/// Request to create a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    /// External client code.
    pub code: String,
    /// Client name.
    pub name: String,
    /// Owning branch.
    pub branch_id: i64,
    /// Activation date; server defaults to today when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_on: Option<NaiveDate>,
}

// ============================================================================
// Statistics
// ============================================================================

/// Request to enqueue a rollup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStatsRequest {
    /// Business date to aggregate.
    pub date: NaiveDate,
    /// Marks the month-end run.
    #[serde(default)]
    pub is_last_date: bool,
}

/// Response to a rollup run enqueue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateStatsResponse {
    /// Whether the job was queued.
    pub queued: bool,
    /// Business date.
    pub date: NaiveDate,
}

/// One grouped revenue figure inside a snapshot breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueBucket {
    /// Grouping key (segment code or branch model).
    pub key: String,
    /// Summed net brokerage.
    pub amount: Decimal,
}

/// One entry of a ranked top-N list inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// Ranked entity identifier (client or franchisee branch).
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Summed net brokerage.
    pub amount: Decimal,
}

/// One branch's persisted snapshot for one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchStatsResponse {
    /// Branch identifier.
    pub branch_id: i64,
    /// Business date.
    pub stat_date: NaiveDate,
    /// Subtree brokerage for the date.
    pub total_brokerage: Decimal,
    /// Month-to-date brokerage.
    pub monthly_brokerage: Decimal,
    /// Month-end projection.
    pub projected_brokerage: Decimal,
    /// Live clients in the subtree.
    pub total_clients: i64,
    /// Distinct clients that traded.
    pub traded_clients: i64,
    /// Clients added on the date.
    pub added_clients: i64,
    /// Live direct franchise children.
    pub total_franchisees: i64,
    /// Direct franchise children that traded.
    pub traded_franchisees: i64,
    /// Direct franchise children added on the date.
    pub added_franchisees: i64,
    /// Trading days in the month.
    pub trading_days_total: i32,
    /// Trading days elapsed month-to-date.
    pub trading_days_elapsed: i32,
    /// Per-segment revenue breakdown.
    pub segment_revenue: Vec<RevenueBucket>,
    /// Per-model revenue breakdown.
    pub model_revenue: Vec<RevenueBucket>,
    /// Top clients by revenue.
    pub top_clients: Vec<RankedEntry>,
    /// Top franchisees by revenue.
    pub top_franchisees: Vec<RankedEntry>,
    /// When the aggregation run computed this row.
    pub computed_at: DateTime<Utc>,
}

/// Summed snapshot figures for a branch subset on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotTotals {
    /// Business date.
    pub stat_date: NaiveDate,
    /// Summed subtree brokerage across the subset.
    pub total_brokerage: Decimal,
    /// Summed month-to-date brokerage across the subset.
    pub monthly_brokerage: Decimal,
    /// Summed client count across the subset.
    pub total_clients: i64,
    /// Summed traded-client count across the subset.
    pub traded_clients: i64,
    /// Summed added-client count across the subset.
    pub added_clients: i64,
}

/// Comparison across a branch subset over the two most recent dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResponse {
    /// Branch ids included in the summation.
    pub branch_ids: Vec<i64>,
    /// Summed figures, newest date first.
    pub totals: Vec<SnapshotTotals>,
}

// ============================================================================
// Permissions
// ============================================================================

/// One feature/action grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    /// Feature identifier.
    pub feature: String,
    /// Action on the feature.
    pub action: String,
    /// Whether the action is allowed.
    pub allowed: bool,
}

/// Effective ability set for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilitiesResponse {
    /// User identifier.
    pub user_id: i64,
    /// Role the defaults came from.
    pub role: String,
    /// Merged abilities.
    pub abilities: Vec<Ability>,
}

// ============================================================================
// API Keys
// ============================================================================

/// Permission level for API keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Read-only access.
    Read,
    /// Branch/client management access.
    Manage,
    /// Full access.
    Admin,
}

/// Public API key info.
#[derive(Debug, Clone, Serialize, Deserialize)]
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
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApiKeyRequest {
    /// Human-readable name.
    pub name: String,
    /// Permissions to grant.
    pub permissions: Vec<Permission>,
    /// Rate limit in requests per minute.
    pub rate_limit: u32,
}

/// Response carrying the raw key; returned exactly once at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
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
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeysListResponse {
    /// Keys.
    pub keys: Vec<ApiKeyInfo>,
}

/// API key deletion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteApiKeyResponse {
    /// Whether the key existed and was deleted.
    pub deleted: bool,
    /// Key identifier.
    pub key_id: String,
}
