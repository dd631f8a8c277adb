//! Database schema types and queries.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;

/// Business model of a branch in the distribution hierarchy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "branch_model", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BranchModel {
    /// Own office.
    Branch,
    /// Franchise partner.
    Franchise,
    /// Referral partner.
    Referral,
}

impl BranchModel {
    /// Lowercase wire name of the model.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchModel::Branch => "branch",
            BranchModel::Franchise => "franchise",
            BranchModel::Referral => "referral",
        }
    }
}

/// Branch record from the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Branch {
    /// Unique identifier.
    pub id: i64,
    /// Branch name.
    pub name: String,
    /// Business model.
    pub model: BranchModel,
    /// Parent (control) branch, if any.
    pub control_branch_id: Option<i64>,
    /// Date the branch went live.
    pub activated_on: NaiveDate,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Client record from the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    /// Unique identifier.
    pub id: i64,
    /// External client code.
    pub code: String,
    /// Client name.
    pub name: String,
    /// Owning branch.
    pub branch_id: i64,
    /// Date the account was activated.
    pub activated_on: NaiveDate,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Segment revenue ledger row. Append-only; the aggregator only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SegmentRevenue {
    /// Unique identifier.
    pub id: i64,
    /// Branch that earned the brokerage.
    pub branch_id: i64,
    /// Client whose trading produced it.
    pub client_id: i64,
    /// Settlement trade date.
    pub trade_date: NaiveDate,
    /// Product segment code (e.g., "EQ", "FO", "CD").
    pub segment: String,
    /// Net brokerage as delivered by the settlement feed. May be empty or
    /// malformed; normalized before any arithmetic.
    pub net_brokerage: Option<String>,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Monthly brokerage target for a branch.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BranchTarget {
    /// Branch identifier.
    pub branch_id: i64,
    /// First day of the target month.
    pub month: NaiveDate,
    /// Monthly brokerage target.
    pub target_brokerage: Decimal,
    /// Trading days in the month.
    pub trading_days: i32,
}

/// One grouped revenue figure inside a snapshot breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RevenueBucket {
    /// Grouping key (segment code or branch model).
    pub key: String,
    /// Summed net brokerage.
    pub amount: Decimal,
}

/// One entry of a ranked top-N list inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RankedEntry {
    /// Ranked entity identifier (client or franchisee branch).
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Summed net brokerage.
    pub amount: Decimal,
}

/// Denormalized daily statistics snapshot, one row per (branch, date).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyBranchStats {
    /// Branch identifier.
    pub branch_id: i64,
    /// Business date.
    pub stat_date: NaiveDate,
    /// Brokerage for the date, rolled up over the full subtree.
    pub total_brokerage: Decimal,
    /// Month-to-date brokerage.
    pub monthly_brokerage: Decimal,
    /// Month-end projection from the month-to-date run rate.
    pub projected_brokerage: Decimal,
    /// Live clients in the subtree.
    pub total_clients: i64,
    /// Distinct clients that traded on the date.
    pub traded_clients: i64,
    /// Clients activated on the date.
    pub added_clients: i64,
    /// Live franchise branches directly under this branch.
    pub total_franchisees: i64,
    /// Direct franchise children that traded on the date.
    pub traded_franchisees: i64,
    /// Direct franchise children activated on the date.
    pub added_franchisees: i64,
    /// Trading days in the month (target row, or the policy default).
    pub trading_days_total: i32,
    /// Trading days elapsed month-to-date.
    pub trading_days_elapsed: i32,
    /// Per-segment revenue breakdown.
    pub segment_revenue: Json<Vec<RevenueBucket>>,
    /// Per-business-model revenue breakdown.
    pub model_revenue: Json<Vec<RevenueBucket>>,
    /// Top clients by revenue.
    pub top_clients: Json<Vec<RankedEntry>>,
    /// Top franchisees by revenue.
    pub top_franchisees: Json<Vec<RankedEntry>>,
    /// Run timestamp, derived from the business date so reruns match.
    pub computed_at: DateTime<Utc>,
}

/// Back-office user record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Assigned role.
    pub role: String,
    /// Home branch, if any.
    pub branch_id: Option<i64>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Request to create a branch.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateBranchRequest {
    /// Branch name.
    pub name: String,
    /// Business model.
    pub model: BranchModel,
    /// Parent (control) branch.
    #[serde(rename = "controlBranchId")]
    pub control_branch_id: Option<i64>,
    /// Activation date; defaults to today when omitted.
    #[serde(rename = "activatedOn")]
    pub activated_on: Option<NaiveDate>,
}

/// Request to create a client.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateClientRequest {
    /// External client code.
    pub code: String,
    /// Client name.
    pub name: String,
    /// Owning branch.
    #[serde(rename = "branchId")]
    pub branch_id: i64,
    /// Activation date; defaults to today when omitted.
    #[serde(rename = "activatedOn")]
    pub activated_on: Option<NaiveDate>,
}
