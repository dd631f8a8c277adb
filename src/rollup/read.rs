//! Read-side queries over persisted snapshot rows.
//!
//! Pure summation over already-aggregated data; nothing here recomputes a
//! rollup. Serves the dashboard comparison views.

use crate::db::DailyBranchStats;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;

/// Summed snapshot figures for a branch subset on one date.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
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

/// Fetches one branch's snapshot row for a date.
///
/// # Errors
/// Returns the database error.
pub async fn fetch_snapshot(
    pool: &PgPool,
    branch_id: i64,
    date: NaiveDate,
) -> Result<Option<DailyBranchStats>, sqlx::Error> {
    sqlx::query_as(
        "SELECT branch_id, stat_date, total_brokerage, monthly_brokerage, \
                projected_brokerage, total_clients, traded_clients, added_clients, \
                total_franchisees, traded_franchisees, added_franchisees, \
                trading_days_total, trading_days_elapsed, segment_revenue, \
                model_revenue, top_clients, top_franchisees, computed_at \
         FROM daily_branch_stats WHERE branch_id = $1 AND stat_date = $2",
    )
    .bind(branch_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

/// Returns the most recent distinct snapshot dates, newest first.
///
/// # Errors
/// Returns the database error.
pub async fn latest_snapshot_dates(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<NaiveDate>, sqlx::Error> {
    let rows: Vec<(NaiveDate,)> = sqlx::query_as(
        "SELECT DISTINCT stat_date FROM daily_branch_stats ORDER BY stat_date DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(d,)| d).collect())
}

/// Sums snapshot rows across an arbitrary branch subset for the two most
/// recent dates, newest first.
///
/// # Errors
/// Returns the database error.
pub async fn comparison_totals(
    pool: &PgPool,
    branch_ids: &[i64],
) -> Result<Vec<SnapshotTotals>, sqlx::Error> {
    let dates = latest_snapshot_dates(pool, 2).await?;
    let mut totals = Vec::with_capacity(dates.len());

    for date in dates {
        let row: Option<SnapshotTotals> = sqlx::query_as(
            "SELECT stat_date, \
                    COALESCE(SUM(total_brokerage), 0) AS total_brokerage, \
                    COALESCE(SUM(monthly_brokerage), 0) AS monthly_brokerage, \
                    COALESCE(SUM(total_clients), 0)::BIGINT AS total_clients, \
                    COALESCE(SUM(traded_clients), 0)::BIGINT AS traded_clients, \
                    COALESCE(SUM(added_clients), 0)::BIGINT AS added_clients \
             FROM daily_branch_stats \
             WHERE stat_date = $1 AND branch_id = ANY($2) \
             GROUP BY stat_date",
        )
        .bind(date)
        .bind(branch_ids)
        .fetch_optional(pool)
        .await?;

        if let Some(row) = row {
            totals.push(row);
        }
    }

    Ok(totals)
}
