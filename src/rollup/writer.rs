//! Snapshot writer.
//!
//! Persists one run's aggregates inside a single transaction: take a
//! per-date advisory lock, delete any existing rows for the (date, branch
//! set) being replaced, then insert the new rows. The upsert on
//! (branch_id, stat_date) remains as a safety net, but the advisory lock is
//! what serializes two workers that picked up the same date.

use crate::rollup::combiner::BranchAggregate;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::debug;

/// Advisory lock class for daily stats runs, shared by every writer.
const STATS_LOCK_CLASS: i32 = 0x5374;

/// Replaces the snapshot rows for one business date.
///
/// Atomic per run: either every branch's row for the date is replaced or
/// none is. `computed_at` is supplied by the caller so the writer itself
/// never reads the wall clock.
///
/// # Errors
/// Returns the database error; the transaction rolls back.
pub async fn write_snapshots(
    pool: &PgPool,
    date: NaiveDate,
    aggregates: &[BranchAggregate],
    computed_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let branch_ids: Vec<i64> = aggregates.iter().map(|a| a.branch_id).collect();

    let mut tx = pool.begin().await?;

    // Serialize concurrent runs for the same date; released on commit or
    // rollback.
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind(STATS_LOCK_CLASS)
        .bind(date_lock_key(date))
        .execute(&mut *tx)
        .await?;

    let deleted = sqlx::query(
        "DELETE FROM daily_branch_stats WHERE stat_date = $1 AND branch_id = ANY($2)",
    )
    .bind(date)
    .bind(&branch_ids)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    debug!(%date, deleted, "cleared prior snapshot rows");

    for aggregate in aggregates {
        sqlx::query(
            "INSERT INTO daily_branch_stats (\
                branch_id, stat_date, total_brokerage, monthly_brokerage, \
                projected_brokerage, total_clients, traded_clients, added_clients, \
                total_franchisees, traded_franchisees, added_franchisees, \
                trading_days_total, trading_days_elapsed, segment_revenue, \
                model_revenue, top_clients, top_franchisees, computed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             ON CONFLICT (branch_id, stat_date) DO UPDATE SET \
                total_brokerage = EXCLUDED.total_brokerage, \
                monthly_brokerage = EXCLUDED.monthly_brokerage, \
                projected_brokerage = EXCLUDED.projected_brokerage, \
                total_clients = EXCLUDED.total_clients, \
                traded_clients = EXCLUDED.traded_clients, \
                added_clients = EXCLUDED.added_clients, \
                total_franchisees = EXCLUDED.total_franchisees, \
                traded_franchisees = EXCLUDED.traded_franchisees, \
                added_franchisees = EXCLUDED.added_franchisees, \
                trading_days_total = EXCLUDED.trading_days_total, \
                trading_days_elapsed = EXCLUDED.trading_days_elapsed, \
                segment_revenue = EXCLUDED.segment_revenue, \
                model_revenue = EXCLUDED.model_revenue, \
                top_clients = EXCLUDED.top_clients, \
                top_franchisees = EXCLUDED.top_franchisees, \
                computed_at = EXCLUDED.computed_at",
        )
        .bind(aggregate.branch_id)
        .bind(aggregate.stat_date)
        .bind(aggregate.total_brokerage)
        .bind(aggregate.monthly_brokerage)
        .bind(aggregate.projected_brokerage)
        .bind(aggregate.total_clients)
        .bind(aggregate.traded_clients)
        .bind(aggregate.added_clients)
        .bind(aggregate.total_franchisees)
        .bind(aggregate.traded_franchisees)
        .bind(aggregate.added_franchisees)
        .bind(aggregate.trading_days_total)
        .bind(aggregate.trading_days_elapsed)
        .bind(Json(&aggregate.segment_revenue))
        .bind(Json(&aggregate.model_revenue))
        .bind(Json(&aggregate.top_clients))
        .bind(Json(&aggregate.top_franchisees))
        .bind(computed_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

/// Second advisory-lock key: days since the Common Era, one key per date.
fn date_lock_key(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_lock_key_distinct_per_date() {
        let a = date_lock_key(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        let b = date_lock_key(NaiveDate::from_ymd_opt(2024, 3, 16).unwrap());
        assert_eq!(b, a + 1);
    }

    #[test]
    fn test_date_lock_key_stable() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(date_lock_key(d), date_lock_key(d));
    }
}
