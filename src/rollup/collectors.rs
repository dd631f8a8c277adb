//! Metric collectors for the rollup aggregator.
//!
//! Each collector issues one grouped query against the revenue/client tables,
//! scoped by the branch-id set and a date window, and returns a per-branch
//! map. Monetary values arrive from the settlement feed as raw text and pass
//! through [`parse_revenue`] before any arithmetic, so a malformed ledger row
//! can never push `NaN` into a persisted figure.
//!
//! A collector query failure is fatal for the run: the error propagates and
//! no partial-day snapshot is written.

use crate::db::{BranchTarget, RankedEntry, RevenueBucket};
use crate::rollup::hierarchy::BranchId;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;

/// Everything the combiner needs for one business date, fetched up front.
#[derive(Debug, Default)]
pub struct CollectedMetrics {
    /// Per-branch brokerage for the business date.
    pub daily_brokerage: HashMap<BranchId, Decimal>,
    /// Per-branch brokerage month-to-date.
    pub monthly_brokerage: HashMap<BranchId, Decimal>,
    /// Per-branch distinct clients that traded on the date.
    pub traded_clients: HashMap<BranchId, i64>,
    /// Per-branch clients activated on the date.
    pub added_clients: HashMap<BranchId, i64>,
    /// Per-branch live clients as of the date.
    pub total_clients: HashMap<BranchId, i64>,
    /// Per-branch client revenue ranking, truncated per branch.
    pub client_revenue: HashMap<BranchId, Vec<RankedEntry>>,
    /// Per-branch segment revenue breakdown.
    pub segment_revenue: HashMap<BranchId, Vec<RevenueBucket>>,
    /// Per-branch monthly targets.
    pub branch_targets: HashMap<BranchId, BranchTarget>,
    /// Distinct trading days seen in the ledger month-to-date.
    pub elapsed_trading_days: i32,
}

/// Normalizes a raw ledger brokerage value.
///
/// Null, empty and non-numeric inputs coerce to zero; whitespace is trimmed.
#[must_use]
pub fn parse_revenue(raw: Option<&str>) -> Decimal {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| Decimal::from_str(s).ok())
        .unwrap_or_default()
}

/// Sums normalized revenue values per branch.
#[must_use]
pub fn sum_revenue_by_branch(rows: &[(BranchId, Option<String>)]) -> HashMap<BranchId, Decimal> {
    let mut sums: HashMap<BranchId, Decimal> = HashMap::new();
    for (branch_id, raw) in rows {
        *sums.entry(*branch_id).or_default() += parse_revenue(raw.as_deref());
    }
    sums
}

/// Groups revenue per (branch, client), ranks descending per branch and
/// truncates to `limit` entries.
///
/// Ties break on ascending client id so reruns produce identical rankings.
#[must_use]
pub fn rank_client_revenue(
    rows: &[(BranchId, i64, String, Option<String>)],
    limit: usize,
) -> HashMap<BranchId, Vec<RankedEntry>> {
    let mut grouped: HashMap<BranchId, HashMap<i64, RankedEntry>> = HashMap::new();
    for (branch_id, client_id, name, raw) in rows {
        let entry = grouped
            .entry(*branch_id)
            .or_default()
            .entry(*client_id)
            .or_insert_with(|| RankedEntry {
                id: *client_id,
                name: name.clone(),
                amount: Decimal::ZERO,
            });
        entry.amount += parse_revenue(raw.as_deref());
    }

    grouped
        .into_iter()
        .map(|(branch_id, clients)| {
            let mut ranked: Vec<RankedEntry> = clients.into_values().collect();
            ranked.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.id.cmp(&b.id)));
            ranked.truncate(limit);
            (branch_id, ranked)
        })
        .collect()
}

/// Groups revenue per (branch, segment), buckets sorted by segment code.
#[must_use]
pub fn bucket_segment_revenue(
    rows: &[(BranchId, String, Option<String>)],
) -> HashMap<BranchId, Vec<RevenueBucket>> {
    let mut grouped: HashMap<BranchId, HashMap<String, Decimal>> = HashMap::new();
    for (branch_id, segment, raw) in rows {
        *grouped
            .entry(*branch_id)
            .or_default()
            .entry(segment.clone())
            .or_default() += parse_revenue(raw.as_deref());
    }

    grouped
        .into_iter()
        .map(|(branch_id, segments)| {
            let mut buckets: Vec<RevenueBucket> = segments
                .into_iter()
                .map(|(key, amount)| RevenueBucket { key, amount })
                .collect();
            buckets.sort_by(|a, b| a.key.cmp(&b.key));
            (branch_id, buckets)
        })
        .collect()
}

/// Runs every collector for the given branch set and business date.
///
/// The queries are independent reads and run concurrently. Any single
/// failure aborts the whole collection.
///
/// # Errors
/// Returns the first query error encountered.
/// First day of the business date's month, the start of every
/// month-to-date window.
#[must_use]
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub async fn collect(
    pool: &PgPool,
    branch_ids: &[BranchId],
    date: NaiveDate,
    ranking_size: usize,
) -> Result<CollectedMetrics, sqlx::Error> {
    let month_start = month_start(date);

    let (
        daily_rows,
        monthly_rows,
        traded_clients,
        added_clients,
        total_clients,
        client_rows,
        segment_rows,
        targets,
        elapsed_trading_days,
    ) = tokio::try_join!(
        fetch_revenue_rows(pool, branch_ids, date, date),
        fetch_revenue_rows(pool, branch_ids, month_start, date),
        fetch_traded_clients(pool, branch_ids, date),
        fetch_added_clients(pool, branch_ids, date),
        fetch_total_clients(pool, branch_ids, date),
        fetch_client_revenue_rows(pool, branch_ids, date),
        fetch_segment_rows(pool, branch_ids, date),
        fetch_branch_targets(pool, branch_ids, month_start),
        fetch_elapsed_trading_days(pool, month_start, date),
    )?;

    Ok(CollectedMetrics {
        daily_brokerage: sum_revenue_by_branch(&daily_rows),
        monthly_brokerage: sum_revenue_by_branch(&monthly_rows),
        traded_clients,
        added_clients,
        total_clients,
        client_revenue: rank_client_revenue(&client_rows, ranking_size),
        segment_revenue: bucket_segment_revenue(&segment_rows),
        branch_targets: targets.into_iter().map(|t| (t.branch_id, t)).collect(),
        elapsed_trading_days,
    })
}

async fn fetch_revenue_rows(
    pool: &PgPool,
    branch_ids: &[BranchId],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<(BranchId, Option<String>)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT branch_id, net_brokerage FROM segment_revenue \
         WHERE trade_date BETWEEN $1 AND $2 AND branch_id = ANY($3)",
    )
    .bind(start)
    .bind(end)
    .bind(branch_ids)
    .fetch_all(pool)
    .await
}

async fn fetch_traded_clients(
    pool: &PgPool,
    branch_ids: &[BranchId],
    date: NaiveDate,
) -> Result<HashMap<BranchId, i64>, sqlx::Error> {
    let rows: Vec<(BranchId, i64)> = sqlx::query_as(
        "SELECT branch_id, COUNT(DISTINCT client_id) FROM segment_revenue \
         WHERE trade_date = $1 AND branch_id = ANY($2) GROUP BY branch_id",
    )
    .bind(date)
    .bind(branch_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

async fn fetch_added_clients(
    pool: &PgPool,
    branch_ids: &[BranchId],
    date: NaiveDate,
) -> Result<HashMap<BranchId, i64>, sqlx::Error> {
    let rows: Vec<(BranchId, i64)> = sqlx::query_as(
        "SELECT branch_id, COUNT(*) FROM clients \
         WHERE activated_on = $1 AND deleted_at IS NULL AND branch_id = ANY($2) \
         GROUP BY branch_id",
    )
    .bind(date)
    .bind(branch_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

async fn fetch_total_clients(
    pool: &PgPool,
    branch_ids: &[BranchId],
    date: NaiveDate,
) -> Result<HashMap<BranchId, i64>, sqlx::Error> {
    let rows: Vec<(BranchId, i64)> = sqlx::query_as(
        "SELECT branch_id, COUNT(*) FROM clients \
         WHERE activated_on <= $1 AND deleted_at IS NULL AND branch_id = ANY($2) \
         GROUP BY branch_id",
    )
    .bind(date)
    .bind(branch_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

async fn fetch_client_revenue_rows(
    pool: &PgPool,
    branch_ids: &[BranchId],
    date: NaiveDate,
) -> Result<Vec<(BranchId, i64, String, Option<String>)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT sr.branch_id, sr.client_id, c.name, sr.net_brokerage \
         FROM segment_revenue sr JOIN clients c ON c.id = sr.client_id \
         WHERE sr.trade_date = $1 AND sr.branch_id = ANY($2)",
    )
    .bind(date)
    .bind(branch_ids)
    .fetch_all(pool)
    .await
}

async fn fetch_segment_rows(
    pool: &PgPool,
    branch_ids: &[BranchId],
    date: NaiveDate,
) -> Result<Vec<(BranchId, String, Option<String>)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT branch_id, segment, net_brokerage FROM segment_revenue \
         WHERE trade_date = $1 AND branch_id = ANY($2)",
    )
    .bind(date)
    .bind(branch_ids)
    .fetch_all(pool)
    .await
}

async fn fetch_branch_targets(
    pool: &PgPool,
    branch_ids: &[BranchId],
    month_start: NaiveDate,
) -> Result<Vec<BranchTarget>, sqlx::Error> {
    sqlx::query_as(
        "SELECT branch_id, month, target_brokerage, trading_days FROM branch_targets \
         WHERE month = $1 AND branch_id = ANY($2)",
    )
    .bind(month_start)
    .bind(branch_ids)
    .fetch_all(pool)
    .await
}

async fn fetch_elapsed_trading_days(
    pool: &PgPool,
    month_start: NaiveDate,
    date: NaiveDate,
) -> Result<i32, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(DISTINCT trade_date) FROM segment_revenue \
         WHERE trade_date BETWEEN $1 AND $2",
    )
    .bind(month_start)
    .bind(date)
    .fetch_one(pool)
    .await?;
    Ok(count as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_month_start_window() {
        let mid = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(month_start(mid), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        let first = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(month_start(first), first);

        let leap = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(month_start(leap), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn test_parse_revenue_valid() {
        assert_eq!(parse_revenue(Some("123.45")), dec!(123.45));
        assert_eq!(parse_revenue(Some(" 50 ")), dec!(50));
        assert_eq!(parse_revenue(Some("-7.5")), dec!(-7.5));
    }

    #[test]
    fn test_parse_revenue_invalid_coerces_to_zero() {
        assert_eq!(parse_revenue(None), Decimal::ZERO);
        assert_eq!(parse_revenue(Some("")), Decimal::ZERO);
        assert_eq!(parse_revenue(Some("   ")), Decimal::ZERO);
        assert_eq!(parse_revenue(Some("abc")), Decimal::ZERO);
        assert_eq!(parse_revenue(Some("NaN")), Decimal::ZERO);
    }

    #[test]
    fn test_sum_revenue_by_branch() {
        let rows = vec![
            (1, Some("100".to_string())),
            (1, Some("200.50".to_string())),
            (2, Some("75".to_string())),
            (1, Some("garbage".to_string())),
            (2, None),
        ];
        let sums = sum_revenue_by_branch(&rows);
        assert_eq!(sums[&1], dec!(300.50));
        assert_eq!(sums[&2], dec!(75));
    }

    #[test]
    fn test_rank_client_revenue_orders_and_truncates() {
        let mut rows = Vec::new();
        for client_id in 1..=12i64 {
            rows.push((
                1,
                client_id,
                format!("Client {}", client_id),
                Some(format!("{}", client_id * 10)),
            ));
        }
        let ranked = rank_client_revenue(&rows, 10);
        let list = &ranked[&1];

        assert_eq!(list.len(), 10);
        assert_eq!(list[0].id, 12);
        assert_eq!(list[0].amount, dec!(120));
        assert_eq!(list[9].id, 3);
        // 1 and 2 fell off the bottom
        assert!(!list.iter().any(|e| e.id == 1 || e.id == 2));
    }

    #[test]
    fn test_rank_client_revenue_tie_breaks_by_id() {
        let rows = vec![
            (1, 9, "Nine".to_string(), Some("100".to_string())),
            (1, 3, "Three".to_string(), Some("100".to_string())),
            (1, 5, "Five".to_string(), Some("100".to_string())),
        ];
        let ranked = rank_client_revenue(&rows, 10);
        let ids: Vec<i64> = ranked[&1].iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 5, 9]);
    }

    #[test]
    fn test_rank_client_revenue_sums_multiple_rows() {
        let rows = vec![
            (1, 7, "Seven".to_string(), Some("40".to_string())),
            (1, 7, "Seven".to_string(), Some("60".to_string())),
            (1, 8, "Eight".to_string(), Some("99".to_string())),
        ];
        let ranked = rank_client_revenue(&rows, 10);
        assert_eq!(ranked[&1][0].id, 7);
        assert_eq!(ranked[&1][0].amount, dec!(100));
        assert_eq!(ranked[&1][1].id, 8);
    }

    #[test]
    fn test_bucket_segment_revenue_sorted_by_key() {
        let rows = vec![
            (1, "FO".to_string(), Some("20".to_string())),
            (1, "EQ".to_string(), Some("10".to_string())),
            (1, "EQ".to_string(), Some("5".to_string())),
            (2, "CD".to_string(), Some("1".to_string())),
        ];
        let buckets = bucket_segment_revenue(&rows);

        let b1 = &buckets[&1];
        assert_eq!(b1.len(), 2);
        assert_eq!(b1[0].key, "EQ");
        assert_eq!(b1[0].amount, dec!(15));
        assert_eq!(b1[1].key, "FO");
        assert_eq!(buckets[&2][0].key, "CD");
    }
}
