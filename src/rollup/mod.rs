//! Branch hierarchy rollup aggregator.
//!
//! Computes, for a given business date, per-branch daily statistics by
//! aggregating each branch's own trading data with the data of every
//! descendant branch, then persists one denormalized snapshot row per
//! (branch, date).
//!
//! The pipeline is: resolve the hierarchy ([`hierarchy`]), fetch metric maps
//! ([`collectors`]), fold them bottom-up ([`combiner`]), and replace the
//! snapshot rows transactionally ([`writer`]). One invocation covers one
//! date and the full branch set; a failed run is retried wholesale, never
//! resumed per branch.

pub mod collectors;
pub mod combiner;
pub mod hierarchy;
pub mod read;
pub mod writer;

pub use collectors::{CollectedMetrics, parse_revenue};
pub use combiner::{BranchAggregate, DEFAULT_TRADING_DAYS, RollupPolicy, combine_all};
pub use hierarchy::{BranchHierarchy, BranchId, BranchNode};

use crate::db::BranchModel;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use tracing::{info, warn};

/// Timestamp stamped on a date's snapshot rows.
///
/// Derived from the business date itself, never the wall clock: rerunning a
/// date with unchanged source data writes byte-identical rows.
#[must_use]
pub fn snapshot_timestamp(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Result of one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Snapshot rows were written.
    Completed {
        /// Number of branch rows written.
        branches: usize,
    },
    /// Nothing to do; no rows were written.
    Skipped {
        /// Why the run was a no-op.
        reason: String,
    },
}

/// Runs the rollup pipeline for a business date.
#[derive(Clone)]
pub struct StatsAggregator {
    pool: PgPool,
    policy: RollupPolicy,
}

impl StatsAggregator {
    /// Creates a new aggregator over the given pool.
    #[must_use]
    pub fn new(pool: PgPool, policy: RollupPolicy) -> Self {
        Self { pool, policy }
    }

    /// Aggregates and persists statistics for every active branch on `date`.
    ///
    /// Input absence (no branches, no trading data) is a logged no-op, not
    /// an error. A collector or writer failure aborts the whole run and
    /// propagates; nothing partial is persisted.
    ///
    /// # Errors
    /// Returns the first collector or writer error.
    pub async fn run_for_date(&self, date: NaiveDate) -> Result<RunOutcome, sqlx::Error> {
        let branches = match self.fetch_branches().await {
            Ok(branches) => branches,
            Err(err) => {
                // Fail-soft on topology fetch: degrade instead of crashing.
                warn!(%date, error = %err, "branch topology unavailable, skipping run");
                return Ok(RunOutcome::Skipped {
                    reason: "branch topology unavailable".to_string(),
                });
            }
        };

        if branches.is_empty() {
            warn!(%date, "no active branches, skipping run");
            return Ok(RunOutcome::Skipped {
                reason: "no active branches".to_string(),
            });
        }

        let hierarchy = BranchHierarchy::build(branches);
        let branch_ids = hierarchy.branch_ids();

        let metrics =
            collectors::collect(&self.pool, &branch_ids, date, self.policy.ranking_size).await?;

        if metrics.daily_brokerage.is_empty() && metrics.monthly_brokerage.is_empty() {
            warn!(%date, "no trading data in range, skipping run");
            return Ok(RunOutcome::Skipped {
                reason: "no trading data".to_string(),
            });
        }

        let aggregates = combine_all(&hierarchy, &metrics, date, &self.policy);
        writer::write_snapshots(&self.pool, date, &aggregates, snapshot_timestamp(date)).await?;

        info!(%date, branches = aggregates.len(), "daily branch stats aggregated");
        Ok(RunOutcome::Completed {
            branches: aggregates.len(),
        })
    }

    /// Fetches the non-deleted branch set.
    async fn fetch_branches(&self) -> Result<Vec<BranchNode>, sqlx::Error> {
        let rows: Vec<(i64, String, BranchModel, Option<i64>, NaiveDate)> = sqlx::query_as(
            "SELECT id, name, model, control_branch_id, activated_on \
             FROM branches WHERE deleted_at IS NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, name, model, control_branch_id, activated_on)| BranchNode {
                    id,
                    name,
                    model,
                    control_branch_id,
                    activated_on,
                },
            )
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_timestamp_deterministic() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(snapshot_timestamp(date), snapshot_timestamp(date));
        assert_eq!(
            snapshot_timestamp(date).to_rfc3339(),
            "2024-03-15T00:00:00+00:00"
        );
    }

    #[test]
    fn test_rerun_produces_identical_rows() {
        // Two full combine passes plus the timestamp must agree, so a rerun
        // writes byte-identical snapshot rows.
        let hierarchy = BranchHierarchy::build(vec![BranchNode {
            id: 1,
            name: "HQ".to_string(),
            model: BranchModel::Branch,
            control_branch_id: None,
            activated_on: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        }]);
        let mut metrics = CollectedMetrics::default();
        metrics.daily_brokerage.insert(1, dec!(425));
        metrics.monthly_brokerage.insert(1, dec!(425));
        metrics.elapsed_trading_days = 1;

        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let policy = RollupPolicy::default();

        let first = (
            combine_all(&hierarchy, &metrics, date, &policy),
            snapshot_timestamp(date),
        );
        let second = (
            combine_all(&hierarchy, &metrics, date, &policy),
            snapshot_timestamp(date),
        );
        assert_eq!(first, second);
    }
}
