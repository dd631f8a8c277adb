//! Bottom-up combiner.
//!
//! Folds the collected per-branch metric maps over each branch's descendant
//! set to produce one aggregate record per branch. Scalar metrics sum over
//! the full subtree; franchisee metrics deliberately roll up one level only
//! (direct franchise children, each judged by its own subtree's revenue).
//! List metrics are merged by re-grouping and re-summing, and rankings are
//! re-sorted and truncated again after the merge.
//!
//! Everything here is a pure function of the collected inputs and the
//! supplied business date. No wall clock, no I/O: rerunning a date with
//! unchanged source data produces identical aggregates.

use crate::db::{RankedEntry, RevenueBucket};
use crate::rollup::collectors::CollectedMetrics;
use crate::rollup::hierarchy::{BranchHierarchy, BranchId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Fallback trading days per month when no branch target row exists.
/// A policy constant, not a computed calendar fact.
pub const DEFAULT_TRADING_DAYS: i32 = 21;

/// Tunable rollup policy.
#[derive(Debug, Clone, Copy)]
pub struct RollupPolicy {
    /// Trading days assumed for a month without a target row.
    pub default_trading_days: i32,
    /// Entries kept in each ranked list.
    pub ranking_size: usize,
}

impl Default for RollupPolicy {
    fn default() -> Self {
        Self {
            default_trading_days: DEFAULT_TRADING_DAYS,
            ranking_size: 10,
        }
    }
}

/// One branch's aggregate record for one business date.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchAggregate {
    /// Branch identifier.
    pub branch_id: BranchId,
    /// Business date.
    pub stat_date: NaiveDate,
    /// Brokerage for the date over the full subtree.
    pub total_brokerage: Decimal,
    /// Month-to-date brokerage over the full subtree.
    pub monthly_brokerage: Decimal,
    /// Month-end projection from the month-to-date run rate.
    pub projected_brokerage: Decimal,
    /// Live clients in the subtree.
    pub total_clients: i64,
    /// Distinct clients in the subtree that traded on the date.
    pub traded_clients: i64,
    /// Clients in the subtree activated on the date.
    pub added_clients: i64,
    /// Live direct franchise children.
    pub total_franchisees: i64,
    /// Direct franchise children that traded on the date.
    pub traded_franchisees: i64,
    /// Direct franchise children activated on the date.
    pub added_franchisees: i64,
    /// Trading days in the month.
    pub trading_days_total: i32,
    /// Trading days elapsed month-to-date.
    pub trading_days_elapsed: i32,
    /// Merged per-segment revenue breakdown.
    pub segment_revenue: Vec<RevenueBucket>,
    /// Per-business-model revenue breakdown over the subtree.
    pub model_revenue: Vec<RevenueBucket>,
    /// Merged top clients by revenue.
    pub top_clients: Vec<RankedEntry>,
    /// Top direct franchisees by revenue.
    pub top_franchisees: Vec<RankedEntry>,
}

/// Combines collected metrics into one aggregate per branch, in ascending
/// branch-id order.
#[must_use]
pub fn combine_all(
    hierarchy: &BranchHierarchy,
    metrics: &CollectedMetrics,
    date: NaiveDate,
    policy: &RollupPolicy,
) -> Vec<BranchAggregate> {
    hierarchy
        .branch_ids()
        .into_iter()
        .map(|id| combine_branch(hierarchy, metrics, id, date, policy))
        .collect()
}

/// Combines collected metrics into one branch's aggregate record.
#[must_use]
pub fn combine_branch(
    hierarchy: &BranchHierarchy,
    metrics: &CollectedMetrics,
    branch_id: BranchId,
    date: NaiveDate,
    policy: &RollupPolicy,
) -> BranchAggregate {
    let descendants = hierarchy.descendants(branch_id);

    let sum_decimal = |map: &HashMap<BranchId, Decimal>| -> Decimal {
        descendants
            .iter()
            .map(|id| map.get(id).copied().unwrap_or_default())
            .sum()
    };
    let sum_count = |map: &HashMap<BranchId, i64>| -> i64 {
        descendants
            .iter()
            .map(|id| map.get(id).copied().unwrap_or_default())
            .sum()
    };

    let total_brokerage = sum_decimal(&metrics.daily_brokerage);
    let monthly_brokerage = sum_decimal(&metrics.monthly_brokerage);

    // Franchisee metrics roll up one level only: direct franchise children.
    let franchise_children = hierarchy.franchise_children(branch_id);
    let mut total_franchisees = 0i64;
    let mut traded_franchisees = 0i64;
    let mut added_franchisees = 0i64;
    let mut franchisee_revenue: Vec<RankedEntry> = Vec::new();

    for child in &franchise_children {
        let Some(node) = hierarchy.node(*child) else {
            continue;
        };
        if node.activated_on > date {
            continue;
        }
        total_franchisees += 1;
        if node.activated_on == date {
            added_franchisees += 1;
        }
        // A franchise child trades when its own subtree rolls up nonzero
        // revenue, even if every trade sits in its sub-branches.
        let revenue: Decimal = hierarchy
            .descendants(*child)
            .iter()
            .map(|id| metrics.daily_brokerage.get(id).copied().unwrap_or_default())
            .sum();
        if !revenue.is_zero() {
            traded_franchisees += 1;
            franchisee_revenue.push(RankedEntry {
                id: *child,
                name: node.name.clone(),
                amount: revenue,
            });
        }
    }
    franchisee_revenue.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.id.cmp(&b.id)));
    franchisee_revenue.truncate(policy.ranking_size);

    let segment_revenue = merge_buckets(
        descendants
            .iter()
            .filter_map(|id| metrics.segment_revenue.get(id)),
    );
    let model_revenue = merge_model_revenue(hierarchy, metrics, &descendants);
    let top_clients = merge_rankings(
        descendants
            .iter()
            .filter_map(|id| metrics.client_revenue.get(id)),
        policy.ranking_size,
    );

    let trading_days_total = metrics
        .branch_targets
        .get(&branch_id)
        .map_or(policy.default_trading_days, |t| t.trading_days);
    let trading_days_elapsed = metrics.elapsed_trading_days.max(0);

    let projected_brokerage = if trading_days_elapsed > 0 {
        let daily_average = monthly_brokerage / Decimal::from(trading_days_elapsed);
        (daily_average * Decimal::from(trading_days_total)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    BranchAggregate {
        branch_id,
        stat_date: date,
        total_brokerage,
        monthly_brokerage,
        projected_brokerage,
        total_clients: sum_count(&metrics.total_clients),
        traded_clients: sum_count(&metrics.traded_clients),
        added_clients: sum_count(&metrics.added_clients),
        total_franchisees,
        traded_franchisees,
        added_franchisees,
        trading_days_total,
        trading_days_elapsed,
        segment_revenue,
        model_revenue,
        top_clients,
        top_franchisees: franchisee_revenue,
    }
}

/// Merges bucket lists by re-grouping on the key and re-summing, output
/// sorted by key.
fn merge_buckets<'a>(lists: impl Iterator<Item = &'a Vec<RevenueBucket>>) -> Vec<RevenueBucket> {
    let mut merged: HashMap<String, Decimal> = HashMap::new();
    for list in lists {
        for bucket in list {
            *merged.entry(bucket.key.clone()).or_default() += bucket.amount;
        }
    }
    let mut buckets: Vec<RevenueBucket> = merged
        .into_iter()
        .map(|(key, amount)| RevenueBucket { key, amount })
        .collect();
    buckets.sort_by(|a, b| a.key.cmp(&b.key));
    buckets
}

/// Groups each descendant's own daily brokerage under that descendant's
/// business model.
fn merge_model_revenue(
    hierarchy: &BranchHierarchy,
    metrics: &CollectedMetrics,
    descendants: &[BranchId],
) -> Vec<RevenueBucket> {
    let mut merged: HashMap<&'static str, Decimal> = HashMap::new();
    for id in descendants {
        let Some(node) = hierarchy.node(*id) else {
            continue;
        };
        let revenue = metrics.daily_brokerage.get(id).copied().unwrap_or_default();
        if !revenue.is_zero() {
            *merged.entry(node.model.as_str()).or_default() += revenue;
        }
    }
    let mut buckets: Vec<RevenueBucket> = merged
        .into_iter()
        .map(|(key, amount)| RevenueBucket {
            key: key.to_string(),
            amount,
        })
        .collect();
    buckets.sort_by(|a, b| a.key.cmp(&b.key));
    buckets
}

/// Merges ranked lists: re-group by entity id, re-sum, re-sort descending
/// and truncate to the top N again.
///
/// The two-level top-N is exact because each entity's revenue lives entirely
/// within one branch: anything outside a child's top N is beaten by N
/// entries of that same child, all of which are in the merge candidate pool.
fn merge_rankings<'a>(
    lists: impl Iterator<Item = &'a Vec<RankedEntry>>,
    limit: usize,
) -> Vec<RankedEntry> {
    let mut merged: HashMap<i64, RankedEntry> = HashMap::new();
    for list in lists {
        for entry in list {
            merged
                .entry(entry.id)
                .and_modify(|e| e.amount += entry.amount)
                .or_insert_with(|| entry.clone());
        }
    }
    let mut ranked: Vec<RankedEntry> = merged.into_values().collect();
    ranked.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.id.cmp(&b.id)));
    ranked.truncate(limit);
    ranked
}
