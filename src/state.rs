//! Application state management.

use crate::auth::ApiKeyStore;
use crate::config::Config;
use crate::db::DatabasePool;
use crate::rollup::{RollupPolicy, StatsAggregator};
use crate::scheduler::StatsJobQueue;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database pool.
    pub db: DatabasePool,
    /// Aggregation job queue; handlers reach the rollup engine through it.
    pub job_queue: StatsJobQueue,
    /// API key store.
    pub api_keys: Arc<ApiKeyStore>,
    /// Application configuration.
    pub config: Config,
}

impl AppState {
    /// Creates application state from configuration and a connected pool.
    #[must_use]
    pub fn from_config(config: Config, db: DatabasePool) -> Self {
        let policy = RollupPolicy {
            default_trading_days: config.aggregation.default_trading_days as i32,
            ranking_size: config.aggregation.ranking_size,
        };
        let aggregator = StatsAggregator::new(db.pool().clone(), policy);
        let job_queue = StatsJobQueue::start(aggregator);

        Self {
            db,
            job_queue,
            api_keys: Arc::new(ApiKeyStore::new()),
            config,
        }
    }
}
