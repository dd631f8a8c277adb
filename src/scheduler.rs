//! Aggregation job queue and scheduled runs.
//!
//! Jobs are serialized through a bounded channel and executed by a single
//! worker task. A claim set keyed by business date rejects a second enqueue
//! for a date that is still queued or running, so two runs for the same date
//! can never overlap inside this process. The snapshot writer additionally
//! takes a per-date database lock, which covers concurrent processes.

use crate::config::AggregationConfig;
use crate::rollup::{RunOutcome, StatsAggregator};
use chrono::{Datelike, NaiveDate, Utc};
use dashmap::DashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

/// One aggregation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsJob {
    /// Business date to aggregate.
    pub date: NaiveDate,
    /// Marks the month-end run.
    pub is_last_date: bool,
}

/// Why an enqueue was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueError {
    /// A job for this date is already queued or running.
    InFlight(NaiveDate),
    /// The worker task has shut down.
    Closed,
}

/// Tracks dates that are queued or running.
#[derive(Debug, Default)]
pub struct DateClaims {
    dates: DashSet<NaiveDate>,
}

impl DateClaims {
    /// Creates an empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dates: DashSet::new(),
        }
    }

    /// Claims a date. Returns false if it is already claimed.
    pub fn claim(&self, date: NaiveDate) -> bool {
        self.dates.insert(date)
    }

    /// Releases a date.
    pub fn release(&self, date: NaiveDate) {
        self.dates.remove(&date);
    }

    /// Whether a date is currently claimed.
    #[must_use]
    pub fn is_claimed(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

/// Handle for submitting aggregation jobs.
#[derive(Clone)]
pub struct StatsJobQueue {
    tx: mpsc::Sender<StatsJob>,
    claims: Arc<DateClaims>,
}

impl StatsJobQueue {
    /// Starts the worker task and returns the queue handle.
    #[must_use]
    pub fn start(aggregator: StatsAggregator) -> Self {
        let (tx, mut rx) = mpsc::channel::<StatsJob>(64);
        let claims = Arc::new(DateClaims::new());
        let worker_claims = Arc::clone(&claims);

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                match aggregator.run_for_date(job.date).await {
                    Ok(RunOutcome::Completed { branches }) => {
                        info!(
                            date = %job.date,
                            branches,
                            is_last_date = job.is_last_date,
                            "aggregation run completed"
                        );
                    }
                    Ok(RunOutcome::Skipped { reason }) => {
                        warn!(date = %job.date, reason, "aggregation run skipped");
                    }
                    Err(err) => {
                        // The run is all-or-nothing; a retry re-enqueues the date.
                        error!(date = %job.date, error = %err, "aggregation run failed");
                    }
                }
                worker_claims.release(job.date);
            }
        });

        Self { tx, claims }
    }

    /// Enqueues a job, claiming its date.
    ///
    /// # Errors
    /// Returns [`EnqueueError::InFlight`] if the date is already queued or
    /// running, [`EnqueueError::Closed`] if the worker has shut down.
    pub async fn enqueue(&self, job: StatsJob) -> Result<(), EnqueueError> {
        if !self.claims.claim(job.date) {
            return Err(EnqueueError::InFlight(job.date));
        }
        if self.tx.send(job).await.is_err() {
            self.claims.release(job.date);
            return Err(EnqueueError::Closed);
        }
        Ok(())
    }

    /// Whether a date is currently queued or running.
    #[must_use]
    pub fn is_in_flight(&self, date: NaiveDate) -> bool {
        self.claims.is_claimed(date)
    }
}

/// Whether `date` is the last calendar day of its month.
#[must_use]
pub fn is_month_end(date: NaiveDate) -> bool {
    match date.succ_opt() {
        Some(next) => next.month() != date.month(),
        None => true,
    }
}

/// Periodic scheduler that enqueues the previous day's rollup.
pub struct StatsScheduler {
    queue: StatsJobQueue,
    config: AggregationConfig,
}

impl StatsScheduler {
    /// Creates a scheduler over the given queue.
    #[must_use]
    pub fn new(queue: StatsJobQueue, config: AggregationConfig) -> Self {
        Self { queue, config }
    }

    /// Runs the scheduling loop.
    pub async fn run(self: Arc<Self>) {
        if !self.config.scheduled {
            info!("Scheduled aggregation disabled");
            return;
        }

        info!(
            "Starting aggregation scheduler with {}s interval",
            self.config.tick_interval_secs
        );

        let mut ticker = interval(Duration::from_secs(self.config.tick_interval_secs));

        loop {
            ticker.tick().await;

            let Some(date) = Utc::now().date_naive().pred_opt() else {
                continue;
            };

            let job = StatsJob {
                date,
                is_last_date: is_month_end(date),
            };

            match self.queue.enqueue(job).await {
                Ok(()) => debug!(%date, "scheduled aggregation enqueued"),
                Err(EnqueueError::InFlight(_)) => {
                    debug!(%date, "aggregation already in flight, tick skipped");
                }
                Err(EnqueueError::Closed) => {
                    warn!("aggregation worker stopped, scheduler exiting");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_claims_reject_duplicate() {
        let claims = DateClaims::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

        assert!(claims.claim(date));
        assert!(!claims.claim(date));
        assert!(claims.is_claimed(date));

        claims.release(date);
        assert!(!claims.is_claimed(date));
        assert!(claims.claim(date));
    }

    #[test]
    fn test_date_claims_independent_dates() {
        let claims = DateClaims::new();
        let first = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let second = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();

        assert!(claims.claim(first));
        assert!(claims.claim(second));
    }

    #[test]
    fn test_is_month_end() {
        assert!(is_month_end(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
        assert!(is_month_end(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
        assert!(!is_month_end(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()));
        assert!(!is_month_end(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()));
    }
}
