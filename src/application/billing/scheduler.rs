//! Recurring-billing scheduler - the tick loop.
//!
//! On each tick the scheduler claims a batch of due subscriptions and a
//! batch of due retries, runs both through the executor sequentially,
//! and records the combined result. Shutdown is graceful: no new tick
//! starts after the stop signal, and the in-flight tick finishes within
//! its deadline.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::watch;

use crate::config::SchedulerConfig;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{JobRepository, RetryQueue, SubscriptionStore};

use super::executor::{BatchReport, BillingExecutor};

/// Compact summary of the last tick, kept in memory for the status
/// endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
}

impl From<&BatchReport> for BatchSummary {
    fn from(report: &BatchReport) -> Self {
        Self {
            processed: report.processed,
            successful: report.successful,
            failed: report.failed,
        }
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    running: bool,
    last_run: Option<Timestamp>,
    next_run: Option<Timestamp>,
    processed_last: usize,
    last_result: Option<BatchSummary>,
}

/// Point-in-time scheduler status.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub last_run: Option<Timestamp>,
    pub next_run: Option<Timestamp>,
    pub processed_last: usize,
    pub total_jobs: i64,
    pub tick_interval: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_result: Option<BatchSummary>,
}

/// Tick-driven batch processor for recurring billing.
pub struct Scheduler {
    subscriptions: Arc<dyn SubscriptionStore>,
    retries: Arc<dyn RetryQueue>,
    jobs: Arc<dyn JobRepository>,
    executor: Arc<BillingExecutor>,
    config: SchedulerConfig,
    state: RwLock<SchedulerState>,
}

impl Scheduler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        retries: Arc<dyn RetryQueue>,
        jobs: Arc<dyn JobRepository>,
        executor: Arc<BillingExecutor>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            subscriptions,
            retries,
            jobs,
            executor,
            config,
            state: RwLock::new(SchedulerState::default()),
        }
    }

    /// Runs the tick loop until the shutdown signal flips to `true`.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            tick_interval_secs = self.config.tick_interval_secs,
            batch_size = self.config.batch_size,
            enabled = self.config.enabled,
            "Scheduler starting"
        );

        {
            let mut state = self.state.write().expect("scheduler state lock poisoned");
            state.running = true;
            state.next_run = Some(Timestamp::now().plus(chrono::Duration::seconds(
                self.config.tick_interval_secs as i64,
            )));
        }

        let mut interval = tokio::time::interval(self.config.tick_interval());
        // Consume the immediate first fire so the first real tick lands
        // one full interval after startup.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Scheduler received stop signal");
                        break;
                    }
                }
                _ = interval.tick() => {
                    if self.config.enabled {
                        if tokio::time::timeout(self.config.tick_deadline(), self.tick())
                            .await
                            .is_err()
                        {
                            tracing::warn!(
                                deadline_secs = self.config.tick_deadline_secs,
                                "Scheduler tick exceeded deadline"
                            );
                        }
                    }
                    let mut state = self.state.write().expect("scheduler state lock poisoned");
                    state.next_run = Some(Timestamp::now().plus(chrono::Duration::seconds(
                        self.config.tick_interval_secs as i64,
                    )));
                }
            }
        }

        let mut state = self.state.write().expect("scheduler state lock poisoned");
        state.running = false;
        state.next_run = None;
        tracing::info!("Scheduler stopped");
    }

    /// One scheduling cycle: due subscriptions, then due retries.
    async fn tick(&self) {
        let now = Timestamp::now();
        {
            let mut state = self.state.write().expect("scheduler state lock poisoned");
            state.last_run = Some(now);
        }

        let subscriptions = match self
            .subscriptions
            .due_for_billing(now, self.config.batch_size)
            .await
        {
            Ok(subscriptions) => subscriptions,
            Err(err) => {
                tracing::error!(error = %err, "Failed to query due subscriptions");
                Vec::new()
            }
        };

        let retries = match self.retries.due(now, self.config.batch_size).await {
            Ok(retries) => retries,
            Err(err) => {
                tracing::error!(error = %err, "Failed to query due retries");
                Vec::new()
            }
        };

        let total = subscriptions.len() + retries.len();
        {
            let mut state = self.state.write().expect("scheduler state lock poisoned");
            state.processed_last = total;
        }

        if total == 0 {
            return;
        }

        tracing::info!(
            due_subscriptions = subscriptions.len(),
            due_retries = retries.len(),
            "Scheduler tick"
        );

        let mut combined = BatchReport::default();
        if !subscriptions.is_empty() {
            let report = self.executor.execute_batch(&subscriptions).await;
            tracing::info!(
                processed = report.processed,
                successful = report.successful,
                failed = report.failed,
                "Billing batch completed"
            );
            combined.absorb(report);
        }
        if !retries.is_empty() {
            let report = self.executor.execute_retry_batch(&retries).await;
            tracing::info!(
                processed = report.processed,
                successful = report.successful,
                failed = report.failed,
                "Retry batch completed"
            );
            combined.absorb(report);
        }

        let mut state = self.state.write().expect("scheduler state lock poisoned");
        state.last_result = Some(BatchSummary::from(&combined));
    }

    /// Out-of-band run of the subscription half of a tick.
    pub async fn trigger_manual(&self) -> Result<BatchReport, DomainError> {
        tracing::info!("Manual scheduler trigger");

        let now = Timestamp::now();
        let subscriptions = self
            .subscriptions
            .due_for_billing(now, self.config.batch_size)
            .await?;

        if subscriptions.is_empty() {
            return Ok(BatchReport::default());
        }

        let report = self.executor.execute_batch(&subscriptions).await;

        let mut state = self.state.write().expect("scheduler state lock poisoned");
        state.last_run = Some(now);
        state.processed_last = report.processed;
        state.last_result = Some(BatchSummary::from(&report));
        Ok(report)
    }

    /// Current status, including the total job count from the store.
    pub async fn status(&self) -> SchedulerStatus {
        let total_jobs = self.jobs.count().await.unwrap_or(0);
        let state = self.state.read().expect("scheduler state lock poisoned");
        SchedulerStatus {
            running: state.running,
            last_run: state.last_run,
            next_run: state.next_run,
            processed_last: state.processed_last,
            total_jobs,
            tick_interval: format!("{}s", self.config.tick_interval_secs),
            last_result: state.last_result,
        }
    }

    /// Whether the run loop is active.
    pub fn is_running(&self) -> bool {
        self.state
            .read()
            .expect("scheduler state lock poisoned")
            .running
    }
}
