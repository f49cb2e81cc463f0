//! Integration tests for the recurring-billing pipeline.
//!
//! Exercise the scheduler/executor/retry-queue interplay end-to-end
//! over in-memory stores and a scripted charge contract: decline
//! classification, back-off cadence, the one-active-track invariant,
//! manual operations, and graceful shutdown.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use payrail::application::billing::{BillingExecutor, Scheduler};
use payrail::config::SchedulerConfig;
use payrail::domain::billing::{
    BillingCycle, Job, JobStatus, RetryEntry, RetryPolicy, RetryQueueStats, RetryResolution,
    RetryStatus, Subscription, SubscriptionStatus,
};
use payrail::domain::foundation::{
    DomainError, JobId, PaymentMethodId, PlanId, RetryId, SubscriptionId, Timestamp,
    TransactionId, UserId,
};
use payrail::ports::{
    ChargeExecutor, ChargeOutcome, JobCompletion, JobRepository, RetryQueue, SubscriptionStore,
};

// =============================================================================
// In-memory port implementations
// =============================================================================

#[derive(Default)]
struct InMemorySubscriptions {
    rows: Mutex<Vec<Subscription>>,
}

impl InMemorySubscriptions {
    fn seed(&self, subscription: Subscription) {
        self.rows.lock().unwrap().push(subscription);
    }

    fn status_of(&self, id: &SubscriptionId) -> Option<SubscriptionStatus> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|s| &s.id == id)
            .map(|s| s.status)
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptions {
    async fn due_for_billing(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<Subscription>, DomainError> {
        let mut due: Vec<Subscription> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.is_due(&now))
            .cloned()
            .collect();
        due.sort_by_key(|s| s.next_billing_date);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self.rows.lock().unwrap().iter().find(|s| &s.id == id).cloned())
    }

    async fn mark_past_due(&self, id: &SubscriptionId) -> Result<(), DomainError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(subscription) = rows.iter_mut().find(|s| &s.id == id) {
            subscription.status = SubscriptionStatus::PastDue;
        }
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryJobs {
    rows: Mutex<Vec<Job>>,
}

impl InMemoryJobs {
    fn all(&self) -> Vec<Job> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobs {
    async fn create(&self, job: &Job) -> Result<(), DomainError> {
        self.rows.lock().unwrap().push(job.clone());
        Ok(())
    }

    async fn mark_running(&self, id: &JobId, at: Timestamp) -> Result<(), DomainError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(job) = rows.iter_mut().find(|j| &j.id == id) {
            job.status = JobStatus::Running;
            job.started_at = Some(at);
        }
        Ok(())
    }

    async fn mark_finished(
        &self,
        id: &JobId,
        status: JobStatus,
        completion: &JobCompletion,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(job) = rows.iter_mut().find(|j| &j.id == id) {
            job.status = status;
            job.completed_at = Some(at);
            job.transaction_id = completion.transaction_id;
            job.processor_used = completion.processor_used.clone();
            job.error_code = completion.error_code.clone();
            job.error_message = completion.error_message.clone();
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>, DomainError> {
        Ok(self.rows.lock().unwrap().iter().find(|j| &j.id == id).cloned())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Job>, DomainError> {
        let mut rows = self.all();
        rows.reverse();
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn count(&self) -> Result<i64, DomainError> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }
}

#[derive(Default)]
struct InMemoryRetryQueue {
    rows: Mutex<Vec<RetryEntry>>,
}

impl InMemoryRetryQueue {
    fn all(&self) -> Vec<RetryEntry> {
        self.rows.lock().unwrap().clone()
    }

    fn get(&self, id: &RetryId) -> Option<RetryEntry> {
        self.rows.lock().unwrap().iter().find(|e| &e.id == id).cloned()
    }

    fn seed(&self, entry: RetryEntry) {
        self.rows.lock().unwrap().push(entry);
    }

    fn active_count(&self, subscription_id: &SubscriptionId) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| &e.subscription_id == subscription_id && e.status.is_active())
            .count()
    }
}

#[async_trait]
impl RetryQueue for InMemoryRetryQueue {
    async fn open(&self, entry: &RetryEntry) -> Result<RetryEntry, DomainError> {
        let mut rows = self.rows.lock().unwrap();
        // Upsert semantics of the partial unique index: an existing
        // active track absorbs the error instead of duplicating.
        if let Some(existing) = rows
            .iter_mut()
            .find(|e| e.subscription_id == entry.subscription_id && e.status.is_active())
        {
            existing.last_error_code = entry.last_error_code.clone();
            existing.last_error_message = entry.last_error_message.clone();
            existing.updated_at = entry.updated_at;
            return Ok(existing.clone());
        }
        rows.push(entry.clone());
        Ok(entry.clone())
    }

    async fn due(&self, now: Timestamp, limit: u32) -> Result<Vec<RetryEntry>, DomainError> {
        let mut due: Vec<RetryEntry> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == RetryStatus::Pending && !e.next_retry_at.is_after(&now))
            .cloned()
            .collect();
        due.sort_by_key(|e| e.next_retry_at);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn find_by_id(&self, id: &RetryId) -> Result<Option<RetryEntry>, DomainError> {
        Ok(self.get(id))
    }

    async fn active_for(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<RetryEntry>, DomainError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|e| &e.subscription_id == subscription_id && e.status.is_active())
            .cloned())
    }

    async fn list(
        &self,
        status: Option<RetryStatus>,
        limit: u32,
    ) -> Result<Vec<RetryEntry>, DomainError> {
        let mut entries: Vec<RetryEntry> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.next_retry_at);
        entries.truncate(limit as usize);
        Ok(entries)
    }

    async fn mark_processing(&self, id: &RetryId) -> Result<(), DomainError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(entry) = rows.iter_mut().find(|e| &e.id == id) {
            entry.status = RetryStatus::Processing;
        }
        Ok(())
    }

    async fn resolve(
        &self,
        id: &RetryId,
        resolution: &RetryResolution,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(entry) = rows.iter_mut().find(|e| &e.id == id) else {
            return Ok(());
        };

        entry.status = resolution.status();
        entry.last_attempt_at = Some(at);
        entry.updated_at = at;
        match resolution {
            RetryResolution::Succeeded {
                transaction_id,
                processor_used,
            } => {
                entry.transaction_id = *transaction_id;
                entry.processor_used = processor_used.clone();
                entry.resolved_at = Some(at);
            }
            RetryResolution::Rescheduled {
                attempt,
                next_retry_at,
                error_code,
                error_message,
            } => {
                entry.attempt = *attempt;
                entry.next_retry_at = *next_retry_at;
                entry.last_error_code = error_code.clone();
                entry.last_error_message = error_message.clone();
            }
            RetryResolution::FailedHard {
                attempt,
                error_code,
                error_message,
            }
            | RetryResolution::Exhausted {
                attempt,
                error_code,
                error_message,
            } => {
                entry.attempt = *attempt;
                entry.last_error_code = error_code.clone();
                entry.last_error_message = error_message.clone();
                entry.resolved_at = Some(at);
            }
        }
        Ok(())
    }

    async fn cancel(&self, id: &RetryId, at: Timestamp) -> Result<(), DomainError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(entry) = rows
            .iter_mut()
            .find(|e| &e.id == id && e.status.is_active())
        {
            entry.status = RetryStatus::Canceled;
            entry.resolved_at = Some(at);
        }
        Ok(())
    }

    async fn close_active_as_failed(
        &self,
        subscription_id: &SubscriptionId,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut rows = self.rows.lock().unwrap();
        for entry in rows
            .iter_mut()
            .filter(|e| &e.subscription_id == subscription_id && e.status.is_active())
        {
            entry.status = RetryStatus::Failed;
            entry.resolved_at = Some(at);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<RetryQueueStats, DomainError> {
        Ok(RetryQueueStats::default())
    }
}

/// Charge contract replaying scripted outcomes.
#[derive(Default)]
struct ScriptedCharger {
    outcomes: Mutex<VecDeque<ChargeOutcome>>,
    calls: Mutex<usize>,
}

impl ScriptedCharger {
    fn succeed(&self) {
        self.outcomes.lock().unwrap().push_back(ChargeOutcome {
            success: true,
            transaction_id: Some(TransactionId::new()),
            processor_used: Some("processor_a".to_string()),
            error_code: None,
            error_message: None,
        });
    }

    fn fail(&self, error_code: &str) {
        self.outcomes.lock().unwrap().push_back(ChargeOutcome {
            success: false,
            transaction_id: None,
            processor_used: Some("processor_a".to_string()),
            error_code: Some(error_code.to_string()),
            error_message: Some(format!("declined: {error_code}")),
        });
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ChargeExecutor for ScriptedCharger {
    async fn charge_subscription(&self, _subscription: &Subscription) -> ChargeOutcome {
        *self.calls.lock().unwrap() += 1;
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .expect("charger script exhausted")
    }
}

// =============================================================================
// Test harness
// =============================================================================

struct Harness {
    executor: Arc<BillingExecutor>,
    subscriptions: Arc<InMemorySubscriptions>,
    jobs: Arc<InMemoryJobs>,
    retries: Arc<InMemoryRetryQueue>,
    charger: Arc<ScriptedCharger>,
}

fn harness() -> Harness {
    let subscriptions = Arc::new(InMemorySubscriptions::default());
    let jobs = Arc::new(InMemoryJobs::default());
    let retries = Arc::new(InMemoryRetryQueue::default());
    let charger = Arc::new(ScriptedCharger::default());

    let executor = Arc::new(BillingExecutor::new(
        jobs.clone(),
        retries.clone(),
        subscriptions.clone(),
        charger.clone(),
        RetryPolicy::default(),
    ));

    Harness {
        executor,
        subscriptions,
        jobs,
        retries,
        charger,
    }
}

fn due_subscription() -> Subscription {
    let now = Timestamp::now();
    Subscription {
        id: SubscriptionId::new(),
        user_id: UserId::new(),
        plan_id: PlanId::new(),
        payment_method_id: Some(PaymentMethodId::new()),
        status: SubscriptionStatus::Active,
        amount_minor: 2900,
        currency: "USD".to_string(),
        billing_cycle: BillingCycle::Monthly,
        current_period_start: Some(now.plus(chrono::Duration::days(-30))),
        current_period_end: Some(now),
        next_billing_date: Some(now.plus(chrono::Duration::seconds(-60))),
        cancel_at_period_end: false,
        canceled_at: None,
        trial_start: None,
        trial_end: None,
        created_at: now,
        updated_at: now,
    }
}

fn seeded_retry(h: &Harness, subscription: &Subscription, attempt: u32) -> RetryEntry {
    let mut entry = RetryEntry::open(
        subscription.id,
        "insufficient_funds",
        "declined: insufficient_funds",
        &RetryPolicy::default(),
        Timestamp::now(),
    );
    entry.attempt = attempt;
    h.retries.seed(entry.clone());
    entry
}

// =============================================================================
// Billing batch
// =============================================================================

#[tokio::test]
async fn successful_billing_completes_job_without_retry() {
    let h = harness();
    let subscription = due_subscription();
    h.subscriptions.seed(subscription.clone());
    h.charger.succeed();

    let report = h.executor.execute_batch(&[subscription.clone()]).await;

    assert_eq!(report.processed, 1);
    assert_eq!(report.successful, 1);
    assert_eq!(report.failed, 0);

    let jobs = h.jobs.all();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Completed);
    assert!(jobs[0].started_at.is_some());
    assert!(jobs[0].completed_at.is_some());
    assert!(jobs[0].transaction_id.is_some());

    assert!(h.retries.all().is_empty());
}

#[tokio::test]
async fn soft_decline_opens_retry_with_one_hour_backoff() {
    let h = harness();
    let subscription = due_subscription();
    h.subscriptions.seed(subscription.clone());
    h.charger.fail("insufficient_funds");

    let before = Timestamp::now();
    let report = h.executor.execute_batch(&[subscription.clone()]).await;
    assert_eq!(report.failed, 1);

    let jobs = h.jobs.all();
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert_eq!(jobs[0].error_code.as_deref(), Some("insufficient_funds"));

    let entries = h.retries.all();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.status, RetryStatus::Pending);
    assert_eq!(entry.attempt, 1);
    assert_eq!(entry.max_attempts, 3);

    // First retry backs off one hour.
    let delta = entry.next_retry_at.seconds_since(&before);
    assert!((3595..=3605).contains(&delta), "delta was {delta}");
}

#[tokio::test]
async fn hard_decline_marks_past_due_without_retry() {
    let h = harness();
    let subscription = due_subscription();
    h.subscriptions.seed(subscription.clone());
    h.charger.fail("expired_card");

    h.executor.execute_batch(&[subscription.clone()]).await;

    assert!(h.retries.all().is_empty());
    assert_eq!(
        h.subscriptions.status_of(&subscription.id),
        Some(SubscriptionStatus::PastDue)
    );
    assert_eq!(h.jobs.all()[0].status, JobStatus::Failed);
}

#[tokio::test]
async fn hard_decline_closes_existing_retry_track() {
    let h = harness();
    let subscription = due_subscription();
    h.subscriptions.seed(subscription.clone());
    let entry = seeded_retry(&h, &subscription, 1);

    h.charger.fail("fraud_detected");
    h.executor.execute_batch(&[subscription.clone()]).await;

    let closed = h.retries.get(&entry.id).unwrap();
    assert_eq!(closed.status, RetryStatus::Failed);
    assert!(closed.resolved_at.is_some());
    assert_eq!(h.retries.active_count(&subscription.id), 0);
}

#[tokio::test]
async fn repeated_soft_declines_share_one_track() {
    let h = harness();
    let subscription = due_subscription();
    h.subscriptions.seed(subscription.clone());

    h.charger.fail("insufficient_funds");
    h.executor.execute_batch(&[subscription.clone()]).await;
    h.charger.fail("processing_error");
    h.executor.execute_batch(&[subscription.clone()]).await;

    // One active track per subscription, latest error absorbed.
    assert_eq!(h.retries.active_count(&subscription.id), 1);
    let entries = h.retries.all();
    assert_eq!(
        entries[0].last_error_code.as_deref(),
        Some("processing_error")
    );
}

// =============================================================================
// Retry attempts
// =============================================================================

#[tokio::test]
async fn soft_retry_failure_advances_attempt_with_24h_backoff() {
    let h = harness();
    let subscription = due_subscription();
    h.subscriptions.seed(subscription.clone());
    let entry = seeded_retry(&h, &subscription, 1);

    h.charger.fail("insufficient_funds");
    let before = Timestamp::now();
    h.executor.execute_retry_batch(&[entry.clone()]).await;

    let updated = h.retries.get(&entry.id).unwrap();
    assert_eq!(updated.status, RetryStatus::Pending);
    assert_eq!(updated.attempt, 2);

    // Second attempt backs off 24 hours.
    let delta = updated.next_retry_at.seconds_since(&before);
    assert!(
        (24 * 3600 - 5..=24 * 3600 + 5).contains(&delta),
        "delta was {delta}"
    );
}

#[tokio::test]
async fn soft_failure_at_final_attempt_exhausts_track() {
    let h = harness();
    let subscription = due_subscription();
    h.subscriptions.seed(subscription.clone());
    let entry = seeded_retry(&h, &subscription, 3);

    h.charger.fail("insufficient_funds");
    h.executor.execute_retry_batch(&[entry.clone()]).await;

    let updated = h.retries.get(&entry.id).unwrap();
    assert_eq!(updated.status, RetryStatus::Exhausted);
    assert!(updated.resolved_at.is_some());
}

#[tokio::test]
async fn hard_decline_during_retry_fails_track_and_parks_subscription() {
    let h = harness();
    let subscription = due_subscription();
    h.subscriptions.seed(subscription.clone());
    let entry = seeded_retry(&h, &subscription, 1);

    h.charger.fail("stolen_card");
    h.executor.execute_retry_batch(&[entry.clone()]).await;

    let updated = h.retries.get(&entry.id).unwrap();
    assert_eq!(updated.status, RetryStatus::Failed);
    assert_eq!(
        h.subscriptions.status_of(&subscription.id),
        Some(SubscriptionStatus::PastDue)
    );
}

#[tokio::test]
async fn successful_retry_records_transaction() {
    let h = harness();
    let subscription = due_subscription();
    h.subscriptions.seed(subscription.clone());
    let entry = seeded_retry(&h, &subscription, 2);

    h.charger.succeed();
    h.executor.execute_retry_batch(&[entry.clone()]).await;

    let updated = h.retries.get(&entry.id).unwrap();
    assert_eq!(updated.status, RetryStatus::Succeeded);
    assert!(updated.transaction_id.is_some());
    assert_eq!(updated.processor_used.as_deref(), Some("processor_a"));
    assert!(updated.resolved_at.is_some());
}

// =============================================================================
// Manual operations
// =============================================================================

#[tokio::test]
async fn retry_now_executes_pending_entry() {
    let h = harness();
    let subscription = due_subscription();
    h.subscriptions.seed(subscription.clone());
    let entry = seeded_retry(&h, &subscription, 1);

    h.charger.succeed();
    let report = h.executor.retry_now(&entry.id).await.unwrap();

    assert!(report.success);
    assert_eq!(h.retries.get(&entry.id).unwrap().status, RetryStatus::Succeeded);
}

#[tokio::test]
async fn retry_now_rejects_non_pending_entries() {
    let h = harness();
    let subscription = due_subscription();
    h.subscriptions.seed(subscription.clone());
    let entry = seeded_retry(&h, &subscription, 1);

    h.executor.cancel_retry(&entry.id).await.unwrap();
    let err = h.executor.retry_now(&entry.id).await.unwrap_err();
    assert_eq!(err.code.to_string(), "INVALID_RETRY_STATUS");
}

#[tokio::test]
async fn cancel_rejects_terminal_entries() {
    let h = harness();
    let subscription = due_subscription();
    h.subscriptions.seed(subscription.clone());
    let entry = seeded_retry(&h, &subscription, 1);

    h.executor.cancel_retry(&entry.id).await.unwrap();
    assert_eq!(h.retries.get(&entry.id).unwrap().status, RetryStatus::Canceled);

    let err = h.executor.cancel_retry(&entry.id).await.unwrap_err();
    assert_eq!(err.code.to_string(), "INVALID_RETRY_STATUS");
}

// =============================================================================
// Scheduler
// =============================================================================

fn scheduler_for(h: &Harness, config: SchedulerConfig) -> Arc<Scheduler> {
    Arc::new(Scheduler::new(
        h.subscriptions.clone(),
        h.retries.clone(),
        h.jobs.clone(),
        h.executor.clone(),
        config,
    ))
}

#[tokio::test]
async fn manual_trigger_bills_due_subscriptions() {
    let h = harness();
    let subscription = due_subscription();
    h.subscriptions.seed(subscription.clone());
    h.charger.succeed();

    let scheduler = scheduler_for(&h, SchedulerConfig::default());
    let report = scheduler.trigger_manual().await.unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.successful, 1);
    assert_eq!(h.jobs.all().len(), 1);

    let status = scheduler.status().await;
    assert_eq!(status.processed_last, 1);
    assert!(status.last_run.is_some());
    assert_eq!(status.total_jobs, 1);
}

#[tokio::test]
async fn manual_trigger_with_nothing_due_is_a_noop() {
    let h = harness();
    let scheduler = scheduler_for(&h, SchedulerConfig::default());

    let report = scheduler.trigger_manual().await.unwrap();
    assert_eq!(report.processed, 0);
    assert_eq!(h.charger.calls(), 0);
}

#[tokio::test]
async fn scheduler_stops_gracefully_without_claiming_new_work() {
    let h = harness();
    // Due subscription exists, but the stop signal lands before the
    // first tick would fire.
    h.subscriptions.seed(due_subscription());

    let config = SchedulerConfig {
        tick_interval_secs: 30,
        ..Default::default()
    };
    let scheduler = scheduler_for(&h, config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(scheduler.clone().run(shutdown_rx));

    // Let the loop start, then stop it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(scheduler.is_running());
    shutdown_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop in time")
        .unwrap();

    assert!(!scheduler.is_running());
    // No tick fired: no job rows were created.
    assert!(h.jobs.all().is_empty());
    assert_eq!(h.charger.calls(), 0);
}

#[tokio::test]
async fn disabled_scheduler_skips_ticks() {
    let h = harness();
    h.subscriptions.seed(due_subscription());

    let config = SchedulerConfig {
        tick_interval_secs: 1,
        enabled: false,
        ..Default::default()
    };
    let scheduler = scheduler_for(&h, config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(scheduler.clone().run(shutdown_rx));

    // Two intervals pass without any work being claimed.
    tokio::time::sleep(Duration::from_millis(2200)).await;
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler did not stop in time")
        .unwrap();

    assert!(h.jobs.all().is_empty());
}
