//! Billing executor - runs billing jobs and retry attempts.
//!
//! Each due subscription gets a Job row tracking the attempt; failures
//! classify into soft declines (which open or advance a retry track)
//! and hard declines (which park the subscription past_due).

use std::sync::Arc;
use std::time::Instant;

use crate::domain::billing::{
    resolve_attempt, AttemptResult, Job, JobStatus, JobType, RetryEntry, RetryPolicy,
    RetryResolution, RetryStatus, Subscription,
};
use crate::domain::foundation::{DomainError, ErrorCode, RetryId, SubscriptionId, Timestamp};
use crate::domain::payment::{classify_decline, DeclineType};
use crate::ports::{
    ChargeExecutor, ChargeOutcome, JobCompletion, JobRepository, RetryQueue, SubscriptionStore,
};

/// Result of processing one subscription or retry entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ItemReport {
    pub job_id: Option<String>,
    pub retry_id: Option<String>,
    pub subscription_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Result of one batch execution.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    fn push(&mut self, item: ItemReport) {
        self.processed += 1;
        if item.success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.items.push(item);
    }

    /// Folds another report into this one.
    pub fn absorb(&mut self, other: BatchReport) {
        self.processed += other.processed;
        self.successful += other.successful;
        self.failed += other.failed;
        self.items.extend(other.items);
    }
}

/// Executes billing batches through the charge contract.
pub struct BillingExecutor {
    jobs: Arc<dyn JobRepository>,
    retries: Arc<dyn RetryQueue>,
    subscriptions: Arc<dyn SubscriptionStore>,
    charger: Arc<dyn ChargeExecutor>,
    policy: RetryPolicy,
}

impl BillingExecutor {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        retries: Arc<dyn RetryQueue>,
        subscriptions: Arc<dyn SubscriptionStore>,
        charger: Arc<dyn ChargeExecutor>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            jobs,
            retries,
            subscriptions,
            charger,
            policy,
        }
    }

    /// Bills a batch of due subscriptions, one at a time. A single
    /// subscription is never billed twice within a batch.
    pub async fn execute_batch(&self, subscriptions: &[Subscription]) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport::default();

        for subscription in subscriptions {
            report.push(self.process_subscription(subscription).await);
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        report
    }

    /// Processes a batch of due retry entries.
    pub async fn execute_retry_batch(&self, entries: &[RetryEntry]) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport::default();

        for entry in entries {
            report.push(self.process_retry(entry).await);
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        report
    }

    /// One billing attempt: job bookkeeping around a charge, then
    /// decline handling.
    async fn process_subscription(&self, subscription: &Subscription) -> ItemReport {
        let job = Job::new(subscription.id, JobType::Billing, Timestamp::now());
        if let Err(err) = self.jobs.create(&job).await {
            tracing::error!(
                subscription_id = %subscription.id,
                error = %err,
                "Failed to create billing job"
            );
            return ItemReport {
                job_id: None,
                retry_id: None,
                subscription_id: subscription.id.to_string(),
                success: false,
                transaction_id: None,
                processor_used: None,
                error_code: Some(ErrorCode::DatabaseError.to_string()),
                error_message: Some(err.to_string()),
            };
        }

        if let Err(err) = self.jobs.mark_running(&job.id, Timestamp::now()).await {
            tracing::warn!(job_id = %job.id, error = %err, "Failed to mark job running");
        }

        tracing::info!(
            subscription_id = %subscription.id,
            job_id = %job.id,
            amount_minor = subscription.amount_minor,
            "Executing billing charge"
        );

        let outcome = self.charger.charge_subscription(subscription).await;

        let status = if outcome.success {
            JobStatus::Completed
        } else {
            self.handle_declined_billing(&subscription.id, &outcome).await;
            JobStatus::Failed
        };

        let completion = JobCompletion {
            transaction_id: outcome.transaction_id,
            processor_used: outcome.processor_used.clone(),
            error_code: outcome.error_code.clone(),
            error_message: outcome.error_message.clone(),
        };
        if let Err(err) = self
            .jobs
            .mark_finished(&job.id, status, &completion, Timestamp::now())
            .await
        {
            tracing::error!(job_id = %job.id, error = %err, "Failed to finish job");
        }

        ItemReport {
            job_id: Some(job.id.to_string()),
            retry_id: None,
            subscription_id: subscription.id.to_string(),
            success: outcome.success,
            transaction_id: outcome.transaction_id.map(|id| id.to_string()),
            processor_used: outcome.processor_used,
            error_code: outcome.error_code,
            error_message: outcome.error_message,
        }
    }

    /// Soft declines open (or join) the subscription's retry track;
    /// hard declines park the subscription and close any open track.
    async fn handle_declined_billing(
        &self,
        subscription_id: &SubscriptionId,
        outcome: &ChargeOutcome,
    ) {
        let code = outcome.error_code.as_deref().unwrap_or("");

        if classify_decline(code) == DeclineType::Soft {
            let entry = RetryEntry::open(
                *subscription_id,
                code,
                outcome.error_message.clone().unwrap_or_default(),
                &self.policy,
                Timestamp::now(),
            );
            match self.retries.open(&entry).await {
                Ok(opened) => {
                    tracing::info!(
                        subscription_id = %subscription_id,
                        retry_id = %opened.id,
                        next_retry_at = %opened.next_retry_at,
                        "Opened retry track after soft decline"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        subscription_id = %subscription_id,
                        error = %err,
                        "Failed to open retry track"
                    );
                }
            }
        } else {
            tracing::warn!(
                subscription_id = %subscription_id,
                error_code = code,
                "Hard decline, marking subscription past_due"
            );
            if let Err(err) = self.subscriptions.mark_past_due(subscription_id).await {
                tracing::error!(
                    subscription_id = %subscription_id,
                    error = %err,
                    "Failed to mark subscription past_due"
                );
            }
            if let Err(err) = self
                .retries
                .close_active_as_failed(subscription_id, Timestamp::now())
                .await
            {
                tracing::error!(
                    subscription_id = %subscription_id,
                    error = %err,
                    "Failed to close active retry track"
                );
            }
        }
    }

    /// One retry attempt: claim the entry, charge, advance the state
    /// machine.
    async fn process_retry(&self, entry: &RetryEntry) -> ItemReport {
        tracing::info!(
            retry_id = %entry.id,
            subscription_id = %entry.subscription_id,
            attempt = entry.attempt,
            max_attempts = entry.max_attempts,
            "Processing retry"
        );

        if let Err(err) = self.retries.mark_processing(&entry.id).await {
            tracing::warn!(retry_id = %entry.id, error = %err, "Failed to claim retry entry");
        }

        let result = match self.subscriptions.find_by_id(&entry.subscription_id).await {
            Ok(Some(subscription)) => {
                let outcome = self.charger.charge_subscription(&subscription).await;
                AttemptResult {
                    success: outcome.success,
                    transaction_id: outcome.transaction_id,
                    processor_used: outcome.processor_used,
                    error_code: outcome.error_code,
                    error_message: outcome.error_message,
                }
            }
            Ok(None) => AttemptResult {
                success: false,
                transaction_id: None,
                processor_used: None,
                error_code: Some("SUBSCRIPTION_ERROR".to_string()),
                error_message: Some("Subscription not found".to_string()),
            },
            Err(err) => AttemptResult {
                success: false,
                transaction_id: None,
                processor_used: None,
                error_code: Some("SUBSCRIPTION_ERROR".to_string()),
                error_message: Some(err.to_string()),
            },
        };

        let resolution = resolve_attempt(entry, &result, &self.policy, Timestamp::now());
        if let Err(err) = self
            .retries
            .resolve(&entry.id, &resolution, Timestamp::now())
            .await
        {
            tracing::error!(retry_id = %entry.id, error = %err, "Failed to resolve retry entry");
        }

        if matches!(resolution, RetryResolution::FailedHard { .. }) {
            if let Err(err) = self
                .subscriptions
                .mark_past_due(&entry.subscription_id)
                .await
            {
                tracing::error!(
                    subscription_id = %entry.subscription_id,
                    error = %err,
                    "Failed to mark subscription past_due"
                );
            }
        }

        ItemReport {
            job_id: None,
            retry_id: Some(entry.id.to_string()),
            subscription_id: entry.subscription_id.to_string(),
            success: result.success,
            transaction_id: result.transaction_id.map(|id| id.to_string()),
            processor_used: result.processor_used,
            error_code: result.error_code,
            error_message: result.error_message,
        }
    }

    /// Immediate out-of-band retry. Only pending entries qualify.
    pub async fn retry_now(&self, id: &RetryId) -> Result<ItemReport, DomainError> {
        let entry = self
            .retries
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::RetryNotFound, "Retry not found"))?;

        if entry.status != RetryStatus::Pending {
            return Err(DomainError::new(
                ErrorCode::InvalidRetryStatus,
                "Retry is not in pending status",
            ));
        }

        Ok(self.process_retry(&entry).await)
    }

    /// Operator cancel. Only pending or processing entries qualify.
    pub async fn cancel_retry(&self, id: &RetryId) -> Result<RetryEntry, DomainError> {
        let entry = self
            .retries
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::RetryNotFound, "Retry not found"))?;

        if !entry.status.is_active() {
            return Err(DomainError::new(
                ErrorCode::InvalidRetryStatus,
                "Retry cannot be canceled",
            ));
        }

        self.retries.cancel(id, Timestamp::now()).await?;
        Ok(entry)
    }
}
