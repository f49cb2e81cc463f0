//! Retry queue entries and their state machine.
//!
//! ```text
//!                 +-- success ------------> succeeded (terminal)
//! pending -> processing
//!                 +-- soft, attempt < max -> pending (attempt++, rescheduled)
//!                 +-- hard ---------------> failed    (terminal)
//!                 +-- attempt >= max -----> exhausted (terminal)
//!                 +-- operator cancels ---> canceled  (terminal)
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::billing::policy::RetryPolicy;
use crate::domain::foundation::{RetryId, SubscriptionId, Timestamp, TransactionId};
use crate::domain::payment::{classify_decline, DeclineType};

/// Status of a retry queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    Exhausted,
}

impl RetryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryStatus::Pending => "pending",
            RetryStatus::Processing => "processing",
            RetryStatus::Succeeded => "succeeded",
            RetryStatus::Failed => "failed",
            RetryStatus::Canceled => "canceled",
            RetryStatus::Exhausted => "exhausted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RetryStatus::Pending),
            "processing" => Some(RetryStatus::Processing),
            "succeeded" => Some(RetryStatus::Succeeded),
            "failed" => Some(RetryStatus::Failed),
            "canceled" => Some(RetryStatus::Canceled),
            "exhausted" => Some(RetryStatus::Exhausted),
            _ => None,
        }
    }

    /// Terminal statuses set `resolved_at` and end the track.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryStatus::Succeeded
                | RetryStatus::Failed
                | RetryStatus::Canceled
                | RetryStatus::Exhausted
        )
    }

    /// Active statuses count toward the one-active-per-subscription
    /// invariant.
    pub fn is_active(&self) -> bool {
        matches!(self, RetryStatus::Pending | RetryStatus::Processing)
    }
}

/// One persistent soft-decline retry track for a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryEntry {
    pub id: RetryId,
    pub subscription_id: SubscriptionId,
    /// 1-indexed attempt counter.
    pub attempt: u32,
    pub max_attempts: u32,
    pub status: RetryStatus,
    pub last_error_code: Option<String>,
    pub last_error_message: Option<String>,
    pub decline_type: Option<DeclineType>,
    pub next_retry_at: Timestamp,
    pub last_attempt_at: Option<Timestamp>,
    pub transaction_id: Option<TransactionId>,
    pub processor_used: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

impl RetryEntry {
    /// Opens a new retry track after the first soft decline.
    pub fn open(
        subscription_id: SubscriptionId,
        error_code: impl Into<String>,
        error_message: impl Into<String>,
        policy: &RetryPolicy,
        now: Timestamp,
    ) -> Self {
        Self {
            id: RetryId::new(),
            subscription_id,
            attempt: 1,
            max_attempts: policy.max_attempts,
            status: RetryStatus::Pending,
            last_error_code: Some(error_code.into()),
            last_error_message: Some(error_message.into()),
            decline_type: Some(DeclineType::Soft),
            next_retry_at: policy.next_retry_at(1, now),
            last_attempt_at: None,
            transaction_id: None,
            processor_used: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }
}

/// What a retry attempt produced, as reported by the charge contract.
#[derive(Debug, Clone)]
pub struct AttemptResult {
    pub success: bool,
    pub transaction_id: Option<TransactionId>,
    pub processor_used: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

/// The state transition to persist after a retry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryResolution {
    Succeeded {
        transaction_id: Option<TransactionId>,
        processor_used: Option<String>,
    },
    /// Soft decline with attempts remaining: back to pending.
    Rescheduled {
        attempt: u32,
        next_retry_at: Timestamp,
        error_code: Option<String>,
        error_message: Option<String>,
    },
    /// Hard decline: terminal failure.
    FailedHard {
        attempt: u32,
        error_code: Option<String>,
        error_message: Option<String>,
    },
    /// Soft decline with no attempts left.
    Exhausted {
        attempt: u32,
        error_code: Option<String>,
        error_message: Option<String>,
    },
}

impl RetryResolution {
    /// The status this resolution moves the entry to.
    pub fn status(&self) -> RetryStatus {
        match self {
            RetryResolution::Succeeded { .. } => RetryStatus::Succeeded,
            RetryResolution::Rescheduled { .. } => RetryStatus::Pending,
            RetryResolution::FailedHard { .. } => RetryStatus::Failed,
            RetryResolution::Exhausted { .. } => RetryStatus::Exhausted,
        }
    }
}

/// Advances the retry state machine after one attempt.
pub fn resolve_attempt(
    entry: &RetryEntry,
    result: &AttemptResult,
    policy: &RetryPolicy,
    now: Timestamp,
) -> RetryResolution {
    if result.success {
        return RetryResolution::Succeeded {
            transaction_id: result.transaction_id,
            processor_used: result.processor_used.clone(),
        };
    }

    let code = result.error_code.as_deref().unwrap_or("");
    let next_attempt = entry.attempt + 1;

    if classify_decline(code) == DeclineType::Hard {
        return RetryResolution::FailedHard {
            attempt: next_attempt,
            error_code: result.error_code.clone(),
            error_message: result.error_message.clone(),
        };
    }

    if next_attempt > entry.max_attempts {
        return RetryResolution::Exhausted {
            attempt: next_attempt,
            error_code: result.error_code.clone(),
            error_message: result.error_message.clone(),
        };
    }

    RetryResolution::Rescheduled {
        attempt: next_attempt,
        next_retry_at: policy.next_retry_at(next_attempt, now),
        error_code: result.error_code.clone(),
        error_message: result.error_message.clone(),
    }
}

/// Snapshot of retry queue counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryQueueStats {
    pub total_pending: i64,
    pub total_processing: i64,
    pub total_succeeded: i64,
    pub total_failed: i64,
    pub total_canceled: i64,
    pub total_exhausted: i64,
    pub success_rate: f64,
    pub avg_attempts: f64,
}
