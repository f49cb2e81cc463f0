//! Scheduler jobs: one billing attempt claimed in a tick.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{JobId, SubscriptionId, Timestamp, TransactionId};

/// What kind of work the job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Billing,
    Retry,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Billing => "billing",
            JobType::Retry => "retry",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "billing" => Some(JobType::Billing),
            "retry" => Some(JobType::Retry),
            _ => None,
        }
    }
}

/// Job lifecycle: pending -> running -> completed | failed. Terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One billing attempt record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub subscription_id: SubscriptionId,
    pub job_type: JobType,
    pub status: JobStatus,
    pub attempt: u32,
    pub transaction_id: Option<TransactionId>,
    pub processor_used: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub scheduled_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Job {
    /// Creates a fresh pending job for a subscription.
    pub fn new(subscription_id: SubscriptionId, job_type: JobType, scheduled_at: Timestamp) -> Self {
        Self {
            id: JobId::new(),
            subscription_id,
            job_type,
            status: JobStatus::Pending,
            attempt: 1,
            transaction_id: None,
            processor_used: None,
            error_code: None,
            error_message: None,
            scheduled_at,
            started_at: None,
            completed_at: None,
            created_at: Timestamp::now(),
        }
    }
}
