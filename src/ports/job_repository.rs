//! Job repository port - records of individual billing attempts.

use async_trait::async_trait;

use crate::domain::billing::{Job, JobStatus};
use crate::domain::foundation::{DomainError, JobId, Timestamp, TransactionId};

/// Fields recorded when a job reaches a terminal status.
#[derive(Debug, Clone, Default)]
pub struct JobCompletion {
    pub transaction_id: Option<TransactionId>,
    pub processor_used: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

/// Port for scheduler job persistence.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Persist a freshly created pending job.
    async fn create(&self, job: &Job) -> Result<(), DomainError>;

    /// Transition pending -> running, stamping `started_at`.
    async fn mark_running(&self, id: &JobId, at: Timestamp) -> Result<(), DomainError>;

    /// Transition to a terminal status, stamping `completed_at` and the
    /// attempt's outcome.
    async fn mark_finished(
        &self,
        id: &JobId,
        status: JobStatus,
        completion: &JobCompletion,
        at: Timestamp,
    ) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>, DomainError>;

    /// Most recent jobs, newest first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<Job>, DomainError>;

    /// Total number of job rows ever created.
    async fn count(&self) -> Result<i64, DomainError>;
}
