//! PostgreSQL implementation of JobRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Job, JobStatus, JobType};
use crate::domain::foundation::{
    DomainError, ErrorCode, JobId, SubscriptionId, Timestamp, TransactionId,
};
use crate::ports::{JobCompletion, JobRepository};

/// PostgreSQL implementation of the JobRepository port.
pub struct PostgresJobRepository {
    pool: PgPool,
}

impl PostgresJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    subscription_id: Uuid,
    job_type: String,
    status: String,
    attempt: i32,
    transaction_id: Option<Uuid>,
    processor_used: Option<String>,
    error_code: Option<String>,
    error_message: Option<String>,
    scheduled_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = DomainError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let job_type = JobType::parse(&row.job_type).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid job type: {}", row.job_type),
            )
        })?;
        let status = JobStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid job status: {}", row.status),
            )
        })?;

        Ok(Job {
            id: JobId::from_uuid(row.id),
            subscription_id: SubscriptionId::from_uuid(row.subscription_id),
            job_type,
            status,
            attempt: row.attempt.max(0) as u32,
            transaction_id: row.transaction_id.map(TransactionId::from_uuid),
            processor_used: row.processor_used,
            error_code: row.error_code,
            error_message: row.error_message,
            scheduled_at: Timestamp::from_datetime(row.scheduled_at),
            started_at: row.started_at.map(Timestamp::from_datetime),
            completed_at: row.completed_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, subscription_id, job_type, status, attempt,
           transaction_id, processor_used, error_code, error_message,
           scheduled_at, started_at, completed_at, created_at
    FROM scheduler_jobs
"#;

#[async_trait]
impl JobRepository for PostgresJobRepository {
    async fn create(&self, job: &Job) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO scheduler_jobs (
                id, subscription_id, job_type, status, attempt,
                scheduled_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.subscription_id.as_uuid())
        .bind(job.job_type.as_str())
        .bind(job.status.as_str())
        .bind(job.attempt as i32)
        .bind(job.scheduled_at.as_datetime())
        .bind(job.created_at.as_datetime())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_running(&self, id: &JobId, at: Timestamp) -> Result<(), DomainError> {
        sqlx::query("UPDATE scheduler_jobs SET status = 'running', started_at = $1 WHERE id = $2")
            .bind(at.as_datetime())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_finished(
        &self,
        id: &JobId,
        status: JobStatus,
        completion: &JobCompletion,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE scheduler_jobs
            SET status = $1, completed_at = $2, transaction_id = $3,
                processor_used = $4, error_code = $5, error_message = $6
            WHERE id = $7
            "#,
        )
        .bind(status.as_str())
        .bind(at.as_datetime())
        .bind(completion.transaction_id.map(|id| *id.as_uuid()))
        .bind(&completion.processor_used)
        .bind(&completion.error_code)
        .bind(&completion.error_message)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &JobId) -> Result<Option<Job>, DomainError> {
        let row: Option<JobRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Job::try_from).transpose()
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Job>, DomainError> {
        let rows: Vec<JobRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC LIMIT $1"))
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Job::try_from).collect()
    }

    async fn count(&self) -> Result<i64, DomainError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scheduler_jobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
