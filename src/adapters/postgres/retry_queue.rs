//! PostgreSQL implementation of RetryQueue.
//!
//! The one-active-track-per-subscription invariant lives here, enforced
//! by the partial unique index on `(subscription_id)` over active rows;
//! `open` upserts against it so two writers cannot create parallel
//! tracks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{
    RetryEntry, RetryQueueStats, RetryResolution, RetryStatus,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, RetryId, SubscriptionId, Timestamp, TransactionId,
};
use crate::domain::payment::DeclineType;
use crate::ports::RetryQueue;

/// PostgreSQL implementation of the RetryQueue port.
pub struct PostgresRetryQueue {
    pool: PgPool,
}

impl PostgresRetryQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RetryRow {
    id: Uuid,
    subscription_id: Uuid,
    attempt: i32,
    max_attempts: i32,
    status: String,
    last_error_code: Option<String>,
    last_error_message: Option<String>,
    decline_type: Option<String>,
    next_retry_at: DateTime<Utc>,
    last_attempt_at: Option<DateTime<Utc>>,
    transaction_id: Option<Uuid>,
    processor_used: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<RetryRow> for RetryEntry {
    type Error = DomainError;

    fn try_from(row: RetryRow) -> Result<Self, Self::Error> {
        let status = RetryStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid retry status: {}", row.status),
            )
        })?;
        let decline_type = match row.decline_type.as_deref() {
            Some("soft") => Some(DeclineType::Soft),
            Some("hard") => Some(DeclineType::Hard),
            _ => None,
        };

        Ok(RetryEntry {
            id: RetryId::from_uuid(row.id),
            subscription_id: SubscriptionId::from_uuid(row.subscription_id),
            attempt: row.attempt.max(0) as u32,
            max_attempts: row.max_attempts.max(0) as u32,
            status,
            last_error_code: row.last_error_code,
            last_error_message: row.last_error_message,
            decline_type,
            next_retry_at: Timestamp::from_datetime(row.next_retry_at),
            last_attempt_at: row.last_attempt_at.map(Timestamp::from_datetime),
            transaction_id: row.transaction_id.map(TransactionId::from_uuid),
            processor_used: row.processor_used,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            resolved_at: row.resolved_at.map(Timestamp::from_datetime),
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, subscription_id, attempt, max_attempts, status,
           last_error_code, last_error_message, decline_type,
           next_retry_at, last_attempt_at, transaction_id, processor_used,
           created_at, updated_at, resolved_at
    FROM retry_queue
"#;

#[async_trait]
impl RetryQueue for PostgresRetryQueue {
    async fn open(&self, entry: &RetryEntry) -> Result<RetryEntry, DomainError> {
        // Conflict target matches the partial unique index over active
        // rows; an existing active track absorbs the new error instead
        // of spawning a second one.
        let row: RetryRow = sqlx::query_as(
            r#"
            INSERT INTO retry_queue (
                id, subscription_id, attempt, max_attempts, status,
                last_error_code, last_error_message, decline_type,
                next_retry_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (subscription_id) WHERE status IN ('pending', 'processing')
            DO UPDATE SET
                last_error_code = EXCLUDED.last_error_code,
                last_error_message = EXCLUDED.last_error_message,
                updated_at = EXCLUDED.updated_at
            RETURNING id, subscription_id, attempt, max_attempts, status,
                      last_error_code, last_error_message, decline_type,
                      next_retry_at, last_attempt_at, transaction_id, processor_used,
                      created_at, updated_at, resolved_at
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.subscription_id.as_uuid())
        .bind(entry.attempt as i32)
        .bind(entry.max_attempts as i32)
        .bind(entry.status.as_str())
        .bind(&entry.last_error_code)
        .bind(&entry.last_error_message)
        .bind(entry.decline_type.map(|d| d.as_str()))
        .bind(entry.next_retry_at.as_datetime())
        .bind(entry.created_at.as_datetime())
        .bind(entry.updated_at.as_datetime())
        .fetch_one(&self.pool)
        .await?;

        RetryEntry::try_from(row)
    }

    async fn due(&self, now: Timestamp, limit: u32) -> Result<Vec<RetryEntry>, DomainError> {
        let rows: Vec<RetryRow> = sqlx::query_as(&format!(
            r#"{SELECT_COLUMNS}
            WHERE status = 'pending' AND next_retry_at <= $1
            ORDER BY next_retry_at ASC
            LIMIT $2
            "#
        ))
        .bind(now.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RetryEntry::try_from).collect()
    }

    async fn find_by_id(&self, id: &RetryId) -> Result<Option<RetryEntry>, DomainError> {
        let row: Option<RetryRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(RetryEntry::try_from).transpose()
    }

    async fn active_for(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<RetryEntry>, DomainError> {
        let row: Option<RetryRow> = sqlx::query_as(&format!(
            r#"{SELECT_COLUMNS}
            WHERE subscription_id = $1 AND status IN ('pending', 'processing')
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(subscription_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(RetryEntry::try_from).transpose()
    }

    async fn list(
        &self,
        status: Option<RetryStatus>,
        limit: u32,
    ) -> Result<Vec<RetryEntry>, DomainError> {
        let rows: Vec<RetryRow> = match status {
            Some(status) => {
                sqlx::query_as(&format!(
                    "{SELECT_COLUMNS} WHERE status = $1 ORDER BY next_retry_at ASC LIMIT $2"
                ))
                .bind(status.as_str())
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "{SELECT_COLUMNS} ORDER BY next_retry_at ASC LIMIT $1"
                ))
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(RetryEntry::try_from).collect()
    }

    async fn mark_processing(&self, id: &RetryId) -> Result<(), DomainError> {
        sqlx::query(
            "UPDATE retry_queue SET status = 'processing', updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn resolve(
        &self,
        id: &RetryId,
        resolution: &RetryResolution,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        match resolution {
            RetryResolution::Succeeded {
                transaction_id,
                processor_used,
            } => {
                sqlx::query(
                    r#"
                    UPDATE retry_queue
                    SET status = 'succeeded', last_attempt_at = $1, transaction_id = $2,
                        processor_used = $3, updated_at = $1, resolved_at = $1
                    WHERE id = $4
                    "#,
                )
                .bind(at.as_datetime())
                .bind(transaction_id.map(|id| *id.as_uuid()))
                .bind(processor_used)
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await?;
            }
            RetryResolution::Rescheduled {
                attempt,
                next_retry_at,
                error_code,
                error_message,
            } => {
                sqlx::query(
                    r#"
                    UPDATE retry_queue
                    SET status = 'pending', attempt = $1, last_attempt_at = $2,
                        last_error_code = $3, last_error_message = $4,
                        decline_type = 'soft', next_retry_at = $5, updated_at = $2
                    WHERE id = $6
                    "#,
                )
                .bind(*attempt as i32)
                .bind(at.as_datetime())
                .bind(error_code)
                .bind(error_message)
                .bind(next_retry_at.as_datetime())
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await?;
            }
            RetryResolution::FailedHard {
                attempt,
                error_code,
                error_message,
            } => {
                sqlx::query(
                    r#"
                    UPDATE retry_queue
                    SET status = 'failed', attempt = $1, last_attempt_at = $2,
                        last_error_code = $3, last_error_message = $4,
                        decline_type = 'hard', updated_at = $2, resolved_at = $2
                    WHERE id = $5
                    "#,
                )
                .bind(*attempt as i32)
                .bind(at.as_datetime())
                .bind(error_code)
                .bind(error_message)
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await?;
            }
            RetryResolution::Exhausted {
                attempt,
                error_code,
                error_message,
            } => {
                sqlx::query(
                    r#"
                    UPDATE retry_queue
                    SET status = 'exhausted', attempt = $1, last_attempt_at = $2,
                        last_error_code = $3, last_error_message = $4,
                        updated_at = $2, resolved_at = $2
                    WHERE id = $5
                    "#,
                )
                .bind(*attempt as i32)
                .bind(at.as_datetime())
                .bind(error_code)
                .bind(error_message)
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    async fn cancel(&self, id: &RetryId, at: Timestamp) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE retry_queue
            SET status = 'canceled', updated_at = $1, resolved_at = $1
            WHERE id = $2 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(at.as_datetime())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn close_active_as_failed(
        &self,
        subscription_id: &SubscriptionId,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE retry_queue
            SET status = 'failed', decline_type = 'hard', updated_at = $1, resolved_at = $1
            WHERE subscription_id = $2 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(at.as_datetime())
        .bind(subscription_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn stats(&self) -> Result<RetryQueueStats, DomainError> {
        let row: (i64, i64, i64, i64, i64, i64, f64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending'),
                COUNT(*) FILTER (WHERE status = 'processing'),
                COUNT(*) FILTER (WHERE status = 'succeeded'),
                COUNT(*) FILTER (WHERE status = 'failed'),
                COUNT(*) FILTER (WHERE status = 'canceled'),
                COUNT(*) FILTER (WHERE status = 'exhausted'),
                COALESCE(CAST(AVG(attempt) FILTER (
                    WHERE status IN ('succeeded', 'failed', 'exhausted')
                ) AS DOUBLE PRECISION), 0)
            FROM retry_queue
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let (pending, processing, succeeded, failed, canceled, exhausted, avg_attempts) = row;
        let resolved = succeeded + failed + exhausted;
        let success_rate = if resolved > 0 {
            succeeded as f64 / resolved as f64 * 100.0
        } else {
            0.0
        };

        Ok(RetryQueueStats {
            total_pending: pending,
            total_processing: processing,
            total_succeeded: succeeded,
            total_failed: failed,
            total_canceled: canceled,
            total_exhausted: exhausted,
            success_rate,
            avg_attempts,
        })
    }
}
