//! PostgreSQL implementation of TransactionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentMethodId, SubscriptionId, Timestamp, TransactionId,
};
use crate::domain::payment::{Transaction, TransactionStats, TransactionStatus, TransactionType};
use crate::ports::TransactionRepository;

/// PostgreSQL implementation of the TransactionRepository port.
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a transaction.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    subscription_id: Option<Uuid>,
    payment_method_id: Option<Uuid>,
    processor_used: String,
    amount_minor: i64,
    currency: String,
    status: String,
    transaction_type: String,
    idempotency_key: String,
    processor_transaction_id: Option<String>,
    original_transaction_id: Option<Uuid>,
    error_code: Option<String>,
    user_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let status = TransactionStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid transaction status: {}", row.status),
            )
        })?;
        let transaction_type = TransactionType::parse(&row.transaction_type).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid transaction type: {}", row.transaction_type),
            )
        })?;

        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
            payment_method_id: row.payment_method_id.map(PaymentMethodId::from_uuid),
            processor_used: row.processor_used,
            amount_minor: row.amount_minor,
            currency: row.currency,
            status,
            transaction_type,
            idempotency_key: row.idempotency_key,
            processor_transaction_id: row.processor_transaction_id,
            original_transaction_id: row.original_transaction_id.map(TransactionId::from_uuid),
            error_code: row.error_code,
            user_message: row.user_message,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, subscription_id, payment_method_id, processor_used,
           amount_minor, currency, status, transaction_type,
           idempotency_key, processor_transaction_id, original_transaction_id,
           error_code, user_message, created_at
    FROM transactions
"#;

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn insert(&self, transaction: &Transaction) -> Result<(), DomainError> {
        // A concurrent insert with the same key becomes a no-op; the
        // subsequent read is authoritative.
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, subscription_id, payment_method_id, processor_used,
                amount_minor, currency, status, transaction_type,
                idempotency_key, processor_transaction_id, original_transaction_id,
                error_code, user_message, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.subscription_id.map(|id| *id.as_uuid()))
        .bind(transaction.payment_method_id.map(|id| *id.as_uuid()))
        .bind(&transaction.processor_used)
        .bind(transaction.amount_minor)
        .bind(&transaction.currency)
        .bind(transaction.status.as_str())
        .bind(transaction.transaction_type.as_str())
        .bind(&transaction.idempotency_key)
        .bind(&transaction.processor_transaction_id)
        .bind(transaction.original_transaction_id.map(|id| *id.as_uuid()))
        .bind(&transaction.error_code)
        .bind(&transaction.user_message)
        .bind(transaction.created_at.as_datetime())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, DomainError> {
        let row: Option<TransactionRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Transaction>, DomainError> {
        let row: Option<TransactionRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE idempotency_key = $1"))
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn stats_last_24h(&self) -> Result<TransactionStats, DomainError> {
        let row: (i64, i64, i64, Option<i64>, Option<i64>) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status = 'success'),
                   COUNT(*) FILTER (WHERE status = 'failed'),
                   CAST(SUM(amount_minor) AS BIGINT),
                   CAST(AVG(amount_minor) AS BIGINT)
            FROM transactions
            WHERE created_at > NOW() - INTERVAL '24 hours'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let (total, successful, failed, volume, avg_size) = row;
        let success_rate = if total > 0 {
            successful as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Ok(TransactionStats {
            total_transactions: total,
            successful,
            failed,
            success_rate,
            total_volume_minor: volume.unwrap_or(0),
            avg_transaction_size_minor: avg_size.unwrap_or(0),
        })
    }
}
