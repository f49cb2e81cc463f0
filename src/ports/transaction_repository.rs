//! Transaction repository port - the append-only payment log.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TransactionId};
use crate::domain::payment::{Transaction, TransactionStats};

/// Port for the authoritative transaction store.
///
/// `insert` must be idempotent on `idempotency_key`: a concurrent
/// duplicate becomes a no-op and the subsequent read is authoritative.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Append one transaction. A row with the same idempotency key
    /// already present makes this a no-op, not an error.
    async fn insert(&self, transaction: &Transaction) -> Result<(), DomainError>;

    /// Fetch by server transaction id.
    async fn find_by_id(&self, id: &TransactionId) -> Result<Option<Transaction>, DomainError>;

    /// Fetch by idempotency key - the durable replay lookup.
    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Transaction>, DomainError>;

    /// Rolled-up figures for the trailing 24 hours.
    async fn stats_last_24h(&self) -> Result<TransactionStats, DomainError>;
}
