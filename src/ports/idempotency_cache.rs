//! Idempotency cache port - short-lived replay of charge responses.
//!
//! The cache is the fast path; the `transactions.idempotency_key`
//! uniqueness constraint is the durable backstop. A cache failure must
//! degrade to a DB lookup, never fail the charge.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::DomainError;
use crate::domain::payment::ChargeReceipt;

/// Port for the idempotency response cache.
#[async_trait]
pub trait IdempotencyCache: Send + Sync {
    /// Stored receipt for a key, if any.
    async fn get(&self, key: &str) -> Result<Option<ChargeReceipt>, DomainError>;

    /// Store a receipt under a key with the given TTL.
    async fn put(
        &self,
        key: &str,
        receipt: &ChargeReceipt,
        ttl: Duration,
    ) -> Result<(), DomainError>;
}
