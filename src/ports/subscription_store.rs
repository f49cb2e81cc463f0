//! Subscription store port - the scheduler's due-set source.

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp};

/// Port for subscription queries and the few status writes the
/// scheduler performs. Plan/subscription CRUD lives elsewhere.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Subscriptions due for billing: active, `next_billing_date <= now`,
    /// not flagged cancel-at-period-end; ordered by due date ascending.
    async fn due_for_billing(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<Subscription>, DomainError>;

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Mark a subscription past_due after a hard decline.
    async fn mark_past_due(&self, id: &SubscriptionId) -> Result<(), DomainError>;
}
