//! Retry queue port - persistent soft-decline retry tracks.
//!
//! The storage layer, not application code, enforces the
//! one-active-entry-per-subscription invariant: `open` must upsert into
//! an existing active row rather than create a duplicate track.

use async_trait::async_trait;

use crate::domain::billing::{RetryEntry, RetryQueueStats, RetryResolution, RetryStatus};
use crate::domain::foundation::{DomainError, RetryId, SubscriptionId, Timestamp};

/// Port for retry queue persistence.
#[async_trait]
pub trait RetryQueue: Send + Sync {
    /// Open a retry track for a subscription, or return the existing
    /// active one if a pending/processing track already exists.
    async fn open(&self, entry: &RetryEntry) -> Result<RetryEntry, DomainError>;

    /// Pending entries whose `next_retry_at` has passed, ordered by
    /// `next_retry_at` ascending.
    async fn due(&self, now: Timestamp, limit: u32) -> Result<Vec<RetryEntry>, DomainError>;

    async fn find_by_id(&self, id: &RetryId) -> Result<Option<RetryEntry>, DomainError>;

    /// The active (pending or processing) entry for a subscription.
    async fn active_for(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<RetryEntry>, DomainError>;

    /// Entries filtered by status, ordered by `next_retry_at`.
    async fn list(
        &self,
        status: Option<RetryStatus>,
        limit: u32,
    ) -> Result<Vec<RetryEntry>, DomainError>;

    /// Claim an entry: pending -> processing.
    async fn mark_processing(&self, id: &RetryId) -> Result<(), DomainError>;

    /// Apply the state machine's resolution after an attempt. Terminal
    /// resolutions set `resolved_at`.
    async fn resolve(
        &self,
        id: &RetryId,
        resolution: &RetryResolution,
        at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Operator cancel: pending/processing -> canceled.
    async fn cancel(&self, id: &RetryId, at: Timestamp) -> Result<(), DomainError>;

    /// Close any active entry for a subscription as failed (used when a
    /// hard decline arrives outside the retry path).
    async fn close_active_as_failed(
        &self,
        subscription_id: &SubscriptionId,
        at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Queue counters and success rate.
    async fn stats(&self) -> Result<RetryQueueStats, DomainError>;
}
