//! Event publisher port - fan-out of orchestration events.
//!
//! Delivery is best-effort; the charge path never fails because an
//! event could not be published.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::payment::OrchestrationEvent;

/// Port for publishing orchestration events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: OrchestrationEvent) -> Result<(), DomainError>;
}
