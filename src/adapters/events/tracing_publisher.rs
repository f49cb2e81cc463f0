//! Event publisher that emits structured log records.
//!
//! The delivery channel for orchestration events is external to this
//! service; in its absence events still land in the structured log
//! where downstream collectors can pick them up.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::payment::OrchestrationEvent;
use crate::ports::EventPublisher;

/// Publishes orchestration events as `tracing` records.
#[derive(Debug, Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: OrchestrationEvent) -> Result<(), DomainError> {
        tracing::info!(
            event_type = event.event_type(),
            transaction_id = %event.transaction_id(),
            payload = %serde_json::to_string(&event).unwrap_or_default(),
            "orchestration event"
        );
        Ok(())
    }
}
