//! In-memory event bus for tests.
//!
//! Captures published events synchronously so assertions can inspect
//! exactly what the orchestrator emitted. Not for production use.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::domain::payment::OrchestrationEvent;
use crate::ports::EventPublisher;

/// Capturing event bus for test assertions.
#[derive(Debug, Default)]
pub struct InMemoryEventBus {
    published: Mutex<Vec<OrchestrationEvent>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// All published events, in order.
    pub fn published_events(&self) -> Vec<OrchestrationEvent> {
        self.published
            .lock()
            .expect("event bus lock poisoned")
            .clone()
    }

    /// Events of one type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<OrchestrationEvent> {
        self.published_events()
            .into_iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Whether at least one event of the type was published.
    pub fn has_event(&self, event_type: &str) -> bool {
        !self.events_of_type(event_type).is_empty()
    }

    /// Count of all published events.
    pub fn event_count(&self) -> usize {
        self.published
            .lock()
            .expect("event bus lock poisoned")
            .len()
    }

    /// Clears captured events (test isolation).
    pub fn clear(&self) {
        self.published
            .lock()
            .expect("event bus lock poisoned")
            .clear();
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: OrchestrationEvent) -> Result<(), DomainError> {
        self.published
            .lock()
            .expect("event bus lock poisoned")
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Timestamp, TransactionId};

    #[tokio::test]
    async fn captures_events_in_order() {
        let bus = InMemoryEventBus::new();
        let id = TransactionId::new();

        bus.publish(OrchestrationEvent::ChargeInitiated {
            transaction_id: id,
            subscription_id: None,
            amount_minor: 100,
            currency: "USD".to_string(),
            occurred_at: Timestamp::now(),
        })
        .await
        .unwrap();

        assert_eq!(bus.event_count(), 1);
        assert!(bus.has_event("charge_initiated"));
        assert!(!bus.has_event("charge_failed"));

        bus.clear();
        assert_eq!(bus.event_count(), 0);
    }
}
