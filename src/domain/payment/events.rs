//! Orchestration events emitted along the charge and refund paths.
//!
//! Delivery is an adapter concern; the domain only defines the shapes.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SubscriptionId, Timestamp, TransactionId};

/// Event emitted by the orchestrator while processing a charge or refund.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrchestrationEvent {
    ChargeInitiated {
        transaction_id: TransactionId,
        subscription_id: Option<SubscriptionId>,
        amount_minor: i64,
        currency: String,
        occurred_at: Timestamp,
    },
    ChargeSucceeded {
        transaction_id: TransactionId,
        subscription_id: Option<SubscriptionId>,
        amount_minor: i64,
        currency: String,
        processor_used: String,
        duration_ms: u64,
        occurred_at: Timestamp,
    },
    ChargeFailed {
        transaction_id: TransactionId,
        subscription_id: Option<SubscriptionId>,
        amount_minor: i64,
        currency: String,
        processor_used: String,
        error_code: Option<String>,
        user_message: Option<String>,
        occurred_at: Timestamp,
    },
    FailoverTriggered {
        transaction_id: TransactionId,
        from_processor: String,
        to_processor: String,
        amount_minor: i64,
        currency: String,
        occurred_at: Timestamp,
    },
    RefundProcessed {
        refund_id: TransactionId,
        original_transaction_id: TransactionId,
        amount_minor: i64,
        currency: String,
        processor_used: String,
        success: bool,
        occurred_at: Timestamp,
    },
}

impl OrchestrationEvent {
    /// Stable event type string, used for routing and filtering.
    pub fn event_type(&self) -> &'static str {
        match self {
            OrchestrationEvent::ChargeInitiated { .. } => "charge_initiated",
            OrchestrationEvent::ChargeSucceeded { .. } => "charge_succeeded",
            OrchestrationEvent::ChargeFailed { .. } => "charge_failed",
            OrchestrationEvent::FailoverTriggered { .. } => "failover_triggered",
            OrchestrationEvent::RefundProcessed { .. } => "refund_processed",
        }
    }

    /// Server transaction id the event concerns.
    pub fn transaction_id(&self) -> TransactionId {
        match self {
            OrchestrationEvent::ChargeInitiated { transaction_id, .. }
            | OrchestrationEvent::ChargeSucceeded { transaction_id, .. }
            | OrchestrationEvent::ChargeFailed { transaction_id, .. }
            | OrchestrationEvent::FailoverTriggered { transaction_id, .. } => *transaction_id,
            OrchestrationEvent::RefundProcessed { refund_id, .. } => *refund_id,
        }
    }
}
