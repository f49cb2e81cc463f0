//! Charge executor port - the scheduler's view of the charge path.
//!
//! The scheduler never talks to processors directly; it bills through
//! the same contract the synchronous charge endpoint uses. Errors are
//! folded into the outcome so batch processing never aborts midway.

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::TransactionId;

/// Outcome of one merchant-initiated charge.
#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    pub success: bool,
    pub transaction_id: Option<TransactionId>,
    pub processor_used: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl ChargeOutcome {
    /// Outcome for an orchestration failure before any processor
    /// answered. Classified soft so the scheduler retries.
    pub fn orchestrator_error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            transaction_id: None,
            processor_used: None,
            error_code: Some("ORCHESTRATOR_ERROR".to_string()),
            error_message: Some(message.into()),
        }
    }
}

/// Port for issuing a recurring charge against a subscription.
#[async_trait]
pub trait ChargeExecutor: Send + Sync {
    /// Charge the subscription's stored payment method for its
    /// configured amount.
    async fn charge_subscription(&self, subscription: &Subscription) -> ChargeOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_executor_is_object_safe() {
        fn _accepts_dyn(_executor: &dyn ChargeExecutor) {}
    }

    #[test]
    fn orchestrator_error_is_soft_coded() {
        let outcome = ChargeOutcome::orchestrator_error("routing blew up");
        assert!(!outcome.success);
        assert_eq!(outcome.error_code.as_deref(), Some("ORCHESTRATOR_ERROR"));
    }
}
