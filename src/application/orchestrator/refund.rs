//! Refund command handler.
//!
//! Refunds always route to the processor that authorized the original
//! charge; re-routing a refund is not allowed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, TransactionId};
use crate::domain::payment::{OrchestrationEvent, Transaction};
use crate::ports::{
    EventPublisher, ProcessorClient, ProcessorRefundRequest, TransactionRepository,
};

/// Input to the refund path.
#[derive(Debug, Clone)]
pub struct RefundCommand {
    /// Server transaction id of the original charge.
    pub transaction_id: TransactionId,
    pub amount_minor: i64,
    pub reason: String,
}

/// Outcome of a processed refund.
#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub success: bool,
    /// Server id of the new refund transaction.
    pub refund_id: TransactionId,
    /// The original charge's server id.
    pub transaction_id: TransactionId,
    pub amount_minor: i64,
    pub currency: String,
    pub processor_used: String,
    pub message: String,
}

/// Command handler for `POST /orchestrator/refund`.
pub struct ProcessRefundHandler {
    transactions: Arc<dyn TransactionRepository>,
    processors: HashMap<String, Arc<dyn ProcessorClient>>,
    events: Arc<dyn EventPublisher>,
}

impl ProcessRefundHandler {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        processors: HashMap<String, Arc<dyn ProcessorClient>>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            transactions,
            processors,
            events,
        }
    }

    /// Run the refund path for one command.
    pub async fn handle(&self, command: RefundCommand) -> Result<RefundReceipt, DomainError> {
        if command.amount_minor <= 0 {
            return Err(DomainError::new(
                ErrorCode::InvalidRefundAmount,
                "Refund amount must be positive",
            ));
        }

        let original = self
            .transactions
            .find_by_id(&command.transaction_id)
            .await?
            .ok_or_else(|| DomainError::transaction_not_found(command.transaction_id))?;

        if command.amount_minor > original.amount_minor {
            return Err(DomainError::new(
                ErrorCode::InvalidRefundAmount,
                "Refund amount exceeds original transaction",
            ));
        }

        let client = self
            .processors
            .get(&original.processor_used)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::UnknownProcessor,
                    format!("Unknown processor: {}", original.processor_used),
                )
            })?;

        // The processor-side id can be blank when a prior failed insert
        // hit the idempotency conflict path. Never synthesized.
        let processor_transaction_id = original
            .processor_transaction_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::MissingProcessorTransactionId,
                    "Original processor transaction ID missing",
                )
            })?;

        let response = client
            .refund(ProcessorRefundRequest {
                original_transaction_id: processor_transaction_id,
                amount_minor: command.amount_minor,
                reason: command.reason.clone(),
            })
            .await
            .map_err(|err| {
                tracing::error!(
                    transaction_id = %command.transaction_id,
                    processor = %original.processor_used,
                    error = %err,
                    "Refund call failed"
                );
                DomainError::new(ErrorCode::InternalError, "Refund processing failed")
            })?;

        if !response.success {
            self.emit(OrchestrationEvent::RefundProcessed {
                refund_id: command.transaction_id,
                original_transaction_id: command.transaction_id,
                amount_minor: command.amount_minor,
                currency: original.currency.clone(),
                processor_used: original.processor_used.clone(),
                success: false,
                occurred_at: Timestamp::now(),
            })
            .await;
            return Err(DomainError::new(
                ErrorCode::InternalError,
                response
                    .error_message
                    .unwrap_or_else(|| "Refund declined by processor".to_string()),
            ));
        }

        let refund = Transaction::refund_of(&original, command.amount_minor, response.refund_id);
        if let Err(err) = self.transactions.insert(&refund).await {
            tracing::error!(
                refund_id = %refund.id,
                error = %err,
                "Failed to persist refund transaction"
            );
        }

        self.emit(OrchestrationEvent::RefundProcessed {
            refund_id: refund.id,
            original_transaction_id: original.id,
            amount_minor: command.amount_minor,
            currency: original.currency.clone(),
            processor_used: original.processor_used.clone(),
            success: true,
            occurred_at: Timestamp::now(),
        })
        .await;

        Ok(RefundReceipt {
            success: true,
            refund_id: refund.id,
            transaction_id: original.id,
            amount_minor: command.amount_minor,
            currency: original.currency,
            processor_used: refund.processor_used,
            message: "Refund processed successfully".to_string(),
        })
    }

    async fn emit(&self, event: OrchestrationEvent) {
        if let Err(err) = self.events.publish(event).await {
            tracing::warn!(error = %err, "Failed to publish orchestration event");
        }
    }
}
