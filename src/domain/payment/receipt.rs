//! Charge receipt - the canonical outcome of one charge request.
//!
//! The receipt is what callers see, what the idempotency cache stores,
//! and what a replayed request returns verbatim.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::TransactionId;
use crate::domain::payment::transaction::{Transaction, PROCESSOR_NONE};
use crate::domain::payment::messages::PROCESSORS_UNAVAILABLE_MESSAGE;

/// Outcome of a charge request, keyed by the server transaction id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub success: bool,
    pub transaction_id: TransactionId,
    pub processor_used: String,
    pub amount_minor: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
}

impl ChargeReceipt {
    /// Receipt synthesized when both processors failed at transport level.
    pub fn processors_unavailable(
        transaction_id: TransactionId,
        amount_minor: i64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            transaction_id,
            processor_used: PROCESSOR_NONE.to_string(),
            amount_minor,
            currency: currency.into(),
            error_code: Some("PROCESSORS_UNAVAILABLE".to_string()),
            user_message: Some(PROCESSORS_UNAVAILABLE_MESSAGE.to_string()),
        }
    }

    /// Rebuilds the receipt a past request produced, from its stored
    /// transaction row.
    pub fn from_transaction(tx: &Transaction) -> Self {
        Self {
            success: tx.is_successful_charge(),
            transaction_id: tx.id,
            processor_used: tx.processor_used.clone(),
            amount_minor: tx.amount_minor,
            currency: tx.currency.clone(),
            error_code: tx.error_code.clone(),
            user_message: tx.user_message.clone(),
        }
    }
}
