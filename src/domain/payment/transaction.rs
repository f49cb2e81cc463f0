//! Transaction aggregate - the append-only authoritative payment log.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::{PaymentMethodId, SubscriptionId, Timestamp, TransactionId};

/// Sentinel processor name recorded when no processor accepted a charge.
pub const PROCESSOR_NONE: &str = "none";

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransactionStatus::Pending),
            "success" => Some(TransactionStatus::Success),
            "failed" => Some(TransactionStatus::Failed),
            "refunded" => Some(TransactionStatus::Refunded),
            _ => None,
        }
    }
}

/// Kind of operation the transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Charge,
    Refund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Charge => "charge",
            TransactionType::Refund => "refund",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "charge" => Some(TransactionType::Charge),
            "refund" => Some(TransactionType::Refund),
            _ => None,
        }
    }
}

/// One row of the append-only transaction log.
///
/// Amounts are signed minor units (cents); refunds carry a negative
/// amount and a reference back to the charge they reverse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub subscription_id: Option<SubscriptionId>,
    pub payment_method_id: Option<PaymentMethodId>,
    /// Processor that handled the operation, or [`PROCESSOR_NONE`].
    pub processor_used: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub transaction_type: TransactionType,
    /// Globally unique; the durable idempotency backstop.
    pub idempotency_key: String,
    /// The processor's own transaction id, when one was issued.
    pub processor_transaction_id: Option<String>,
    /// For refunds, the server id of the charge being reversed.
    pub original_transaction_id: Option<TransactionId>,
    pub error_code: Option<String>,
    pub user_message: Option<String>,
    pub created_at: Timestamp,
}

impl Transaction {
    /// Builds the log row for a completed charge attempt.
    #[allow(clippy::too_many_arguments)]
    pub fn charge(
        id: TransactionId,
        subscription_id: Option<SubscriptionId>,
        payment_method_id: Option<PaymentMethodId>,
        processor_used: impl Into<String>,
        amount_minor: i64,
        currency: impl Into<String>,
        success: bool,
        idempotency_key: impl Into<String>,
        processor_transaction_id: Option<String>,
        error_code: Option<String>,
        user_message: Option<String>,
    ) -> Self {
        Self {
            id,
            subscription_id,
            payment_method_id,
            processor_used: processor_used.into(),
            amount_minor,
            currency: currency.into(),
            status: if success {
                TransactionStatus::Success
            } else {
                TransactionStatus::Failed
            },
            transaction_type: TransactionType::Charge,
            idempotency_key: idempotency_key.into(),
            processor_transaction_id,
            original_transaction_id: None,
            error_code,
            user_message,
            created_at: Timestamp::now(),
        }
    }

    /// Builds the log row for a processed refund against `original`.
    ///
    /// The refund is pinned to the original's processor and recorded
    /// with a negated amount and a synthetic idempotency key.
    pub fn refund_of(original: &Transaction, amount_minor: i64, refund_id: Option<String>) -> Self {
        Self {
            id: TransactionId::new(),
            subscription_id: original.subscription_id,
            payment_method_id: original.payment_method_id,
            processor_used: original.processor_used.clone(),
            amount_minor: -amount_minor,
            currency: original.currency.clone(),
            status: TransactionStatus::Refunded,
            transaction_type: TransactionType::Refund,
            idempotency_key: format!("refund_{}", Uuid::new_v4()),
            processor_transaction_id: refund_id,
            original_transaction_id: Some(original.id),
            error_code: None,
            user_message: None,
            created_at: Timestamp::now(),
        }
    }

    /// Whether this transaction represents a settled, successful charge.
    pub fn is_successful_charge(&self) -> bool {
        self.transaction_type == TransactionType::Charge
            && self.status == TransactionStatus::Success
    }
}

/// Rolled-up transaction figures for the trailing 24 hours.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionStats {
    pub total_transactions: i64,
    pub successful: i64,
    pub failed: i64,
    pub success_rate: f64,
    pub total_volume_minor: i64,
    pub avg_transaction_size_minor: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_charge() -> Transaction {
        Transaction::charge(
            TransactionId::new(),
            Some(SubscriptionId::new()),
            Some(PaymentMethodId::new()),
            "processor_a",
            2900,
            "USD",
            true,
            "k-1",
            Some("pa_txn_1".to_string()),
            None,
            None,
        )
    }

    #[test]
    fn successful_charge_has_success_status() {
        let tx = sample_charge();
        assert_eq!(tx.status, TransactionStatus::Success);
        assert_eq!(tx.transaction_type, TransactionType::Charge);
        assert!(tx.is_successful_charge());
    }

    #[test]
    fn refund_negates_amount_and_links_original() {
        let original = sample_charge();
        let refund = Transaction::refund_of(&original, 100, Some("pa_ref_1".to_string()));

        assert_eq!(refund.amount_minor, -100);
        assert_eq!(refund.status, TransactionStatus::Refunded);
        assert_eq!(refund.transaction_type, TransactionType::Refund);
        assert_eq!(refund.original_transaction_id, Some(original.id));
        assert_eq!(refund.processor_used, original.processor_used);
        assert!(refund.idempotency_key.starts_with("refund_"));
        assert_ne!(refund.idempotency_key, original.idempotency_key);
    }

    #[test]
    fn status_round_trips() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Success,
            TransactionStatus::Failed,
            TransactionStatus::Refunded,
        ] {
            assert_eq!(TransactionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TransactionStatus::parse("void"), None);
    }
}
