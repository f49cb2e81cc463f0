//! Request/response DTOs for orchestrator endpoints.
//!
//! Amounts cross the API boundary in major units; everything internal
//! is minor units.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::foundation::Timestamp;
use crate::domain::payment::{ChargeReceipt, TransactionStats};

pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn to_major_units(amount_minor: i64) -> f64 {
    amount_minor as f64 / 100.0
}

/// Body of `POST /orchestrator/charge`.
#[derive(Debug, Deserialize)]
pub struct ChargeRequest {
    pub subscription_id: Uuid,
    pub payment_method_id: Uuid,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Body of charge responses (fresh and replayed alike).
#[derive(Debug, Serialize)]
pub struct ChargeResponse {
    pub success: bool,
    pub transaction_id: String,
    pub processor_used: String,
    pub amount: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl From<&ChargeReceipt> for ChargeResponse {
    fn from(receipt: &ChargeReceipt) -> Self {
        Self {
            success: receipt.success,
            transaction_id: receipt.transaction_id.to_string(),
            processor_used: receipt.processor_used.clone(),
            amount: to_major_units(receipt.amount_minor),
            currency: receipt.currency.clone(),
            user_message: receipt.user_message.clone(),
            error_code: receipt.error_code.clone(),
        }
    }
}

/// Body of `POST /orchestrator/refund`.
#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub transaction_id: Uuid,
    pub amount: f64,
    pub reason: String,
}

/// Body of refund responses.
#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub success: bool,
    pub refund_id: String,
    pub transaction_id: String,
    pub amount: f64,
    pub processor_used: String,
    pub message: String,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub service: &'static str,
    pub status: &'static str,
    pub timestamp: Timestamp,
    pub dependencies: BTreeMap<String, &'static str>,
}

/// Body of `GET /admin/stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_transactions: i64,
    pub successful: i64,
    pub failed: i64,
    pub success_rate: f64,
    pub total_volume: f64,
    pub avg_transaction_size: f64,
}

impl From<TransactionStats> for StatsResponse {
    fn from(stats: TransactionStats) -> Self {
        Self {
            total_transactions: stats.total_transactions,
            successful: stats.successful,
            failed: stats.failed,
            success_rate: stats.success_rate,
            total_volume: to_major_units(stats.total_volume_minor),
            avg_transaction_size: to_major_units(stats.avg_transaction_size_minor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversion_round_trips() {
        assert_eq!(to_minor_units(29.00), 2900);
        assert_eq!(to_minor_units(15.01), 1501);
        assert_eq!(to_minor_units(0.01), 1);
        assert_eq!(to_major_units(2900), 29.00);
    }

    #[test]
    fn charge_request_accepts_optional_key() {
        let json = r#"{
            "subscription_id": "4b4d9699-2f6e-4be3-9c1f-25f77e6d9f86",
            "payment_method_id": "8d7a746a-41ab-4f05-93b0-6e27b9ef26d8",
            "amount": 29.0,
            "currency": "USD"
        }"#;
        let request: ChargeRequest = serde_json::from_str(json).unwrap();
        assert!(request.idempotency_key.is_none());
        assert_eq!(request.amount, 29.0);
    }
}
