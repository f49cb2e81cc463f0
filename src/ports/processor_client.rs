//! Processor client port for upstream card processors.
//!
//! One implementation instance exists per processor. The port splits
//! failures into three kinds because the orchestrator treats them
//! differently:
//!
//! - a **decline** is a successful call with `success: false` - a
//!   business answer, final for the attempt;
//! - a **transport** error (5xx, timeout, connection failure) is
//!   failover-eligible and marks the processor unhealthy;
//! - a **fatal** error (other 4xx) fails the attempt without failover.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Port for a single upstream processor.
#[async_trait]
pub trait ProcessorClient: Send + Sync {
    /// Stable processor name (e.g. `processor_a`).
    fn name(&self) -> &str;

    /// Authorize and capture a charge.
    ///
    /// The processor dedupes on `idempotency_key`; this client does not.
    async fn charge(
        &self,
        request: ProcessorChargeRequest,
    ) -> Result<ProcessorChargeResponse, ProcessorError>;

    /// Return funds from a prior charge.
    async fn refund(
        &self,
        request: ProcessorRefundRequest,
    ) -> Result<ProcessorRefundResponse, ProcessorError>;

    /// Advisory health bit, consulted before each call.
    fn is_healthy(&self) -> bool;
}

/// Charge request forwarded to a processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorChargeRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub token: String,
    pub idempotency_key: String,
}

/// Processor's answer to a charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorChargeResponse {
    pub success: bool,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub auth_code: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Refund request forwarded to a processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorRefundRequest {
    /// The processor's own transaction id for the original charge.
    pub original_transaction_id: String,
    pub amount_minor: i64,
    pub reason: String,
}

/// Processor's answer to a refund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorRefundResponse {
    pub success: bool,
    #[serde(default)]
    pub refund_id: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Failures from processor calls.
#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    /// Network error, timeout, or retryable HTTP status
    /// (408/429/500/502/503/504). Failover-eligible.
    #[error("processor {processor} transport failure: {message}")]
    Transport { processor: String, message: String },

    /// Non-retryable HTTP status outside the decline path.
    #[error("processor {processor} returned status {status}: {message}")]
    Fatal {
        processor: String,
        status: u16,
        message: String,
    },

    /// The health bit was false; the call was not attempted.
    #[error("processor {processor} is unhealthy")]
    Unhealthy { processor: String },
}

impl ProcessorError {
    /// Whether the orchestrator may try the secondary processor.
    pub fn is_failover_eligible(&self) -> bool {
        matches!(
            self,
            ProcessorError::Transport { .. } | ProcessorError::Unhealthy { .. }
        )
    }

    /// Name of the processor that produced the error.
    pub fn processor(&self) -> &str {
        match self {
            ProcessorError::Transport { processor, .. }
            | ProcessorError::Fatal { processor, .. }
            | ProcessorError::Unhealthy { processor } => processor,
        }
    }
}
