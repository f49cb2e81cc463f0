//! Error types for the domain layer.

use std::collections::HashMap;
use std::fmt;

/// Error codes organized by category. The string form of each code is
/// stable and surfaced to API consumers unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Input errors
    InvalidRequest,
    ValidationFailed,
    InvalidRefundAmount,

    // Not found errors
    PaymentMethodNotFound,
    SubscriptionNotFound,
    TransactionNotFound,
    JobNotFound,
    RetryNotFound,
    RuleNotFound,

    // State errors
    MissingProcessorTransactionId,
    InvalidRetryStatus,
    MissingPaymentToken,

    // Orchestration errors
    ProcessorsUnavailable,
    UnknownProcessor,

    // Infrastructure errors
    DatabaseError,
    CacheError,
    ConfigError,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::ValidationFailed => "VALIDATION_ERROR",
            ErrorCode::InvalidRefundAmount => "INVALID_REFUND_AMOUNT",
            ErrorCode::PaymentMethodNotFound => "PAYMENT_METHOD_NOT_FOUND",
            ErrorCode::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            ErrorCode::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            ErrorCode::JobNotFound => "JOB_NOT_FOUND",
            ErrorCode::RetryNotFound => "RETRY_NOT_FOUND",
            ErrorCode::RuleNotFound => "RULE_NOT_FOUND",
            ErrorCode::MissingProcessorTransactionId => "MISSING_PROCESSOR_TRANSACTION_ID",
            ErrorCode::InvalidRetryStatus => "INVALID_RETRY_STATUS",
            ErrorCode::MissingPaymentToken => "MISSING_PAYMENT_TOKEN",
            ErrorCode::ProcessorsUnavailable => "PROCESSORS_UNAVAILABLE",
            ErrorCode::UnknownProcessor => "UNKNOWN_PROCESSOR",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::CacheError => "CACHE_ERROR",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message).with_detail("field", field)
    }

    /// Creates a not-found error for a transaction.
    pub fn transaction_not_found(id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::TransactionNotFound,
            format!("Transaction {} not found", id),
        )
    }

    /// Creates a not-found error for a payment method.
    pub fn payment_method_not_found(id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::PaymentMethodNotFound,
            format!("Payment method {} not found", id),
        )
    }

    /// Creates a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Creates a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CacheError, message)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for DomainError {}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => {
                DomainError::new(ErrorCode::DatabaseError, "Row not found")
            }
            other => DomainError::database(other.to_string()),
        }
    }
}
