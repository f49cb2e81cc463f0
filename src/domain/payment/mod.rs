//! Payment domain: transactions, payment methods, decline taxonomy.

mod decline;
mod events;
mod messages;
mod payment_method;
mod receipt;
mod transaction;

pub use decline::{classify_decline, DeclineType};
pub use events::OrchestrationEvent;
pub use messages::{user_message_for, PROCESSORS_UNAVAILABLE_MESSAGE};
pub use payment_method::{PaymentMethod, TokenKind};
pub use receipt::ChargeReceipt;
pub use transaction::{
    Transaction, TransactionStats, TransactionStatus, TransactionType, PROCESSOR_NONE,
};
