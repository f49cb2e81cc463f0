//! Orchestrator command handlers: the charge and refund paths.

mod charge;
mod refund;

pub use charge::{ChargeCommand, ChargeConclusion, ProcessChargeHandler};
pub use refund::{ProcessRefundHandler, RefundCommand, RefundReceipt};
