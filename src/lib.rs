//! Payrail - Payment Orchestration Control Plane
//!
//! This crate sits between merchant applications and external card
//! processors. It routes each charge through a prioritized rule engine,
//! fails over to a secondary processor on transport failures, guarantees
//! exactly-once semantics per idempotency key, and drives recurring
//! billing with classified soft-decline retries.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
