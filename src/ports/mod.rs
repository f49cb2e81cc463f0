//! Ports layer: async traits at every external seam.

mod charge_executor;
mod event_publisher;
mod health;
mod idempotency_cache;
mod job_repository;
mod payment_method_reader;
mod processor_client;
mod retry_queue;
mod routing_authority;
mod subscription_store;
mod transaction_repository;

pub use charge_executor::{ChargeExecutor, ChargeOutcome};
pub use event_publisher::EventPublisher;
pub use health::HealthCheck;
pub use idempotency_cache::IdempotencyCache;
pub use job_repository::{JobCompletion, JobRepository};
pub use payment_method_reader::PaymentMethodReader;
pub use processor_client::{
    ProcessorChargeRequest, ProcessorChargeResponse, ProcessorClient, ProcessorError,
    ProcessorRefundRequest, ProcessorRefundResponse,
};
pub use retry_queue::RetryQueue;
pub use routing_authority::RoutingAuthority;
pub use subscription_store::SubscriptionStore;
pub use transaction_repository::TransactionRepository;
