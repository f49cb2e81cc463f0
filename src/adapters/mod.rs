//! Adapters layer: concrete implementations of the ports.

pub mod events;
pub mod http;
pub mod postgres;
pub mod processor;
pub mod redis;

pub use events::{InMemoryEventBus, TracingEventPublisher};
pub use http::{
    orchestrator_router, routing_router, scheduler_router, OrchestratorAppState, RoutingAppState,
    SchedulerAppState,
};
pub use postgres::{
    PostgresHealth, PostgresJobRepository, PostgresPaymentMethodReader, PostgresRetryQueue,
    PostgresSubscriptionStore, PostgresTransactionRepository,
};
pub use processor::HttpProcessorClient;
pub use redis::RedisIdempotencyCache;
