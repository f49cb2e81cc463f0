//! Redis adapters.

mod idempotency_cache;

pub use idempotency_cache::RedisIdempotencyCache;
