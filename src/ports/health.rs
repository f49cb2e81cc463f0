//! Dependency health check port.

use async_trait::async_trait;

/// A dependency that can report whether it is reachable.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// True when the dependency answers a liveness probe.
    async fn check(&self) -> bool;
}
