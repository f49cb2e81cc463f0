//! Routing authority port - who decides which processor takes a charge.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::routing::{ProcessorRoute, RoutingRequest};

/// Port the orchestrator consults for a primary/secondary processor
/// pair. The rule engine implements it in-process; callers must treat
/// failures as recoverable and fall back to
/// [`ProcessorRoute::fallback`].
#[async_trait]
pub trait RoutingAuthority: Send + Sync {
    /// Decide the processor route for one charge.
    async fn route(&self, request: &RoutingRequest) -> Result<ProcessorRoute, DomainError>;
}
