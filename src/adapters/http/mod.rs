//! HTTP adapters - REST API implementations.
//!
//! Each module owns its routes, handlers, and DTOs; all three routers
//! are merged into the single service listener in `main`.

pub mod error;
pub mod orchestrator;
pub mod routing;
pub mod scheduler;

pub use error::{ApiError, ErrorResponse};
pub use orchestrator::{orchestrator_router, OrchestratorAppState};
pub use routing::{routing_router, RoutingAppState};
pub use scheduler::{scheduler_router, SchedulerAppState};
