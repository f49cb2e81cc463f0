//! HTTP adapter for the rule engine.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::RoutingAppState;
pub use routes::routing_router;
