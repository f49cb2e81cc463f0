//! HTTP adapter for the scheduler.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::SchedulerAppState;
pub use routes::scheduler_router;
