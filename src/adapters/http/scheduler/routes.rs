//! Axum router for scheduler endpoints.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    cancel_retry, get_job, get_retry, list_jobs, list_retries, retry_now, retry_stats, status,
    trigger, SchedulerAppState,
};

/// Routes for scheduler control and inspection.
///
/// - `GET  /scheduler/status`
/// - `POST /scheduler/trigger`
/// - `GET  /scheduler/jobs`
/// - `GET  /scheduler/jobs/:id`
/// - `GET  /scheduler/retries`
/// - `GET  /scheduler/retries/:id`
/// - `POST /scheduler/retries/:id/retry-now`
/// - `POST /scheduler/retries/:id/cancel`
/// - `GET  /scheduler/stats`
pub fn scheduler_router() -> Router<SchedulerAppState> {
    Router::new()
        .route("/scheduler/status", get(status))
        .route("/scheduler/trigger", post(trigger))
        .route("/scheduler/jobs", get(list_jobs))
        .route("/scheduler/jobs/:id", get(get_job))
        .route("/scheduler/retries", get(list_retries))
        .route("/scheduler/retries/:id", get(get_retry))
        .route("/scheduler/retries/:id/retry-now", post(retry_now))
        .route("/scheduler/retries/:id/cancel", post(cancel_retry))
        .route("/scheduler/stats", get(retry_stats))
}
