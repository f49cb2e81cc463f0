//! Axum router for rule engine endpoints.

use axum::routing::{get, post, put};
use axum::Router;

use super::handlers::{
    engine_stats, evaluate, list_rules, reload, test_rule, update_rule, RoutingAppState,
};

/// Routes for routing evaluation and rule administration.
///
/// - `POST /bpas/evaluate`
/// - `GET  /bpas/rules`
/// - `PUT  /bpas/rules/:name`
/// - `POST /bpas/reload`
/// - `GET  /bpas/test`
/// - `GET  /bpas/stats`
pub fn routing_router() -> Router<RoutingAppState> {
    Router::new()
        .route("/bpas/evaluate", post(evaluate))
        .route("/bpas/rules", get(list_rules))
        .route("/bpas/rules/:name", put(update_rule))
        .route("/bpas/reload", post(reload))
        .route("/bpas/test", get(test_rule))
        .route("/bpas/stats", get(engine_stats))
}
