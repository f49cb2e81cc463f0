//! Axum router for orchestrator endpoints.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{admin_stats, health, process_charge, process_refund, OrchestratorAppState};

/// Routes for the charge/refund path plus service health and stats.
///
/// - `POST /orchestrator/charge`
/// - `POST /orchestrator/refund`
/// - `GET  /health`
/// - `GET  /admin/stats`
pub fn orchestrator_router() -> Router<OrchestratorAppState> {
    Router::new()
        .route("/orchestrator/charge", post(process_charge))
        .route("/orchestrator/refund", post(process_refund))
        .route("/health", get(health))
        .route("/admin/stats", get(admin_stats))
}
