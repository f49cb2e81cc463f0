//! HTTP handlers for rule engine endpoints.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crate::application::routing::RuleEngine;
use crate::domain::foundation::Timestamp;
use crate::domain::routing::RoutingRule;

use super::super::error::{ApiError, ErrorResponse};
use super::dto::{
    EvaluateRequest, EvaluateResponse, ReloadResponse, RuleUpdateResponse, RulesListResponse,
    TestQuery,
};

/// Shared state for rule engine endpoints.
#[derive(Clone)]
pub struct RoutingAppState {
    pub engine: Arc<RuleEngine>,
}

/// POST /bpas/evaluate
pub async fn evaluate(
    State(state): State<RoutingAppState>,
    Json(request): Json<EvaluateRequest>,
) -> impl IntoResponse {
    if request.amount < 0.0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("VALIDATION_ERROR", "Amount must be positive")),
        )
            .into_response();
    }

    let started = Instant::now();
    let evaluation = state.engine.evaluate(&request.into_routing_request());
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    Json(EvaluateResponse::from_evaluation(evaluation, elapsed_ms)).into_response()
}

/// GET /bpas/rules
pub async fn list_rules(State(state): State<RoutingAppState>) -> Json<RulesListResponse> {
    let snapshot = state.engine.snapshot();
    Json(RulesListResponse {
        rules: snapshot.rules,
        total_rules: snapshot.total_rules,
        active_rules: snapshot.active_rules,
        last_reload: snapshot.last_reload,
    })
}

/// PUT /bpas/rules/:name
pub async fn update_rule(
    State(state): State<RoutingAppState>,
    Path(name): Path<String>,
    Json(rule): Json<RoutingRule>,
) -> Result<Json<RuleUpdateResponse>, ApiError> {
    let updated = state.engine.update_rule(&name, rule)?;
    Ok(Json(RuleUpdateResponse {
        success: true,
        message: "Rule updated successfully",
        rule: updated,
        timestamp: Timestamp::now(),
    }))
}

/// POST /bpas/reload
pub async fn reload(State(state): State<RoutingAppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let rules_loaded = state.engine.reload()?;
    let snapshot = state.engine.snapshot();
    Ok(Json(ReloadResponse {
        success: true,
        message: "Configuration reloaded successfully",
        rules_loaded,
        reload_count: snapshot.reload_count,
        timestamp: Timestamp::now(),
    }))
}

/// GET /bpas/test - rule evaluation without stats mutation.
pub async fn test_rule(
    State(state): State<RoutingAppState>,
    Query(query): Query<TestQuery>,
) -> impl IntoResponse {
    let request = EvaluateRequest {
        amount: query.amount.unwrap_or(100.0),
        currency: query.currency,
        marketplace: query.marketplace,
        user_tier: None,
        user_id: None,
        client_id: None,
    };

    let routing_request = request.into_routing_request();
    let evaluation = state.engine.evaluate_quiet(&routing_request);

    let mut body = json!({
        "test_input": {
            "amount": routing_request.amount_minor as f64 / 100.0,
            "currency": routing_request.currency,
            "marketplace": routing_request.marketplace,
        },
        "result_processor": evaluation.target_processor,
        "confidence": evaluation.confidence,
    });
    if let Some(rule) = evaluation.rule_matched {
        body["matched_rule"] = json!(rule);
        body["rule_priority"] = json!(evaluation.rule_priority);
    }

    Json(body)
}

/// GET /bpas/stats
pub async fn engine_stats(State(state): State<RoutingAppState>) -> impl IntoResponse {
    let stats = state.engine.stats();
    let snapshot = state.engine.snapshot();
    Json(json!({
        "service_name": "rule-engine",
        "stats": stats,
        "total_rules": snapshot.total_rules,
        "reload_count": snapshot.reload_count,
        "last_config_reload": snapshot.last_reload,
        "timestamp": Timestamp::now(),
    }))
}
