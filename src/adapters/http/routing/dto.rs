//! Request/response DTOs for rule engine endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::domain::routing::{Alternative, Evaluation, RoutingRequest, RoutingRule};

/// Body of `POST /bpas/evaluate`.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub marketplace: Option<String>,
    #[serde(default)]
    pub user_tier: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl EvaluateRequest {
    /// Converts to the domain routing context; currency defaults to USD.
    pub fn into_routing_request(self) -> RoutingRequest {
        RoutingRequest {
            amount_minor: (self.amount * 100.0).round() as i64,
            currency: self.currency.unwrap_or_else(|| "USD".to_string()),
            marketplace: self.marketplace,
            user_tier: self.user_tier,
            user_id: self.user_id,
            client_id: self.client_id,
        }
    }
}

/// Body of evaluate responses.
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub success: bool,
    pub target_processor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_matched: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_priority: Option<i32>,
    pub confidence: f64,
    pub alternatives: Vec<Alternative>,
    pub evaluation_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl EvaluateResponse {
    pub fn from_evaluation(evaluation: Evaluation, evaluation_time_ms: f64) -> Self {
        Self {
            success: true,
            target_processor: evaluation.target_processor,
            rule_matched: evaluation.rule_matched,
            rule_priority: evaluation.rule_priority,
            confidence: evaluation.confidence,
            alternatives: evaluation.alternatives,
            evaluation_time_ms,
            error_message: None,
        }
    }
}

/// Body of `GET /bpas/rules`.
#[derive(Debug, Serialize)]
pub struct RulesListResponse {
    pub rules: Vec<RoutingRule>,
    pub total_rules: usize,
    pub active_rules: usize,
    pub last_reload: Timestamp,
}

/// Body of `PUT /bpas/rules/{name}` responses.
#[derive(Debug, Serialize)]
pub struct RuleUpdateResponse {
    pub success: bool,
    pub message: &'static str,
    pub rule: RoutingRule,
    pub timestamp: Timestamp,
}

/// Body of `POST /bpas/reload` responses.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub message: &'static str,
    pub rules_loaded: usize,
    pub reload_count: u64,
    pub timestamp: Timestamp,
}

/// Query string of `GET /bpas/test`.
#[derive(Debug, Deserialize)]
pub struct TestQuery {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub marketplace: Option<String>,
}
