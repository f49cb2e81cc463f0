//! HTTP handlers for orchestrator endpoints.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::orchestrator::{
    ChargeCommand, ProcessChargeHandler, ProcessRefundHandler, RefundCommand,
};
use crate::domain::foundation::{PaymentMethodId, SubscriptionId, Timestamp, TransactionId};
use crate::ports::{HealthCheck, ProcessorClient, TransactionRepository};

use super::super::error::ApiError;
use super::dto::{
    to_minor_units, ChargeRequest, ChargeResponse, HealthResponse, RefundRequest, RefundResponse,
    StatsResponse,
};

/// Marker header set on idempotent replays.
pub const IDEMPOTENT_REPLAY_HEADER: &str = "x-idempotent-replay";

/// Shared state for orchestrator endpoints.
#[derive(Clone)]
pub struct OrchestratorAppState {
    pub charge: Arc<ProcessChargeHandler>,
    pub refund: Arc<ProcessRefundHandler>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub processors: HashMap<String, Arc<dyn ProcessorClient>>,
    /// Named dependency probes reported by `/health`.
    pub dependencies: Vec<(&'static str, Arc<dyn HealthCheck>)>,
}

/// POST /orchestrator/charge
///
/// 201 on success, 402 on decline, 400 malformed, 404 missing payment
/// method. Replays return 200 with `X-Idempotent-Replay: true`.
pub async fn process_charge(
    State(state): State<OrchestratorAppState>,
    Json(request): Json<ChargeRequest>,
) -> Result<Response, ApiError> {
    let command = ChargeCommand {
        subscription_id: Some(SubscriptionId::from_uuid(request.subscription_id)),
        payment_method_id: PaymentMethodId::from_uuid(request.payment_method_id),
        amount_minor: to_minor_units(request.amount),
        currency: request.currency,
        idempotency_key: request.idempotency_key,
    };

    let conclusion = state.charge.handle(command).await?;
    let body = ChargeResponse::from(&conclusion.receipt);

    let response = if conclusion.replayed {
        (
            StatusCode::OK,
            [(IDEMPOTENT_REPLAY_HEADER, "true")],
            Json(body),
        )
            .into_response()
    } else if conclusion.receipt.success {
        (StatusCode::CREATED, Json(body)).into_response()
    } else {
        (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response()
    };

    Ok(response)
}

/// POST /orchestrator/refund
pub async fn process_refund(
    State(state): State<OrchestratorAppState>,
    Json(request): Json<RefundRequest>,
) -> Result<Json<RefundResponse>, ApiError> {
    let command = RefundCommand {
        transaction_id: TransactionId::from_uuid(request.transaction_id),
        amount_minor: to_minor_units(request.amount),
        reason: request.reason,
    };

    let receipt = state.refund.handle(command).await?;
    Ok(Json(RefundResponse {
        success: receipt.success,
        refund_id: receipt.refund_id.to_string(),
        transaction_id: receipt.transaction_id.to_string(),
        amount: super::dto::to_major_units(receipt.amount_minor),
        processor_used: receipt.processor_used,
        message: receipt.message,
    }))
}

/// GET /health
pub async fn health(State(state): State<OrchestratorAppState>) -> Json<HealthResponse> {
    let mut dependencies = BTreeMap::new();
    for (name, check) in &state.dependencies {
        let status = if check.check().await {
            "healthy"
        } else {
            "unhealthy"
        };
        dependencies.insert((*name).to_string(), status);
    }
    for (name, client) in &state.processors {
        let status = if client.is_healthy() {
            "healthy"
        } else {
            "unhealthy"
        };
        dependencies.insert(name.clone(), status);
    }

    Json(HealthResponse {
        service: "payment-orchestrator",
        status: "healthy",
        timestamp: Timestamp::now(),
        dependencies,
    })
}

/// GET /admin/stats
pub async fn admin_stats(
    State(state): State<OrchestratorAppState>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.transactions.stats_last_24h().await?;
    Ok(Json(StatsResponse::from(stats)))
}
