//! HTTP handlers for scheduler endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use crate::application::billing::{BillingExecutor, Scheduler, SchedulerStatus};
use crate::domain::billing::{Job, RetryEntry, RetryQueueStats, RetryStatus};
use crate::domain::foundation::{DomainError, ErrorCode, JobId, RetryId};
use crate::ports::{JobRepository, RetryQueue};

use super::super::error::ApiError;
use super::dto::{
    CancelRetryResponse, JobsListResponse, RetriesListResponse, RetryNowResponse, TriggerResponse,
};

/// Shared state for scheduler endpoints.
#[derive(Clone)]
pub struct SchedulerAppState {
    pub scheduler: Arc<Scheduler>,
    pub executor: Arc<BillingExecutor>,
    pub jobs: Arc<dyn JobRepository>,
    pub retries: Arc<dyn RetryQueue>,
}

/// GET /scheduler/status
pub async fn status(State(state): State<SchedulerAppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status().await)
}

/// POST /scheduler/trigger
pub async fn trigger(
    State(state): State<SchedulerAppState>,
) -> Result<Json<TriggerResponse>, ApiError> {
    let report = state.scheduler.trigger_manual().await?;
    Ok(Json(TriggerResponse::from(report)))
}

/// GET /scheduler/jobs
pub async fn list_jobs(
    State(state): State<SchedulerAppState>,
) -> Result<Json<JobsListResponse>, ApiError> {
    let jobs = state.jobs.list_recent(50).await?;
    Ok(Json(JobsListResponse {
        total: jobs.len(),
        jobs,
    }))
}

/// GET /scheduler/jobs/:id
pub async fn get_job(
    State(state): State<SchedulerAppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
    let job = state
        .jobs
        .find_by_id(&JobId::from_uuid(id))
        .await?
        .ok_or_else(|| DomainError::new(ErrorCode::JobNotFound, "Job not found"))?;
    Ok(Json(job))
}

/// GET /scheduler/retries?status=
pub async fn list_retries(
    State(state): State<SchedulerAppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<RetriesListResponse>, ApiError> {
    let status = match params.get("status") {
        Some(raw) => RetryStatus::parse(raw).ok_or_else(|| {
            DomainError::new(
                ErrorCode::InvalidRequest,
                format!("Unknown retry status: {raw}"),
            )
        })?,
        None => RetryStatus::Pending,
    };

    let retries = state.retries.list(Some(status), 100).await?;
    Ok(Json(RetriesListResponse {
        total: retries.len(),
        retries,
        status,
    }))
}

/// GET /scheduler/retries/:id
pub async fn get_retry(
    State(state): State<SchedulerAppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RetryEntry>, ApiError> {
    let entry = state
        .retries
        .find_by_id(&RetryId::from_uuid(id))
        .await?
        .ok_or_else(|| DomainError::new(ErrorCode::RetryNotFound, "Retry not found"))?;
    Ok(Json(entry))
}

/// POST /scheduler/retries/:id/retry-now
pub async fn retry_now(
    State(state): State<SchedulerAppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RetryNowResponse>, ApiError> {
    let retry_id = RetryId::from_uuid(id);
    let report = state.executor.retry_now(&retry_id).await?;
    Ok(Json(RetryNowResponse {
        success: report.success,
        retry_id: retry_id.to_string(),
        subscription_id: report.subscription_id,
        transaction_id: report.transaction_id,
        processor_used: report.processor_used,
        error_code: report.error_code,
        error_message: report.error_message,
    }))
}

/// POST /scheduler/retries/:id/cancel
pub async fn cancel_retry(
    State(state): State<SchedulerAppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelRetryResponse>, ApiError> {
    let retry_id = RetryId::from_uuid(id);
    let entry = state.executor.cancel_retry(&retry_id).await?;
    Ok(Json(CancelRetryResponse {
        success: true,
        retry_id: retry_id.to_string(),
        subscription_id: entry.subscription_id.to_string(),
        message: "Retry canceled successfully",
    }))
}

/// GET /scheduler/stats
pub async fn retry_stats(
    State(state): State<SchedulerAppState>,
) -> Result<Json<RetryQueueStats>, ApiError> {
    let stats = state.retries.stats().await?;
    Ok(Json(stats))
}
