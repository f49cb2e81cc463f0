//! Request/response DTOs for scheduler endpoints.

use serde::Serialize;

use crate::application::billing::{BatchReport, ItemReport};
use crate::domain::billing::{Job, RetryEntry, RetryStatus};

/// Body of `POST /scheduler/trigger` responses.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub message: &'static str,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub jobs: Vec<ItemReport>,
}

impl From<BatchReport> for TriggerResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            success: true,
            message: "Scheduler triggered successfully",
            processed: report.processed,
            successful: report.successful,
            failed: report.failed,
            duration_ms: report.duration_ms,
            jobs: report.items,
        }
    }
}

/// Body of `GET /scheduler/jobs`.
#[derive(Debug, Serialize)]
pub struct JobsListResponse {
    pub jobs: Vec<Job>,
    pub total: usize,
}

/// Body of `GET /scheduler/retries`.
#[derive(Debug, Serialize)]
pub struct RetriesListResponse {
    pub retries: Vec<RetryEntry>,
    pub total: usize,
    pub status: RetryStatus,
}

/// Body of `POST /scheduler/retries/{id}/retry-now` responses.
#[derive(Debug, Serialize)]
pub struct RetryNowResponse {
    pub success: bool,
    pub retry_id: String,
    pub subscription_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Body of `POST /scheduler/retries/{id}/cancel` responses.
#[derive(Debug, Serialize)]
pub struct CancelRetryResponse {
    pub success: bool,
    pub retry_id: String,
    pub subscription_id: String,
    pub message: &'static str,
}
