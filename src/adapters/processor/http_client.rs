//! HTTP adapter for upstream processor endpoints.
//!
//! Classifies HTTP outcomes into the three failure kinds the
//! orchestrator distinguishes, maintains the advisory health bit, and
//! runs the background probe that restores it.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

use crate::ports::{
    ProcessorChargeRequest, ProcessorChargeResponse, ProcessorClient, ProcessorError,
    ProcessorRefundRequest, ProcessorRefundResponse,
};

/// HTTP statuses that indicate a retryable transport condition.
const RETRYABLE_STATUSES: &[u16] = &[408, 429, 500, 502, 503, 504];

/// Wire shape of a charge request. Amounts cross the wire in major
/// units because that is what the processor contract speaks.
#[derive(Debug, Serialize)]
struct WireChargeRequest {
    amount: f64,
    currency: String,
    token: String,
    idempotency_key: String,
}

#[derive(Debug, Serialize)]
struct WireRefundRequest {
    original_transaction_id: String,
    amount: f64,
    reason: String,
}

/// Reqwest-backed client for one upstream processor.
pub struct HttpProcessorClient {
    name: String,
    base_url: String,
    http: reqwest::Client,
    healthy: Arc<RwLock<bool>>,
}

impl HttpProcessorClient {
    /// Creates a client with a per-call deadline. The health bit starts
    /// healthy.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            healthy: Arc::new(RwLock::new(true)),
        }
    }

    fn mark_unhealthy(&self) {
        let mut healthy = self.healthy.write().expect("health bit lock poisoned");
        if *healthy {
            tracing::warn!(processor = %self.name, "Marking processor unhealthy");
        }
        *healthy = false;
    }

    fn mark_healthy(&self) {
        let mut healthy = self.healthy.write().expect("health bit lock poisoned");
        if !*healthy {
            tracing::info!(processor = %self.name, "Processor recovered");
        }
        *healthy = true;
    }

    fn transport_error(&self, message: impl Into<String>) -> ProcessorError {
        self.mark_unhealthy();
        ProcessorError::Transport {
            processor: self.name.clone(),
            message: message.into(),
        }
    }

    /// Spawns the background probe that polls `GET /health` and flips
    /// the health bit. A call-time failure still marks the processor
    /// unhealthy immediately; the probe only provides recovery.
    pub fn spawn_health_probe(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let client = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            return;
                        }
                    }
                    _ = ticker.tick() => {
                        client.probe_once().await;
                    }
                }
            }
        })
    }

    async fn probe_once(&self) {
        let url = format!("{}/health", self.base_url);
        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => self.mark_healthy(),
            Ok(response) => {
                tracing::debug!(
                    processor = %self.name,
                    status = response.status().as_u16(),
                    "Health probe returned non-200"
                );
                self.mark_unhealthy();
            }
            Err(err) => {
                tracing::debug!(processor = %self.name, error = %err, "Health probe failed");
                self.mark_unhealthy();
            }
        }
    }
}

#[async_trait]
impl ProcessorClient for HttpProcessorClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn charge(
        &self,
        request: ProcessorChargeRequest,
    ) -> Result<ProcessorChargeResponse, ProcessorError> {
        let url = format!("{}/charge", self.base_url);
        let body = WireChargeRequest {
            amount: request.amount_minor as f64 / 100.0,
            currency: request.currency,
            token: request.token,
            idempotency_key: request.idempotency_key,
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| self.transport_error(err.to_string()))?;

        let status = response.status().as_u16();

        // 200 carries approvals; 402 carries declines. Both are
        // business answers with a parseable body.
        if status == 200 || status == 402 {
            return response
                .json::<ProcessorChargeResponse>()
                .await
                .map_err(|err| self.transport_error(format!("malformed charge response: {err}")));
        }

        let message = response.text().await.unwrap_or_default();
        if RETRYABLE_STATUSES.contains(&status) {
            return Err(self.transport_error(format!("status {status}: {message}")));
        }

        Err(ProcessorError::Fatal {
            processor: self.name.clone(),
            status,
            message,
        })
    }

    async fn refund(
        &self,
        request: ProcessorRefundRequest,
    ) -> Result<ProcessorRefundResponse, ProcessorError> {
        let url = format!("{}/refund", self.base_url);
        let body = WireRefundRequest {
            original_transaction_id: request.original_transaction_id,
            amount: request.amount_minor as f64 / 100.0,
            reason: request.reason,
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| self.transport_error(err.to_string()))?;

        let status = response.status().as_u16();
        if status == 200 || status == 402 {
            return response
                .json::<ProcessorRefundResponse>()
                .await
                .map_err(|err| self.transport_error(format!("malformed refund response: {err}")));
        }

        let message = response.text().await.unwrap_or_default();
        if RETRYABLE_STATUSES.contains(&status) {
            return Err(self.transport_error(format!("status {status}: {message}")));
        }

        Err(ProcessorError::Fatal {
            processor: self.name.clone(),
            status,
            message,
        })
    }

    fn is_healthy(&self) -> bool {
        *self.healthy.read().expect("health bit lock poisoned")
    }
}
