//! Upstream processor client configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Configuration for the two upstream card processors.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorsConfig {
    /// Base URL of processor A
    #[serde(default = "default_processor_a_url")]
    pub processor_a_url: String,

    /// Base URL of processor B
    #[serde(default = "default_processor_b_url")]
    pub processor_b_url: String,

    /// Per-call deadline for charge and refund requests, in seconds
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Interval between background health probes, in seconds
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,
}

impl ProcessorsConfig {
    /// Per-call deadline as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Probe interval as a Duration
    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }

    /// Validate processor configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.processor_a_url.starts_with("http") {
            return Err(ValidationError::InvalidProcessorUrl("processor_a"));
        }
        if !self.processor_b_url.starts_with("http") {
            return Err(ValidationError::InvalidProcessorUrl("processor_b"));
        }
        if self.call_timeout_secs == 0 || self.call_timeout_secs > 60 {
            return Err(ValidationError::InvalidProcessorTimeout);
        }
        Ok(())
    }
}

impl Default for ProcessorsConfig {
    fn default() -> Self {
        Self {
            processor_a_url: default_processor_a_url(),
            processor_b_url: default_processor_b_url(),
            call_timeout_secs: default_call_timeout(),
            health_interval_secs: default_health_interval(),
        }
    }
}

fn default_processor_a_url() -> String {
    "http://localhost:8101".to_string()
}

fn default_processor_b_url() -> String {
    "http://localhost:8102".to_string()
}

fn default_call_timeout() -> u64 {
    5
}

fn default_health_interval() -> u64 {
    30
}
