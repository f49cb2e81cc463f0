//! Recurring-billing scheduler configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Scheduler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between scheduler ticks
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Maximum due subscriptions (and due retries) claimed per tick
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Whether the background loop processes ticks
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Upper bound on a single tick, in seconds
    #[serde(default = "default_tick_deadline")]
    pub tick_deadline_secs: u64,
}

impl SchedulerConfig {
    /// Tick interval as a Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Tick deadline as a Duration
    pub fn tick_deadline(&self) -> Duration {
        Duration::from_secs(self.tick_deadline_secs)
    }

    /// Validate scheduler configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.tick_interval_secs == 0 {
            return Err(ValidationError::InvalidTickInterval);
        }
        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ValidationError::InvalidBatchSize);
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            batch_size: default_batch_size(),
            enabled: default_enabled(),
            tick_deadline_secs: default_tick_deadline(),
        }
    }
}

fn default_tick_interval() -> u64 {
    60
}

fn default_batch_size() -> u32 {
    100
}

fn default_enabled() -> bool {
    true
}

fn default_tick_deadline() -> u64 {
    120
}
