//! Retry back-off policy for soft declines.

use chrono::Duration;

use crate::domain::foundation::Timestamp;

/// Bounded retry schedule applied to soft declines.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    intervals: Vec<Duration>,
}

impl RetryPolicy {
    /// Builds a policy with explicit intervals. Attempts beyond the
    /// last interval reuse it.
    pub fn new(max_attempts: u32, intervals: Vec<Duration>) -> Self {
        debug_assert!(!intervals.is_empty());
        Self {
            max_attempts,
            intervals,
        }
    }

    /// The back-off interval before attempt `attempt` (1-indexed).
    pub fn interval_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.intervals[0];
        }
        let index = (attempt as usize - 1).min(self.intervals.len() - 1);
        self.intervals[index]
    }

    /// When attempt `attempt` should run, measured from `now`.
    pub fn next_retry_at(&self, attempt: u32, now: Timestamp) -> Timestamp {
        now.plus(self.interval_for(attempt))
    }
}

impl Default for RetryPolicy {
    /// 3 attempts at 1 hour, 24 hours, 72 hours.
    fn default() -> Self {
        Self::new(
            3,
            vec![Duration::hours(1), Duration::hours(24), Duration::hours(72)],
        )
    }
}
