//! Poll scheduling policy: fixed interval, attempt ceiling and the
//! separate network-retry budget.

use std::time::Duration;

/// Backoff used between status queries that failed at the transport
/// layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryBackoff {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Upper bound on the delay between retries.
    pub max: Duration,
    /// Factor by which the delay grows after each failed retry.
    pub multiplier: f64,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(10),
            max: Duration::from_secs(20),
            multiplier: 1.5,
        }
    }
}

impl RetryBackoff {
    /// Delay before retry number `retry` (1-based), clamped to [`max`](Self::max).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let ms = self.initial.as_millis() as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(ms as u64).min(self.max)
    }
}

/// How a tool polls the status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay between a completed status query and the next one.
    pub interval: Duration,
    /// In-progress responses tolerated before the job times out.
    pub max_attempts: u32,
    /// Consecutive transport failures retried before giving up.
    pub max_transport_retries: u32,
    pub retry_backoff: RetryBackoff,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            max_transport_retries: 3,
            retry_backoff: RetryBackoff::default(),
        }
    }

    /// Wall time covered by the attempt ceiling.
    pub fn time_budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}
