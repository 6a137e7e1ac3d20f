//! Retry calculator
//!
//! Bounded attempts with linear backoff: the delay before attempt `n + 1`
//! is `n * base_delay`, plus optional random jitter.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use super::config::WarmingConfig;

#[derive(Debug, Clone)]
pub struct RetryCalculator {
    max_attempts: u32,
    base_delay_ms: u64,
    jitter_ms: u64,
}

impl Default for RetryCalculator {
    fn default() -> Self {
        Self::new(3, 1000, 0)
    }
}

impl RetryCalculator {
    /// `max_attempts` counts the first try; values below 1 are raised to 1.
    pub fn new(max_attempts: u32, base_delay_ms: u64, jitter_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            jitter_ms,
        }
    }

    pub fn from_config(config: &WarmingConfig) -> Self {
        Self::new(
            config.retry_attempts,
            config.retry_base_delay_ms,
            config.retry_jitter_ms,
        )
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt follows a failed attempt number `attempt`.
    pub const fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let linear = self.base_delay_ms.saturating_mul(u64::from(attempt));
        let jitter = if self.jitter_ms > 0 {
            fastrand::u64(0..=self.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(linear.saturating_add(jitter))
    }

    /// Run `operation` until it succeeds or the attempts are spent, returning
    /// the last error. The closure receives the 1-based attempt number.
    pub async fn execute<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(attempt) => {
                    let delay = self.calculate_delay(attempt);
                    warn!(
                        "🔄 {} failed (attempt {}/{}): {}; retrying in {:?}",
                        label, attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("❌ {} failed after {} attempts: {}", label, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}
