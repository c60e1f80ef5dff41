use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::config::ConnectRetryConfig;

/// Exponential backoff around an async operation. `max_attempts == 0` retries forever.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    exponential_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            exponential_base: 2.0,
        }
    }
}

impl From<&ConnectRetryConfig> for RetryPolicy {
    fn from(config: &ConnectRetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_millis(config.delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms.max(config.delay_ms)),
            exponential_base: config.backoff.max(1.0),
        }
    }
}

impl RetryPolicy {
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt: u32 = 0;
        let mut delay = self.initial_delay;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) if self.max_attempts != 0 && attempt + 1 >= self.max_attempts => {
                    warn!("Operation failed after {} attempts: {}", self.max_attempts, err);
                    return Err(err);
                }
                Err(err) => {
                    warn!("Operation failed (attempt {}): {}, retrying...", attempt + 1, err);
                    sleep(delay).await;
                    delay = std::cmp::min(
                        self.max_delay,
                        Duration::from_secs_f64(delay.as_secs_f64() * self.exponential_base),
                    );
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
}
