use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::{Result, StoreError};

/// Retry policy for transient storage failures.
///
/// Delays follow `base * 2^attempt` plus random jitter of up to half the
/// computed delay, so competing writers back off at different rates
/// instead of retrying in lockstep.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Runs `op`, retrying on transient errors up to `max_attempts` times.
    ///
    /// Non-transient errors propagate immediately. Exhausting the attempts
    /// surfaces the last transient error.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient storage error, retrying"
                    );
                    metrics::counter!("store_transient_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        // 100ms, 200ms, 400ms... plus jitter in [0, backoff/2)
        let backoff = self.base_delay.saturating_mul(1 << attempt);
        let half = (backoff.as_millis() / 2).max(1) as u64;
        let jitter = rand::thread_rng().gen_range(0..half);
        backoff + Duration::from_millis(jitter)
    }
}
