//! Bounded retry with a fixed delay between attempts

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::shared::errors::SwapError;

/// Retry configuration for one `with_retries` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Attempts actually made; a zero budget still runs the operation once.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Run `operation` until it succeeds or the attempt budget is spent.
///
/// Attempts run one after another, never concurrently. Each failure waits
/// `policy.delay` before the next attempt; there is no backoff and no jitter,
/// and every error kind is retried the same way. When the budget is spent the
/// last failure is returned inside [`SwapError::RetriesExhausted`].
///
/// The closure receives the 1-based attempt number.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, SwapError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, SwapError>>,
{
    let max_attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("Operation succeeded on attempt {}/{}", attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(err) if attempt < max_attempts => {
                warn!("❌ Attempt {}/{} failed: {}", attempt, max_attempts, err);
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!("❌ Attempt {}/{} failed, giving up: {}", attempt, max_attempts, err);
                return Err(SwapError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
        }
    }
}
