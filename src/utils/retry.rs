// Bounded retries with exponential backoff.
// Delay after the n-th failure (0-based) is multiplier * 2^n, clamped to [min, max].

use crate::utils::error::{MonitorError, Result};
use std::future::Future;
use std::time::Duration;

/// Retry strategy trait for calculating retry delays
pub trait RetryStrategy: Send + Sync {
    /// Delay before the next attempt, or None once the attempts are used up
    fn next_delay(&self, failed_attempt: u32) -> Option<Duration>;

    /// Total number of attempts, including the first one
    fn max_attempts(&self) -> u32;
}

#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    multiplier: Duration,
    min_delay: Duration,
    max_delay: Duration,
    max_attempts: u32,
}

impl ExponentialBackoff {
    pub fn new(max_attempts: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            multiplier: Duration::from_secs(1),
            min_delay,
            max_delay: max_delay.max(min_delay),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn with_multiplier(mut self, multiplier: Duration) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO).with_multiplier(Duration::ZERO)
    }

    fn calculate_delay(&self, failed_attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed_attempt.min(30));
        let delay = self.multiplier.saturating_mul(factor);
        delay.clamp(self.min_delay, self.max_delay)
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn next_delay(&self, failed_attempt: u32) -> Option<Duration> {
        if failed_attempt + 1 >= self.max_attempts {
            return None;
        }
        Some(self.calculate_delay(failed_attempt))
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Runs `operation` until it succeeds, fails with an error `should_retry`
/// rejects, or the strategy runs out of attempts. The closure receives the
/// 0-based attempt number.
pub async fn retry_async<T, S, F, Fut, P>(
    strategy: &S,
    label: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T>
where
    S: RetryStrategy + ?Sized,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&MonitorError) -> bool,
{
    let mut attempt = 0;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if should_retry(&e) => match strategy.next_delay(attempt) {
                Some(delay) => {
                    tracing::debug!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label,
                        attempt + 1,
                        strategy.max_attempts(),
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    tracing::warn!(
                        "{} failed after {} attempts: {}",
                        label,
                        strategy.max_attempts(),
                        e
                    );
                    return Err(e);
                }
            },
            Err(e) => return Err(e),
        }
    }
}
