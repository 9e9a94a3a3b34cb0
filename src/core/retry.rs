//! Bounded retry with exponential backoff and jitter

use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Retry policy for one wrapped operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retry attempts after the first call (attempt 0 is the first call)
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Backoff delay before the retry following `attempt`, jittered and
    /// capped at `max_delay`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..500));
        std::cmp::min(exponential + jitter, self.max_delay)
    }
}

/// Run `operation` with bounded retry.
///
/// The operation is re-created per attempt, so the originating request is
/// never mutated. `is_retryable` classifies each error; a fatal error or an
/// exhausted budget propagates immediately. `on_retry` is the only side
/// effect, invoked with the error and the upcoming attempt number (1-based)
/// before each backoff sleep.
pub async fn with_retry<T, E, F, Fut, C, O>(
    mut operation: F,
    policy: &RetryPolicy,
    is_retryable: C,
    mut on_retry: O,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    O: FnMut(&E, u32),
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_retries || !is_retryable(&err) {
                    return Err(err);
                }

                let delay = policy.delay_for(attempt);
                on_retry(&err, attempt + 1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
