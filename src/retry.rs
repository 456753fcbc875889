//! Exponential backoff retry for pipeline requests.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::pipeline::{UnitFn, UnitFuture};

/// Cap on the backoff exponent so the shift can never overflow.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Re-runs a failed request unit.
///
/// The unit handed to [`run`](RetryRunner::run) is a factory: each call
/// produces one fresh attempt with its own timeout window and signal, so a
/// timed-out attempt never poisons the next one.
pub trait RetryRunner: Send + Sync {
    fn run<'a>(&'a self, unit: UnitFn<'a>) -> UnitFuture<'a>;
}

/// Delay before the retry following `attempt` failures: `base * 2^attempt`,
/// saturating instead of overflowing.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let shift = attempt.min(MAX_BACKOFF_SHIFT);
    Duration::from_millis((base.as_millis() as u64).saturating_mul(1u64 << shift))
}

/// Retry coordinator with exponential backoff between attempts.
///
/// Every failure kind is retried alike, including ones a response already
/// classified as permanent.
#[derive(Debug, Clone)]
pub struct BackoffRetry {
    retries: u32,
    base_delay: Duration,
}

impl BackoffRetry {
    /// `retries` counts re-runs after the first attempt, so the unit runs at
    /// most `retries + 1` times.
    pub fn new(retries: u32, base_delay: Duration) -> Self {
        Self {
            retries,
            base_delay,
        }
    }
}

impl RetryRunner for BackoffRetry {
    fn run<'a>(&'a self, unit: UnitFn<'a>) -> UnitFuture<'a> {
        Box::pin(async move {
            let mut attempt: u32 = 0;
            loop {
                match unit().await {
                    Ok(decoded) => return Ok(decoded),
                    Err(error) if attempt < self.retries => {
                        let delay = backoff_delay(self.base_delay, attempt);
                        warn!(
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "request attempt failed, backing off before retry"
                        );
                        sleep(delay).await;
                        attempt += 1;
                    }
                    Err(error) => {
                        debug!(attempts = attempt + 1, "request failed after final attempt");
                        return Err(error);
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Decoded, PipelineError, RequestSpec};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn transient_error() -> PipelineError {
        PipelineError::configuration(&RequestSpec::get("https://jira.test/x"), "transient")
    }

    fn unit_failing_first<'a>(fail_count: usize, calls: Arc<AtomicUsize>) -> UnitFn<'a> {
        Box::new(move || {
            let calls = calls.clone();
            Box::pin(async move {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                if call < fail_count {
                    Err(transient_error())
                } else {
                    Ok(Decoded::Text("done".to_string()))
                }
            })
        })
    }

    #[test]
    fn test_backoff_delay_doubles_per_attempt() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(2000));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(4000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_delay_caps_the_exponent() {
        let base = Duration::from_millis(1);
        assert_eq!(backoff_delay(base, 63), backoff_delay(base, MAX_BACKOFF_SHIFT));
        assert_eq!(backoff_delay(base, 63), Duration::from_millis(1 << 16));
    }

    #[test]
    fn test_backoff_delay_saturates_instead_of_overflowing() {
        let base = Duration::from_millis(u64::MAX / 2);
        assert_eq!(backoff_delay(base, 10), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn test_first_attempt_success_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let retry = BackoffRetry::new(3, Duration::from_secs(1));

        let result = retry.run(unit_failing_first(0, calls.clone())).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success_within_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let retry = BackoffRetry::new(2, Duration::from_millis(100));

        let result = retry.run(unit_failing_first(2, calls.clone())).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_exhausting_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let retry = BackoffRetry::new(2, Duration::from_millis(100));

        let result = retry.run(unit_failing_first(usize::MAX, calls.clone())).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_runs_the_unit_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let retry = BackoffRetry::new(0, Duration::from_secs(1));

        let result = retry.run(unit_failing_first(usize::MAX, calls.clone())).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
