//! Throttle-aware retry policy for remote catalog calls.
//!
//! Only `RemoteErrorKind::Throttled` is retried. Every other failure is
//! returned to the caller on the first attempt.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use log::{debug, warn};
use tokio_retry::strategy::{jitter, ExponentialBackoff};

use crate::config::RetrySettings;
use crate::error_handling::RemoteError;

/// Creates the backoff schedule for throttled calls.
///
/// The first delay is `base_delay`, doubling on each retry up to `max_delay`,
/// with jitter applied and at most `max_retries` entries.
pub fn get_retry_strategy(settings: &RetrySettings) -> impl Iterator<Item = Duration> {
    // ExponentialBackoff yields factor * 2^n, so halve the base to start at base_delay
    let factor = u64::try_from(settings.base_delay.as_millis() / 2)
        .unwrap_or(u64::MAX)
        .max(1);
    ExponentialBackoff::from_millis(2)
        .factor(factor)
        .max_delay(settings.max_delay)
        .map(jitter)
        .take(settings.max_retries)
}

/// Retries throttled remote calls with exponential backoff.
///
/// One policy is created per run; [`retry_count`](Self::retry_count) is the
/// run's `throttle_retry_count`.
#[derive(Debug)]
pub struct ThrottleRetryPolicy {
    settings: RetrySettings,
    retries: AtomicU32,
}

impl ThrottleRetryPolicy {
    pub fn new(settings: RetrySettings) -> Self {
        Self::with_initial_count(settings, 0)
    }

    /// Creates a policy whose counter continues from a previous run.
    pub fn with_initial_count(settings: RetrySettings, retries: u32) -> Self {
        Self {
            settings,
            retries: AtomicU32::new(retries),
        }
    }

    /// Runs `operation`, retrying while it reports throttling.
    ///
    /// A server-provided Retry-After hint lengthens the wait but never beyond
    /// `max_delay`.
    ///
    /// # Errors
    ///
    /// Returns the first non-throttling error unchanged, or the last throttling
    /// error once the retry budget is exhausted.
    pub async fn execute<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        // Driven by hand rather than `tokio_retry::RetryIf` so a Retry-After hint can stretch a delay
        let mut delays = get_retry_strategy(&self.settings);
        let mut attempt = 1u32;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_throttled() => {
                    let Some(backoff) = delays.next() else {
                        warn!(
                            "{operation_name} still throttled after {} attempts, giving up",
                            attempt
                        );
                        return Err(error);
                    };
                    let delay = error
                        .retry_after
                        .map_or(backoff, |hint| hint.max(backoff))
                        .min(self.settings.max_delay);

                    self.retries.fetch_add(1, Ordering::SeqCst);
                    debug!(
                        "{operation_name} throttled (attempt {attempt}), retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Number of retries performed so far.
    pub fn retry_count(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::RemoteErrorKind;
    use std::sync::atomic::AtomicUsize;

    fn fast_settings(max_retries: usize) -> RetrySettings {
        RetrySettings {
            base_delay: Duration::from_millis(2),
            max_delay: Duration::from_millis(10),
            max_retries,
        }
    }

    #[test]
    fn test_retry_strategy_is_bounded() {
        let settings = fast_settings(4);
        let delays: Vec<_> = get_retry_strategy(&settings).collect();
        assert_eq!(delays.len(), 4);
        assert!(delays.iter().all(|d| *d <= settings.max_delay));
    }

    #[test]
    fn test_retry_strategy_with_zero_retries_is_empty() {
        assert_eq!(get_retry_strategy(&fast_settings(0)).count(), 0);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_counts_no_retries() {
        let policy = ThrottleRetryPolicy::new(fast_settings(3));
        let result = policy.execute("list", || async { Ok::<_, RemoteError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(policy.retry_count(), 0);
    }

    #[tokio::test]
    async fn test_throttled_twice_then_success() {
        let policy = ThrottleRetryPolicy::new(fast_settings(5));
        let calls = AtomicUsize::new(0);

        let result = policy
            .execute("list", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(RemoteError::throttled("429"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(policy.retry_count(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_throttling_error() {
        let policy = ThrottleRetryPolicy::new(fast_settings(2));
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = policy
            .execute("list", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RemoteError::throttled("429")) }
            })
            .await;

        assert_eq!(result.unwrap_err().kind, RemoteErrorKind::Throttled);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(policy.retry_count(), 2);
    }

    #[tokio::test]
    async fn test_non_throttling_errors_are_not_retried() {
        let policy = ThrottleRetryPolicy::new(fast_settings(5));
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = policy
            .execute("list", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RemoteError::not_found("gone")) }
            })
            .await;

        assert_eq!(result.unwrap_err().kind, RemoteErrorKind::NotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(policy.retry_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_after_hint_is_capped_by_max_delay() {
        let policy = ThrottleRetryPolicy::new(fast_settings(1));
        let calls = AtomicUsize::new(0);
        let start = std::time::Instant::now();

        let result = policy
            .execute("list", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        Err(RemoteError::throttled("429").with_retry_after(Duration::from_secs(60)))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_counter_continues_from_initial_count() {
        let policy = ThrottleRetryPolicy::with_initial_count(fast_settings(1), 4);
        assert_eq!(policy.retry_count(), 4);
    }
}
