// ============================================
// PROMPTLY - Retry Policy with Fixed Backoff
// ============================================

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use super::error::CompletionError;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, the first one included
    pub max_attempts: u32,
    /// Fixed wait between a retryable failure and the next attempt
    pub wait_interval: Duration,
    /// Pause inserted before every attempt, the first one included
    pub pacing_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            wait_interval: Duration::from_secs(3),
            pacing_delay: Duration::from_millis(300),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, wait_interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            wait_interval,
            ..Default::default()
        }
    }

    pub fn with_pacing(mut self, pacing_delay: Duration) -> Self {
        self.pacing_delay = pacing_delay;
        self
    }

    /// A policy that makes exactly one attempt with no pacing.
    #[cfg(test)]
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            wait_interval: Duration::ZERO,
            pacing_delay: Duration::ZERO,
        }
    }
}

/// Error classification for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait and try again
    Retry,
    /// Surface immediately
    NoRetry,
}

/// Terminal outcome of [`with_retry`] when no attempt succeeded.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The budget ran out while failures were still classified retryable.
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with a non-retryable error.
    Fatal { attempt: u32, error: E },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
            Self::Fatal { attempt, .. } => *attempt,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Fatal { error, .. } => error,
        }
    }
}

/// Only an explicit rate-limit signal is worth retrying. Timeouts and other
/// request failures go straight back to the caller.
pub fn classify(error: &CompletionError) -> RetryDecision {
    if error.is_rate_limited() {
        RetryDecision::Retry
    } else {
        RetryDecision::NoRetry
    }
}

/// Execute an async operation under `policy`.
///
/// The attempt counter is local to this call, so concurrent or repeated
/// invocations never share retry state.
pub async fn with_retry<F, Fut, T, E, C>(
    policy: &RetryPolicy,
    classify: C,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryDecision,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        if !policy.pacing_delay.is_zero() {
            sleep(policy.pacing_delay).await;
        }

        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!("Succeeded on attempt {}/{}", attempt, max_attempts);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if classify(&err) == RetryDecision::NoRetry {
            return Err(RetryError::Fatal {
                attempt,
                error: err,
            });
        }

        if attempt >= max_attempts {
            tracing::error!(
                "Giving up after {} attempts, last error: {}",
                attempt,
                err
            );
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: err,
            });
        }

        tracing::warn!(
            "Attempt {}/{} failed: {}. Retrying in {:?}...",
            attempt,
            max_attempts,
            err,
            policy.wait_interval
        );
        sleep(policy.wait_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn rate_limited() -> CompletionError {
        CompletionError::RateLimited {
            status: 429,
            message: "Resource has been exhausted".to_string(),
        }
    }

    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(50),
            "elapsed {:?}, expected {:?}",
            elapsed,
            expected
        );
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.wait_interval, Duration::from_secs(3));
        assert_eq!(policy.pacing_delay, Duration::from_millis(300));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify(&rate_limited()), RetryDecision::Retry);
        assert_eq!(classify(&CompletionError::Timeout), RetryDecision::NoRetry);
        assert_eq!(
            classify(&CompletionError::Request("connection reset".into())),
            RetryDecision::NoRetry
        );
        assert_eq!(
            classify(&CompletionError::Status {
                status: 503,
                message: "overloaded".into()
            }),
            RetryDecision::NoRetry
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_first_attempt() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = with_retry(&policy, classify, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, CompletionError>(42) }
        })
        .await;

        assert_eq!(result.ok(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_elapsed(start, policy.pacing_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success_waits_between_attempts() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = with_retry(&policy, classify, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 5 {
                    Err(rate_limited())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.ok(), Some("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // five pacing delays and four backoff waits
        assert_elapsed(start, policy.pacing_delay * 5 + policy.wait_interval * 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&policy, classify, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(rate_limited()) }
        })
        .await;

        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 5);
                assert!(last.is_rate_limited());
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_not_retried() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<(), _> = with_retry(&policy, classify, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(CompletionError::Timeout) }
        })
        .await;

        let err = result.expect_err("timeout must surface");
        assert_eq!(err.attempts(), 1);
        assert!(matches!(err.into_inner(), CompletionError::Timeout));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_elapsed(start, policy.pacing_delay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_policy() {
        let policy = RetryPolicy::single_attempt();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&policy, classify, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(rate_limited()) }
        })
        .await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 1, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
