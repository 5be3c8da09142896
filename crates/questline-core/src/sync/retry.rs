//! Exponential-backoff retry for remote operations.
//!
//! The policy is plain configuration; every call to [`RetryPolicy::run`]
//! keeps its own attempt counter and delay, so one policy can drive any
//! number of concurrent operations.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), 2.0)
    }
}

impl RetryPolicy {
    /// `max_attempts` of 0 behaves as 1. A negative or non-finite factor
    /// behaves as 1.0 (constant delay).
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_factor: f64) -> Self {
        let backoff_factor = if backoff_factor.is_finite() && backoff_factor >= 0.0 {
            backoff_factor
        } else {
            1.0
        };
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff_factor,
        }
    }

    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, 1.0)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    /// Delay before attempt `n + 1`, for `n >= 1` failed attempts.
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        let mut delay = self.initial_delay;
        for _ in 1..failed_attempts {
            delay = scale(delay, self.backoff_factor);
        }
        delay
    }

    /// Run `operation` until it succeeds or attempts run out. The last
    /// error is returned as-is.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        let mut delay = self.initial_delay;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => {
                    tracing::debug!(attempt, error = %e, "giving up after final attempt");
                    return Err(e);
                }
                Err(e) => {
                    tracing::debug!(attempt, ?delay, error = %e, "attempt failed, backing off");
                    tokio::time::sleep(delay).await;
                    delay = scale(delay, self.backoff_factor);
                    attempt += 1;
                }
            }
        }
    }
}

fn scale(delay: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

/// One-shot form of [`RetryPolicy::run`].
pub async fn retry<T, E, F, Fut>(
    operation: F,
    max_attempts: u32,
    initial_delay: Duration,
    backoff_factor: f64,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    RetryPolicy::new(max_attempts, initial_delay, backoff_factor)
        .run(operation)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_two_failures_with_expected_wait() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result: Result<&str, String> = retry(
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("unreachable".to_string())
                } else {
                    Ok("done")
                }
            },
            3,
            Duration::from_millis(100),
            2.0,
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms + 100ms * 2
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn final_error_is_returned_untouched() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = RetryPolicy::new(2, Duration::from_millis(10), 2.0)
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(format!("failure {n}"))
            })
            .await;
        assert_eq!(result, Err("failure 1".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();
        let _: Result<(), &str> = RetryPolicy::new(0, Duration::from_secs(5), 2.0)
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("nope")
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_runs_do_not_share_counters() {
        let policy = RetryPolicy::new(3, Duration::from_millis(50), 2.0);
        let a = AtomicU32::new(0);
        let b = AtomicU32::new(0);
        let (ra, rb): (Result<u32, String>, Result<u32, String>) = tokio::join!(
            policy.run(|| async {
                let n = a.fetch_add(1, Ordering::SeqCst);
                if n < 1 { Err("a".into()) } else { Ok(n) }
            }),
            policy.run(|| async {
                let n = b.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err("b".into()) } else { Ok(n) }
            }),
        );
        assert_eq!(ra, Ok(1));
        assert_eq!(rb, Ok(2));
    }

    #[test]
    fn delay_schedule_grows_geometrically() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), 3.0);
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(300));
        assert_eq!(policy.delay_after(3), Duration::from_millis(900));
    }

    #[test]
    fn invalid_factor_falls_back_to_constant_delay() {
        assert_eq!(RetryPolicy::new(3, Duration::from_millis(1), f64::NAN).backoff_factor(), 1.0);
        assert_eq!(RetryPolicy::new(3, Duration::from_millis(1), -2.0).backoff_factor(), 1.0);
    }
}
