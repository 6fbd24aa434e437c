//! Capped retry with doubling backoff.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Sleep before the second attempt; doubles for each later attempt.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
        }
    }

    /// One retry after 2s, only meaningful for rate-limit responses.
    pub fn rate_limit() -> Self {
        Self::new(2, Duration::from_secs(2))
    }

    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Backoff slept before attempt number `attempt` (1-based, so attempt 2 is the first retry).
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let shift = (attempt - 2).min(16);
        self.initial_backoff.saturating_mul(1 << shift)
    }

    /// Runs `op` until it succeeds, returns a non-retryable error, or attempts run out.
    pub async fn run<T, E, F, Fut, R>(&self, mut op: F, retryable: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < attempts && retryable(&e) => {
                    attempt += 1;
                    let delay = self.backoff_before(attempt);
                    warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after failure"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(p.backoff_before(1), Duration::ZERO);
        assert_eq!(p.backoff_before(2), Duration::from_millis(100));
        assert_eq!(p.backoff_before(3), Duration::from_millis(200));
        assert_eq!(p.backoff_before(4), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let calls = Cell::new(0);
        let p = RetryPolicy::new(3, Duration::ZERO);
        let res: Result<(), String> = p
            .run(
                || {
                    calls.set(calls.get() + 1);
                    async { Err("boom".to_string()) }
                },
                |_| true,
            )
            .await;
        assert!(res.is_err());
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let calls = Cell::new(0);
        let res: Result<(), String> = RetryPolicy::new(5, Duration::ZERO)
            .run(
                || {
                    calls.set(calls.get() + 1);
                    async { Err("fatal".to_string()) }
                },
                |e| e != "fatal",
            )
            .await;
        assert_eq!(res.unwrap_err(), "fatal");
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn succeeds_on_retry() {
        let calls = Cell::new(0);
        let res: Result<u32, String> = RetryPolicy::new(2, Duration::ZERO)
            .run(
                || {
                    let n = calls.get() + 1;
                    calls.set(n);
                    async move {
                        if n == 1 {
                            Err("later".to_string())
                        } else {
                            Ok(n)
                        }
                    }
                },
                |_| true,
            )
            .await;
        assert_eq!(res.unwrap(), 2);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let calls = Cell::new(0);
        let _: Result<(), String> = RetryPolicy::new(0, Duration::ZERO)
            .run(
                || {
                    calls.set(calls.get() + 1);
                    async { Err("x".to_string()) }
                },
                |_| true,
            )
            .await;
        assert_eq!(calls.get(), 1);
    }
}
