//! Bounded retry with fixed or exponential delays.
//!
//! Translation and image downloads both talk to services that fail
//! transiently. Instead of a hand-written sleep loop at each call site, they
//! share one [`RetryPolicy`]:
//!
//! - `attempts` is the total number of tries, including the first one
//! - the delay between tries is either fixed or doubles each time up to a cap
//! - optional random jitter is added on top of the computed delay
//!
//! ```ignore
//! let policy = RetryPolicy::fixed(3, Duration::from_secs(1));
//! let text = policy
//!     .run_or("translate", original.clone(), || client.translate(&original))
//!     .await;
//! ```

use rand::{Rng, rng};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, warn};

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Wait the base delay between every attempt.
    Fixed,
    /// Double the base delay after each failure, capped at `max_delay`.
    Exponential { max_delay: Duration },
}

/// Retry settings shared by every fallible network call in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of tries. Zero is treated as one.
    pub attempts: usize,
    /// Base delay between tries.
    pub delay: Duration,
    pub backoff: Backoff,
    /// Upper bound of random jitter added to each delay, in milliseconds.
    pub jitter_ms: u64,
}

impl RetryPolicy {
    pub fn fixed(attempts: usize, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
            backoff: Backoff::Fixed,
            jitter_ms: 0,
        }
    }

    pub fn exponential(attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts,
            delay: base_delay,
            backoff: Backoff::Exponential { max_delay },
            jitter_ms: 0,
        }
    }

    pub fn with_jitter(mut self, jitter_ms: u64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    fn max_attempts(&self) -> usize {
        self.attempts.max(1)
    }

    /// Delay to wait after the `failures`-th failed attempt, without jitter.
    pub fn delay_for(&self, failures: usize) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay } => {
                let shift = failures.saturating_sub(1).min(31) as u32;
                self.delay.saturating_mul(1 << shift).min(max_delay)
            }
        }
    }

    /// Run `op` until it succeeds or the attempts are exhausted.
    ///
    /// Returns the last error when every attempt fails.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let total_t0 = Instant::now();
        let max = self.max_attempts();
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt >= max {
                        error!(
                            label,
                            attempt,
                            max,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "All attempts failed"
                        );
                        return Err(e);
                    }

                    let mut delay = self.delay_for(attempt);
                    if self.jitter_ms > 0 {
                        delay += Duration::from_millis(rng().random_range(0..=self.jitter_ms));
                    }
                    warn!(
                        label,
                        attempt,
                        max,
                        ?delay,
                        error = %e,
                        "Attempt failed; retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Like [`RetryPolicy::run`], but returns `fallback` once every attempt has failed.
    pub async fn run_or<T, E, F, Fut>(&self, label: &str, fallback: T, op: F) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.run(label, op).await.unwrap_or(fallback)
    }
}

impl Default for RetryPolicy {
    /// Three tries, one second apart.
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1))
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} attempts, {:?} {:?}", self.attempts, self.delay, self.backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick(attempts: usize) -> RetryPolicy {
        RetryPolicy::fixed(attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_fixed_delay() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(5), Duration::from_secs(1));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy =
            RetryPolicy::exponential(6, Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(8));
        assert_eq!(policy.delay_for(6), Duration::from_secs(30));
        assert_eq!(policy.delay_for(100), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_run_succeeds_after_failures() {
        let calls = Cell::new(0);
        let result: Result<&str, String> = quick(3)
            .run("flaky", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(format!("failure {n}"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_run_stops_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), String> = quick(3)
            .run("always", || {
                calls.set(calls.get() + 1);
                async { Err("nope".to_string()) }
            })
            .await;

        assert_eq!(result, Err("nope".to_string()));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let calls = Cell::new(0);
        let _ = quick(0)
            .run("once", || {
                calls.set(calls.get() + 1);
                async { Err::<(), _>("nope") }
            })
            .await;
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_jitter_does_not_change_base_delay() {
        let policy = quick(3).with_jitter(250);
        assert_eq!(policy.jitter_ms, 250);
        assert_eq!(policy.delay_for(1), Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_run_or_returns_fallback() {
        let calls = Cell::new(0);
        let value = quick(2)
            .run_or("fallback", "original".to_string(), || {
                calls.set(calls.get() + 1);
                async { Err::<String, _>("service down") }
            })
            .await;
        assert_eq!(value, "original");
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_run_or_keeps_success() {
        let calls = Cell::new(0);
        let value = quick(3)
            .run_or("recovers", 0, || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { if n < 2 { Err("busy") } else { Ok(n) } }
            })
            .await;
        assert_eq!(value, 2);
        assert_eq!(calls.get(), 2);
    }
}
