//! Explicit retry policies and the helper that runs an operation under one.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// `base * 2^retry`, capped at `max`, with ±`jitter` (0.0..1.0) noise.
    Exponential {
        base: Duration,
        max: Duration,
        jitter: f64,
    },
    Fixed(Duration),
    None,
}

impl Backoff {
    /// Delay to wait before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Backoff::Exponential { base, max, jitter } => {
                // Cap the exponent to prevent overflow
                let factor = 2_u32.saturating_pow(retry.min(16));
                let raw = base.saturating_mul(factor).min(max);
                if jitter <= 0.0 {
                    return raw;
                }
                let jitter = jitter.min(0.99);
                let jitter_factor = rand::thread_rng().gen_range((1.0 - jitter)..(1.0 + jitter));
                raw.mul_f64(jitter_factor).min(max)
            }
            Backoff::Fixed(delay) => delay,
            Backoff::None => Duration::ZERO,
        }
    }
}

/// How many times to try, how long to wait, and which errors are worth
/// another attempt.
pub struct RetryPolicy<E> {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub is_retryable: fn(&E) -> bool,
}

impl<E> RetryPolicy<E> {
    pub fn new(max_attempts: u32, backoff: Backoff, is_retryable: fn(&E) -> bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            is_retryable,
        }
    }

    /// No retries at all.
    pub fn once() -> Self {
        Self::new(1, Backoff::None, |_| false)
    }
}

// Manual impls: deriving would demand `E: Clone`.
impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for RetryPolicy<E> {}

impl<E> std::fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .finish()
    }
}

/// Result of [`retry_with_policy`]: the final outcome and how many attempts
/// were made.
#[derive(Debug)]
pub struct Attempted<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts. `op` receives the 1-based attempt number.
pub async fn retry_with_policy<T, E, F, Fut>(policy: &RetryPolicy<E>, mut op: F) -> Attempted<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                };
            }
            Err(err) => {
                let retryable = (policy.is_retryable)(&err);
                if !retryable || attempt >= policy.max_attempts {
                    if retryable {
                        warn!(attempt, error = %err, "giving up after final attempt");
                    } else {
                        debug!(attempt, error = %err, "permanent error, not retrying");
                    }
                    return Attempted {
                        result: Err(err),
                        attempts: attempt,
                    };
                }

                let delay = policy.backoff.delay(attempt - 1);
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
