//! Retry policy for transient failures.
//!
//! A [`RetryPolicy`] is plain configuration. The delay before each retry is a
//! pure function of the attempt number, so a single policy can be shared by
//! any number of concurrent calls.

use rand::Rng;
use std::time::Duration;

/// Delay schedule between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Wait the same amount before every retry.
    Fixed(Duration),
    /// Wait `initial * multiplier^(n-1)` before retry `n`, capped at `max`.
    Exponential {
        initial: Duration,
        max: Duration,
        multiplier: f64,
    },
}

/// How many times to try a request and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Never less than 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Pick a random delay between zero and the scheduled one.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential {
                initial: Duration::from_millis(200),
                max: Duration::from_secs(5),
                multiplier: 2.0,
            },
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn never() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::None,
            jitter: false,
        }
    }

    /// Fixed delay between `max_attempts` attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed(delay),
            jitter: false,
        }
    }

    /// Exponential backoff doubling from `initial` up to `max`.
    pub fn exponential(max_attempts: u32, initial: Duration, max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Exponential {
                initial,
                max,
                multiplier: 2.0,
            },
            jitter: false,
        }
    }

    /// Enable or disable full jitter on every scheduled delay.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether another attempt is allowed after `attempt` attempts failed.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1)
    }

    /// Scheduled delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let scheduled = match &self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
                let nanos = initial.as_nanos() as f64 * multiplier.powi(exponent);
                if nanos.is_finite() && nanos < max.as_nanos() as f64 {
                    Duration::from_nanos(nanos.max(0.0) as u64)
                } else {
                    *max
                }
            }
        };

        if self.jitter && !scheduled.is_zero() {
            let nanos = scheduled.as_nanos().min(u64::MAX as u128) as u64;
            Duration::from_nanos(rand::rng().random_range(0..=nanos))
        } else {
            scheduled
        }
    }
}
