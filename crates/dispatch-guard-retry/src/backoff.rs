//! Backoff strategies.

use std::time::Duration;

/// Computes the delay before a retry.
///
/// `attempt` is 0-indexed: `delay_for(0)` is the wait after the first
/// failure.
pub trait BackoffStrategy: Send + Sync {
    fn delay_for(&self, attempt: usize) -> Duration;
}

/// The same delay before every retry.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl BackoffStrategy for FixedDelay {
    fn delay_for(&self, _attempt: usize) -> Duration {
        self.delay
    }
}

/// Exponentially growing delay: `initial * multiplier^attempt`, optionally
/// capped.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    initial: Duration,
    multiplier: f64,
    max_delay: Option<Duration>,
}

impl ExponentialBackoff {
    /// Doubling backoff starting at `initial`, uncapped.
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            multiplier: 2.0,
            max_delay: None,
        }
    }

    /// Sets the growth factor (values below 1.0 are clamped to 1.0).
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Caps the computed delay.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay_for(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as usize) as i32);
        let raw = self.initial.mul_f64(factor.min(1e12));
        match self.max_delay {
            Some(max) => raw.min(max),
            None => raw,
        }
    }
}

/// A strategy backed by a plain function.
pub struct FnBackoff<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    f: F,
}

impl<F> FnBackoff<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> BackoffStrategy for FnBackoff<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn delay_for(&self, attempt: usize) -> Duration {
        (self.f)(attempt)
    }
}
