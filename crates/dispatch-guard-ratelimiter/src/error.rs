use dispatch_guard_core::GuardError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the rate limiter advice.
#[derive(Debug, Clone, Error)]
pub enum RateLimiterError<E> {
    /// Admission would require waiting longer than the configured bound;
    /// the handler was not invoked.
    #[error("rate limit exceeded: would need to wait {required:?} (max {max_delay:?})")]
    RateLimited {
        /// The wait admission would have required.
        required: Duration,
        /// The configured bound that was exceeded.
        max_delay: Duration,
    },

    /// The handler was invoked and failed.
    #[error("inner handler error: {0}")]
    Inner(E),
}

impl<E> RateLimiterError<E> {
    /// Returns true if the call was refused admission.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RateLimiterError::RateLimited { .. })
    }
}

impl<E> From<E> for RateLimiterError<E> {
    fn from(err: E) -> Self {
        RateLimiterError::Inner(err)
    }
}

impl<E> From<RateLimiterError<E>> for GuardError<E> {
    fn from(err: RateLimiterError<E>) -> Self {
        match err {
            RateLimiterError::RateLimited { required, .. } => GuardError::RateLimited {
                required: Some(required),
            },
            RateLimiterError::Inner(e) => GuardError::Application(e),
        }
    }
}
