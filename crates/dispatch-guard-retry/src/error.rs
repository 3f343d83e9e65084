use dispatch_guard_core::GuardError;
use thiserror::Error;

/// Errors returned by the retry advice.
#[derive(Debug, Clone, Error)]
pub enum RetryError<E> {
    /// The policy gave up. Carries the final failure plus every prior
    /// attempt's failure as suppressed context, oldest first.
    #[error("retry policy exhausted after {attempts} attempts")]
    Exhausted {
        /// Total invocations made.
        attempts: usize,
        /// The final failure.
        last: E,
        /// Failures from earlier attempts.
        suppressed: Vec<E>,
    },

    /// A failure propagated without being consumed by the policy: either
    /// classified non-retryable, or rethrown by the stateful mode for
    /// external redelivery.
    #[error("inner handler error: {0}")]
    Inner(E),
}

impl<E> RetryError<E> {
    /// Returns true if the policy gave up.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// Returns a reference to the most recent underlying failure.
    pub fn last(&self) -> &E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Inner(e) => e,
        }
    }

    /// Consumes the error, returning the most recent underlying failure.
    pub fn into_last(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Inner(e) => e,
        }
    }
}

impl<E> From<E> for RetryError<E> {
    fn from(err: E) -> Self {
        RetryError::Inner(err)
    }
}

impl<E> From<RetryError<E>> for GuardError<E> {
    fn from(err: RetryError<E>) -> Self {
        match err {
            RetryError::Exhausted {
                attempts,
                last,
                suppressed,
            } => GuardError::RetryExhausted {
                attempts,
                last: Box::new(GuardError::Application(last)),
                suppressed: suppressed.into_iter().map(GuardError::Application).collect(),
            },
            RetryError::Inner(e) => GuardError::Application(e),
        }
    }
}
