//! Retry policy: attempt bound, backoff, and retryability classification.

use crate::backoff::BackoffStrategy;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a given failure should be retried.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// The rule driving a retry advice: how many total invocations to allow,
/// how long to wait between them, and which failures count as retryable.
pub struct RetryPolicy<E> {
    max_attempts: usize,
    backoff: Arc<dyn BackoffStrategy>,
    pub(crate) predicate: Option<RetryPredicate<E>>,
}

impl<E> RetryPolicy<E> {
    /// Creates a policy allowing `max_attempts` total invocations (clamped
    /// to at least 1, so exhaustion always carries a recorded failure).
    pub fn new(max_attempts: usize, backoff: Arc<dyn BackoffStrategy>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            predicate: None,
        }
    }

    /// Total invocations allowed, including the initial attempt.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Returns true if the policy classifies `error` as retryable.
    pub fn should_retry(&self, error: &E) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(error),
            None => true,
        }
    }

    /// The delay before retry number `attempt` (0-indexed).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        self.backoff.delay_for(attempt)
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            backoff: Arc::clone(&self.backoff),
            predicate: self.predicate.clone(),
        }
    }
}
