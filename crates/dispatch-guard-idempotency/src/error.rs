use dispatch_guard_core::GuardError;
use thiserror::Error;

/// Errors returned by the idempotent receiver advice.
#[derive(Debug, Clone, Error)]
pub enum IdempotencyError<E> {
    /// The message was recognized as a duplicate and rejection was
    /// configured; the handler was not invoked.
    #[error("duplicate message rejected")]
    DuplicateRejected,

    /// The handler was invoked and failed.
    #[error("inner handler error: {0}")]
    Inner(E),
}

impl<E> IdempotencyError<E> {
    /// Returns true if a duplicate was rejected.
    pub fn is_duplicate_rejected(&self) -> bool {
        matches!(self, IdempotencyError::DuplicateRejected)
    }
}

impl<E> From<E> for IdempotencyError<E> {
    fn from(err: E) -> Self {
        IdempotencyError::Inner(err)
    }
}

impl<E> From<IdempotencyError<E>> for GuardError<E> {
    fn from(err: IdempotencyError<E>) -> Self {
        match err {
            IdempotencyError::DuplicateRejected => GuardError::DuplicateRejected,
            IdempotencyError::Inner(e) => GuardError::Application(e),
        }
    }
}
