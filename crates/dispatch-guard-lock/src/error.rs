use dispatch_guard_core::GuardError;
use thiserror::Error;

/// Errors returned by the lock advice.
#[derive(Debug, Clone, Error)]
pub enum LockError<E> {
    /// The lock for `key` could not be acquired within the configured
    /// wait; the handler was not invoked.
    #[error("timed out acquiring lock '{key}'")]
    AcquireTimeout {
        /// The lock name derived from the message.
        key: String,
    },

    /// The handler was invoked and failed.
    #[error("inner handler error: {0}")]
    Inner(E),
}

impl<E> LockError<E> {
    /// Returns true if lock acquisition timed out.
    pub fn is_acquire_timeout(&self) -> bool {
        matches!(self, LockError::AcquireTimeout { .. })
    }
}

impl<E> From<E> for LockError<E> {
    fn from(err: E) -> Self {
        LockError::Inner(err)
    }
}

impl<E> From<LockError<E>> for GuardError<E> {
    fn from(err: LockError<E>) -> Self {
        match err {
            LockError::AcquireTimeout { key } => GuardError::LockUnavailable { key },
            LockError::Inner(e) => GuardError::Application(e),
        }
    }
}
