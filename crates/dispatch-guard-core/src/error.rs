//! A unified error type for stacked advices.
//!
//! Each advice crate returns its own error enum wrapping the inner handler
//! error (`Inner(E)`), which preserves the original failure's identity while
//! the distinguished outcomes (circuit open, rate limited, lock timeout,
//! retry exhaustion, duplicate rejection) stay pattern-matchable. When
//! several advices are stacked, [`GuardError`] flattens those wrappers into
//! one error type: the advice crates provide `From<their error> for
//! GuardError<E>` (the impls live there to avoid circular dependencies).

use std::fmt;
use std::time::Duration;

/// The distinguished failures of every dispatch-guard advice, plus the
/// wrapped application error.
#[derive(Debug, Clone)]
pub enum GuardError<E> {
    /// The circuit breaker rejected the call without invoking the handler.
    CircuitOpen {
        /// Configured breaker name, if any.
        name: Option<String>,
    },

    /// The rate limiter rejected the call because the computed wait exceeded
    /// the configured maximum delay.
    RateLimited {
        /// The wait that would have been required, when known.
        required: Option<Duration>,
    },

    /// The lock advice could not acquire the keyed lock in time.
    LockUnavailable {
        /// The derived lock key.
        key: String,
    },

    /// The idempotent receiver rejected a duplicate message.
    DuplicateRejected,

    /// The retry policy gave up.
    RetryExhausted {
        /// Total invocations made.
        attempts: usize,
        /// The final failure.
        last: Box<GuardError<E>>,
        /// Failures from earlier attempts, oldest first.
        suppressed: Vec<GuardError<E>>,
    },

    /// The wrapped handler itself failed.
    Application(E),
}

impl<E> fmt::Display for GuardError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardError::CircuitOpen { name } => match name {
                Some(n) => write!(f, "circuit breaker '{}' is open", n),
                None => write!(f, "circuit breaker is open"),
            },
            GuardError::RateLimited { required } => match required {
                Some(d) => write!(f, "rate limited; {:?} wait required", d),
                None => write!(f, "rate limited"),
            },
            GuardError::LockUnavailable { key } => {
                write!(f, "could not acquire lock for key '{}'", key)
            }
            GuardError::DuplicateRejected => write!(f, "duplicate message rejected"),
            GuardError::RetryExhausted { attempts, last, .. } => {
                write!(f, "retry exhausted after {} attempts: {}", attempts, last)
            }
            GuardError::Application(e) => write!(f, "handler error: {}", e),
        }
    }
}

impl<E> std::error::Error for GuardError<E> where E: std::error::Error {}

impl<E> GuardError<E> {
    /// Returns true for a circuit-breaker rejection.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GuardError::CircuitOpen { .. })
    }

    /// Returns true for a rate-limiter rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GuardError::RateLimited { .. })
    }

    /// Returns true for a lock acquisition failure.
    pub fn is_lock_unavailable(&self) -> bool {
        matches!(self, GuardError::LockUnavailable { .. })
    }

    /// Returns true for a rejected duplicate.
    pub fn is_duplicate_rejected(&self) -> bool {
        matches!(self, GuardError::DuplicateRejected)
    }

    /// Returns true for retry exhaustion.
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, GuardError::RetryExhausted { .. })
    }

    /// Returns true if this wraps a handler error.
    pub fn is_application(&self) -> bool {
        matches!(self, GuardError::Application(_))
    }

    /// Extracts the handler error, if this is an `Application` variant.
    pub fn application_error(self) -> Option<E> {
        match self {
            GuardError::Application(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the wrapped handler error type, recursing through retry
    /// exhaustion causes.
    pub fn map_application<F, T>(self, f: &F) -> GuardError<T>
    where
        F: Fn(E) -> T,
    {
        match self {
            GuardError::CircuitOpen { name } => GuardError::CircuitOpen { name },
            GuardError::RateLimited { required } => GuardError::RateLimited { required },
            GuardError::LockUnavailable { key } => GuardError::LockUnavailable { key },
            GuardError::DuplicateRejected => GuardError::DuplicateRejected,
            GuardError::RetryExhausted {
                attempts,
                last,
                suppressed,
            } => GuardError::RetryExhausted {
                attempts,
                last: Box::new(last.map_application(f)),
                suppressed: suppressed
                    .into_iter()
                    .map(|e| e.map_application(f))
                    .collect(),
            },
            GuardError::Application(e) => GuardError::Application(f(e)),
        }
    }
}
