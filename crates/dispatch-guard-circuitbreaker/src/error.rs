use dispatch_guard_core::GuardError;
use thiserror::Error;

/// Errors returned by the circuit breaker advice.
#[derive(Debug, Clone, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the handler was not invoked.
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen {
        /// Configured advice name.
        name: String,
    },

    /// The handler was invoked and failed.
    #[error("inner handler error: {0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Returns true if the call was rejected without reaching the handler.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::CircuitOpen { .. })
    }
}

impl<E> From<E> for CircuitBreakerError<E> {
    fn from(err: E) -> Self {
        CircuitBreakerError::Inner(err)
    }
}

impl<E> From<CircuitBreakerError<E>> for GuardError<E> {
    fn from(err: CircuitBreakerError<E>) -> Self {
        match err {
            CircuitBreakerError::CircuitOpen { name } => GuardError::CircuitOpen { name: Some(name) },
            CircuitBreakerError::Inner(e) => GuardError::Application(e),
        }
    }
}
