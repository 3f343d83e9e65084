use crate::breaker::FailureTracker;
use crate::{CircuitBreaker, CircuitBreakerConfig};
use std::sync::Arc;
use tower::Layer;

/// A [`Layer`] applying circuit breaker behavior to a handler service.
///
/// Every service produced by one layer shares the layer's failure tracker,
/// so clones of a wrapped handler trip and reset the same circuit.
pub struct CircuitBreakerLayer<E> {
    config: Arc<CircuitBreakerConfig<E>>,
    tracker: Arc<FailureTracker>,
}

impl<E> CircuitBreakerLayer<E> {
    /// Creates a layer from an explicit configuration.
    pub fn new(config: CircuitBreakerConfig<E>) -> Self {
        Self {
            config: Arc::new(config),
            tracker: Arc::new(FailureTracker::new()),
        }
    }

    /// Returns a builder for configuring a circuit breaker layer.
    pub fn builder() -> crate::CircuitBreakerConfigBuilder<E> {
        crate::CircuitBreakerConfigBuilder::new()
    }
}

impl<E> Clone for CircuitBreakerLayer<E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            tracker: Arc::clone(&self.tracker),
        }
    }
}

impl<S, E> Layer<S> for CircuitBreakerLayer<E> {
    type Service = CircuitBreaker<S, E>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(service, Arc::clone(&self.config), Arc::clone(&self.tracker))
    }
}
