use crate::state::RetryStateCache;
use crate::{Retry, RetryConfig};
use std::sync::Arc;
use tower::Layer;

/// A [`Layer`] applying retry behavior to a handler service.
///
/// Every service produced by one layer shares the layer's stateful retry
/// cache, so clones of a wrapped handler observe the same per-key backoff
/// progress.
pub struct RetryLayer<Req, Res, E> {
    config: Arc<RetryConfig<Req, Res, E>>,
    states: Arc<RetryStateCache<E>>,
}

impl<Req, Res, E> RetryLayer<Req, Res, E> {
    /// Creates a layer from an explicit configuration.
    pub fn new(config: RetryConfig<Req, Res, E>) -> Self {
        let states = Arc::new(RetryStateCache::new(config.state_capacity));
        Self {
            config: Arc::new(config),
            states,
        }
    }

    /// Returns a builder for configuring a retry layer.
    pub fn builder() -> crate::RetryConfigBuilder<Req, Res, E> {
        crate::RetryConfigBuilder::new()
    }
}

impl<Req, Res, E> Clone for RetryLayer<Req, Res, E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            states: Arc::clone(&self.states),
        }
    }
}

impl<S, Req, Res, E> Layer<S> for RetryLayer<Req, Res, E> {
    type Service = Retry<S, Req, Res, E>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, Arc::clone(&self.config), Arc::clone(&self.states))
    }
}
