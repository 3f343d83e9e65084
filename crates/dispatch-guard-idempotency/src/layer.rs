use crate::selector::DuplicateSelector;
use crate::{IdempotencyConfig, IdempotentReceiver};
use std::sync::Arc;
use tower::Layer;

/// A [`Layer`] applying duplicate filtering to a handler service.
///
/// Every service produced by one layer shares the layer's selector, so
/// clones of a wrapped handler consult the same seen-key state.
pub struct IdempotencyLayer<P> {
    config: Arc<IdempotencyConfig<P>>,
}

impl<P> IdempotencyLayer<P> {
    /// Creates a layer from an explicit configuration.
    pub fn new(config: IdempotencyConfig<P>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Returns a builder classifying messages with `selector`.
    pub fn builder<D>(selector: D) -> crate::IdempotencyConfigBuilder<P>
    where
        D: DuplicateSelector<P> + 'static,
    {
        crate::IdempotencyConfigBuilder::new(selector)
    }
}

impl<P> Clone for IdempotencyLayer<P> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, P> Layer<S> for IdempotencyLayer<P> {
    type Service = IdempotentReceiver<S, P>;

    fn layer(&self, service: S) -> Self::Service {
        IdempotentReceiver::new(service, Arc::clone(&self.config))
    }
}
