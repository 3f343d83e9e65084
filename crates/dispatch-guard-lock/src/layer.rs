use crate::{Lock, LockConfig};
use dispatch_guard_core::Message;
use std::sync::Arc;
use tower::Layer;

/// A [`Layer`] applying keyed mutual exclusion to a handler service.
///
/// Every service produced by one layer shares the layer's registry, so
/// clones of a wrapped handler contend on the same named locks.
pub struct LockLayer<P> {
    config: Arc<LockConfig<P>>,
}

impl<P> LockLayer<P> {
    /// Creates a layer from an explicit configuration.
    pub fn new(config: LockConfig<P>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Returns a builder deriving lock names with `key_fn`.
    pub fn builder<F>(key_fn: F) -> crate::LockConfigBuilder<P>
    where
        F: Fn(&Message<P>) -> Option<String> + Send + Sync + 'static,
    {
        crate::LockConfigBuilder::new(key_fn)
    }
}

impl<P> Clone for LockLayer<P> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, P> Layer<S> for LockLayer<P> {
    type Service = Lock<S, P>;

    fn layer(&self, service: S) -> Self::Service {
        Lock::new(service, Arc::clone(&self.config))
    }
}
