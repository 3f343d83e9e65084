use crate::limiter::SlotLimiter;
use crate::{RateLimiter, RateLimiterConfig};
use std::sync::Arc;
use tower::Layer;

/// A [`Layer`] applying admission rate limiting to a handler service.
///
/// Every service produced by one layer shares the layer's slot limiter, so
/// clones of a wrapped handler draw from the same admission budget.
pub struct RateLimiterLayer {
    config: Arc<RateLimiterConfig>,
    limiter: Arc<SlotLimiter>,
}

impl RateLimiterLayer {
    /// Creates a layer from an explicit configuration.
    pub fn new(config: RateLimiterConfig) -> Self {
        let limiter = Arc::new(SlotLimiter::new(config.rate, config.period));
        Self {
            config: Arc::new(config),
            limiter,
        }
    }

    /// Returns a builder for configuring a rate limiter layer.
    pub fn builder() -> crate::RateLimiterConfigBuilder {
        crate::RateLimiterConfigBuilder::new()
    }
}

impl Clone for RateLimiterLayer {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiter<S>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimiter::new(service, Arc::clone(&self.config), Arc::clone(&self.limiter))
    }
}
