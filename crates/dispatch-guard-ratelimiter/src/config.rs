use crate::events::RateLimiterEvent;
use dispatch_guard_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the rate limiter advice.
pub struct RateLimiterConfig {
    pub(crate) rate: usize,
    pub(crate) period: Duration,
    pub(crate) max_delay: Option<Duration>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    rate: usize,
    period: Duration,
    max_delay: Option<Duration>,
    name: String,
    event_listeners: EventListeners<RateLimiterEvent>,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterConfigBuilder {
    /// Creates a builder with defaults.
    ///
    /// Defaults:
    /// - rate: 1
    /// - period: 1s
    /// - max_delay: unbounded (callers wait as long as admission requires)
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            rate: 1,
            period: Duration::from_secs(1),
            max_delay: None,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Number of calls admitted per period. Clamped to at least 1.
    pub fn rate(mut self, rate: usize) -> Self {
        self.rate = rate.max(1);
        self
    }

    /// Length of the admission window.
    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Bounds how long a call may wait for admission; waits beyond the
    /// bound are rejected instead of slept.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Names this advice instance (used in events and logs).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when admission is granted, with the
    /// wait that was absorbed.
    pub fn on_permit_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::PermitAcquired { wait, .. } = event {
                f(*wait);
            }
        }));
        self
    }

    /// Registers a callback invoked when admission is refused, with the
    /// wait that would have been required.
    pub fn on_permit_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateLimiterEvent::PermitRejected { required, .. } = event {
                f(*required);
            }
        }));
        self
    }

    /// Builds the rate limiter layer.
    pub fn build(self) -> crate::RateLimiterLayer {
        crate::RateLimiterLayer::new(RateLimiterConfig {
            rate: self.rate,
            period: self.period,
            max_delay: self.max_delay,
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }
}
