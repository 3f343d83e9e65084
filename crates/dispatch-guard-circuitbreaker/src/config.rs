use crate::events::CircuitBreakerEvent;
use dispatch_guard_core::events::{EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

pub(crate) type FailurePredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Configuration for the circuit breaker advice.
pub struct CircuitBreakerConfig<E> {
    pub(crate) failure_threshold: usize,
    pub(crate) half_open_after: Duration,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) failure_predicate: Option<FailurePredicate<E>>,
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder<E> {
    failure_threshold: usize,
    half_open_after: Duration,
    name: String,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    failure_predicate: Option<FailurePredicate<E>>,
}

impl<E> Default for CircuitBreakerConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> CircuitBreakerConfigBuilder<E> {
    /// Creates a builder with defaults.
    ///
    /// Defaults:
    /// - failure_threshold: 5
    /// - half_open_after: 1s
    /// - every error counts as a failure
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            half_open_after: Duration::from_secs(1),
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
            failure_predicate: None,
        }
    }

    /// Number of consecutive (unreset) failures that opens the circuit.
    /// Clamped to at least 1.
    pub fn failure_threshold(mut self, threshold: usize) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// How long after the last failure the circuit stays open before the
    /// next call is allowed through as a probe.
    pub fn half_open_after(mut self, duration: Duration) -> Self {
        self.half_open_after = duration;
        self
    }

    /// Names this advice instance (used in events and logs).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Restricts which handler errors advance the failure counter; errors
    /// the predicate rejects propagate without affecting the circuit.
    pub fn failure_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.failure_predicate = Some(Arc::new(predicate));
        self
    }

    /// Registers a callback invoked when a call passes through.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, CircuitBreakerEvent::CallPermitted { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked when a call is rejected, with the
    /// current failure count.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::CallRejected { failures, .. } = event {
                f(*failures);
            }
        }));
        self
    }

    /// Registers a callback invoked when a failure is recorded, with the
    /// new failure count.
    pub fn on_failure_recorded<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CircuitBreakerEvent::FailureRecorded { failures, .. } = event {
                f(*failures);
            }
        }));
        self
    }

    /// Registers a callback invoked when a success resets the circuit.
    pub fn on_circuit_reset<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, CircuitBreakerEvent::CircuitReset { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the circuit breaker layer.
    pub fn build(self) -> crate::CircuitBreakerLayer<E> {
        crate::CircuitBreakerLayer::new(CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            half_open_after: self.half_open_after,
            name: self.name,
            event_listeners: self.event_listeners,
            failure_predicate: self.failure_predicate,
        })
    }
}
