use crate::backoff::{BackoffStrategy, ExponentialBackoff, FixedDelay};
use crate::error::RetryError;
use crate::events::RetryEvent;
use crate::policy::RetryPolicy;
use crate::state::DEFAULT_STATE_CAPACITY;
use dispatch_guard_core::events::{EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

pub(crate) type StateKeyFn<Req> = Arc<dyn Fn(&Req) -> String + Send + Sync>;
pub(crate) type FreshPredicate<Req> = Arc<dyn Fn(&Req) -> bool + Send + Sync>;
pub(crate) type RecoveryFn<Req, Res, E> =
    Arc<dyn Fn(&Req, RetryError<E>) -> Result<Res, RetryError<E>> + Send + Sync>;

/// Configuration for the retry advice.
pub struct RetryConfig<Req, Res, E> {
    pub(crate) policy: RetryPolicy<E>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) state_key: Option<StateKeyFn<Req>>,
    pub(crate) fresh_when: Option<FreshPredicate<Req>>,
    pub(crate) recovery: Option<RecoveryFn<Req, Res, E>>,
    pub(crate) state_capacity: usize,
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<Req, Res, E> {
    max_attempts: usize,
    backoff: Option<Arc<dyn BackoffStrategy>>,
    retry_predicate: Option<Arc<dyn Fn(&E) -> bool + Send + Sync>>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
    state_key: Option<StateKeyFn<Req>>,
    fresh_when: Option<FreshPredicate<Req>>,
    recovery: Option<RecoveryFn<Req, Res, E>>,
    state_capacity: usize,
}

impl<Req, Res, E> Default for RetryConfigBuilder<Req, Res, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res, E> RetryConfigBuilder<Req, Res, E> {
    /// Creates a builder with defaults.
    ///
    /// Defaults:
    /// - max_attempts: 3
    /// - backoff: exponential, 100ms initial interval
    /// - mode: stateless (no state key function)
    /// - state cache capacity: 100
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            backoff: None,
            retry_predicate: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
            state_key: None,
            fresh_when: None,
            recovery: None,
            state_capacity: DEFAULT_STATE_CAPACITY,
        }
    }

    /// Sets the total number of invocations allowed, including the first
    /// attempt. Clamped to at least 1.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Uses the same delay before every retry.
    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.backoff = Some(Arc::new(FixedDelay::new(delay)));
        self
    }

    /// Uses doubling backoff starting at `initial`.
    pub fn exponential_backoff(mut self, initial: Duration) -> Self {
        self.backoff = Some(Arc::new(ExponentialBackoff::new(initial)));
        self
    }

    /// Uses a custom backoff strategy.
    pub fn backoff<B>(mut self, backoff: B) -> Self
    where
        B: BackoffStrategy + 'static,
    {
        self.backoff = Some(Arc::new(backoff));
        self
    }

    /// Restricts retries to failures the predicate accepts; everything else
    /// propagates untouched.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Names this advice instance (used in events and logs).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Switches to stateful mode: retries are driven by redelivery of
    /// messages carrying the same derived key instead of an in-process
    /// sleep loop.
    ///
    /// The surrounding transport must resubmit a failed message with the
    /// same key (broker requeue, transactional rollback); the advice
    /// rethrows the first retryable failure immediately and only sleeps the
    /// *remaining* backoff when the key comes back early.
    pub fn state_key<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&Req) -> String + Send + Sync + 'static,
    {
        self.state_key = Some(Arc::new(key_fn));
        self
    }

    /// In stateful mode, forces a request the predicate accepts to be
    /// treated as a first sighting, discarding any in-flight episode for
    /// its key.
    pub fn fresh_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Req) -> bool + Send + Sync + 'static,
    {
        self.fresh_when = Some(Arc::new(predicate));
        self
    }

    /// Bounds the number of concurrently-tracked stateful retry keys.
    /// The cache evicts the least-recently-used key when full, silently
    /// dropping its backoff progress.
    pub fn state_capacity(mut self, capacity: usize) -> Self {
        self.state_capacity = capacity;
        self
    }

    /// Consults `recovery` instead of propagating exhaustion. The hook may
    /// produce a substitute result or return the (possibly transformed)
    /// error.
    pub fn recover<F>(mut self, recovery: F) -> Self
    where
        F: Fn(&Req, RetryError<E>) -> Result<Res, RetryError<E>> + Send + Sync + 'static,
    {
        self.recovery = Some(Arc::new(recovery));
        self
    }

    /// Registers a callback invoked before each in-process retry, with the
    /// attempt number (1-indexed) and the delay about to be slept.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked when stateful mode rethrows for
    /// external redelivery, with the attempt number and the computed delay.
    pub fn on_rescheduled<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Rescheduled { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked on success, with the total number of
    /// invocations made.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when the policy gives up, with the
    /// total number of invocations made.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Error { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when a failure is classified
    /// non-retryable.
    pub fn on_ignored_error<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, RetryEvent::IgnoredError { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the retry layer.
    pub fn build(self) -> crate::RetryLayer<Req, Res, E> {
        let backoff = self
            .backoff
            .unwrap_or_else(|| Arc::new(ExponentialBackoff::new(Duration::from_millis(100))));

        let mut policy = RetryPolicy::new(self.max_attempts, backoff);
        policy.predicate = self.retry_predicate;

        crate::RetryLayer::new(RetryConfig {
            policy,
            name: self.name,
            event_listeners: self.event_listeners,
            state_key: self.state_key,
            fresh_when: self.fresh_when,
            recovery: self.recovery,
            state_capacity: self.state_capacity,
        })
    }
}
