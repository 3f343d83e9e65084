use crate::events::LockEvent;
use crate::registry::{InMemoryLockRegistry, LockRegistry};
use dispatch_guard_core::events::{EventListeners, FnListener};
use dispatch_guard_core::{Message, MessageChannel};
use std::sync::Arc;
use std::time::Duration;

pub(crate) type LockKeyFn<P> = Arc<dyn Fn(&Message<P>) -> Option<String> + Send + Sync>;

/// Configuration for the lock advice.
pub struct LockConfig<P> {
    pub(crate) key_fn: LockKeyFn<P>,
    pub(crate) registry: Arc<dyn LockRegistry>,
    pub(crate) wait: Option<Duration>,
    pub(crate) discard_channel: Option<Arc<dyn MessageChannel<P>>>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<LockEvent>,
}

/// Builder for [`LockConfig`]. Constructed with the key function; every
/// other setting has a default.
pub struct LockConfigBuilder<P> {
    key_fn: LockKeyFn<P>,
    registry: Option<Arc<dyn LockRegistry>>,
    wait: Option<Duration>,
    discard_channel: Option<Arc<dyn MessageChannel<P>>>,
    name: String,
    event_listeners: EventListeners<LockEvent>,
}

impl<P> LockConfigBuilder<P> {
    /// Creates a builder deriving lock names with `key_fn`.
    ///
    /// Defaults:
    /// - registry: a fresh [`InMemoryLockRegistry`]
    /// - wait: unbounded
    /// - no discard channel (null-key messages proceed unlocked)
    /// - name: `"<unnamed>"`
    pub fn new<F>(key_fn: F) -> Self
    where
        F: Fn(&Message<P>) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            key_fn: Arc::new(key_fn),
            registry: None,
            wait: None,
            discard_channel: None,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Uses a shared registry instead of a fresh in-memory one, so
    /// several advice instances can contend on the same named locks.
    pub fn registry(mut self, registry: Arc<dyn LockRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Bounds how long acquisition may wait before failing with
    /// [`LockError::AcquireTimeout`](crate::LockError::AcquireTimeout).
    pub fn wait(mut self, wait: Duration) -> Self {
        self.wait = Some(wait);
        self
    }

    /// Diverts messages whose key function returns `None` to `channel`
    /// instead of invoking the handler unlocked.
    pub fn discard_channel(mut self, channel: Arc<dyn MessageChannel<P>>) -> Self {
        self.discard_channel = Some(channel);
        self
    }

    /// Names this advice instance (used in events and logs).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked on acquisition, with the lock name
    /// and the wait that was absorbed.
    pub fn on_lock_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let LockEvent::LockAcquired { key, wait, .. } = event {
                f(key, *wait);
            }
        }));
        self
    }

    /// Registers a callback invoked when acquisition times out, with the
    /// lock name.
    pub fn on_acquire_timed_out<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let LockEvent::AcquireTimedOut { key, .. } = event {
                f(key);
            }
        }));
        self
    }

    /// Registers a callback invoked when a null-key message is diverted.
    pub fn on_null_key_discarded<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, LockEvent::NullKeyDiscarded { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the lock layer.
    pub fn build(self) -> crate::LockLayer<P> {
        crate::LockLayer::new(LockConfig {
            key_fn: self.key_fn,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(InMemoryLockRegistry::new())),
            wait: self.wait,
            discard_channel: self.discard_channel,
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }
}
