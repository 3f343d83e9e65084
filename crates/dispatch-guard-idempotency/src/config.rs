use crate::events::IdempotencyEvent;
use crate::selector::DuplicateSelector;
use dispatch_guard_core::events::{EventListeners, FnListener};
use dispatch_guard_core::MessageChannel;
use std::sync::Arc;

/// Configuration for the idempotent receiver advice.
pub struct IdempotencyConfig<P> {
    pub(crate) selector: Arc<dyn DuplicateSelector<P>>,
    pub(crate) discard_channel: Option<Arc<dyn MessageChannel<P>>>,
    pub(crate) reject_with_error: bool,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<IdempotencyEvent>,
}

/// Builder for [`IdempotencyConfig`]. Constructed with the duplicate
/// selector; every other setting has a default.
pub struct IdempotencyConfigBuilder<P> {
    selector: Arc<dyn DuplicateSelector<P>>,
    discard_channel: Option<Arc<dyn MessageChannel<P>>>,
    reject_with_error: bool,
    name: String,
    event_listeners: EventListeners<IdempotencyEvent>,
}

impl<P> IdempotencyConfigBuilder<P> {
    /// Creates a builder classifying messages with `selector`.
    ///
    /// Defaults:
    /// - no discard channel
    /// - duplicates are not rejected with an error
    /// - name: `"<unnamed>"`
    ///
    /// With neither a channel nor rejection configured, duplicates are
    /// tagged with the `duplicate-message` header and passed through.
    pub fn new<D>(selector: D) -> Self
    where
        D: DuplicateSelector<P> + 'static,
    {
        Self {
            selector: Arc::new(selector),
            discard_channel: None,
            reject_with_error: false,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Diverts duplicates to `channel` instead of passing them through.
    pub fn discard_channel(mut self, channel: Arc<dyn MessageChannel<P>>) -> Self {
        self.discard_channel = Some(channel);
        self
    }

    /// Raises [`IdempotencyError::DuplicateRejected`](crate::IdempotencyError::DuplicateRejected)
    /// for duplicates, after any configured diversion.
    pub fn reject_with_error(mut self, reject: bool) -> Self {
        self.reject_with_error = reject;
        self
    }

    /// Names this advice instance (used in events and logs).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when a duplicate is diverted.
    pub fn on_duplicate_discarded<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, IdempotencyEvent::DuplicateDiscarded { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked when a duplicate is tagged and passed
    /// through.
    pub fn on_duplicate_tagged<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, IdempotencyEvent::DuplicateTagged { .. }) {
                f();
            }
        }));
        self
    }

    /// Registers a callback invoked when a duplicate is rejected.
    pub fn on_duplicate_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, IdempotencyEvent::DuplicateRejected { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the idempotent receiver layer.
    pub fn build(self) -> crate::IdempotencyLayer<P> {
        crate::IdempotencyLayer::new(IdempotencyConfig {
            selector: self.selector,
            discard_channel: self.discard_channel,
            reject_with_error: self.reject_with_error,
            name: self.name,
            event_listeners: self.event_listeners,
        })
    }
}
