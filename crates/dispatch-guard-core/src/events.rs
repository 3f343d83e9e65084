//! Event system for advice observability.
//!
//! Each advice crate defines an event enum implementing [`AdviceEvent`] and
//! emits through an [`EventListeners`] collection configured at build time.
//! Builder `on_*` callbacks are registered as [`FnListener`]s over these
//! events.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// An event emitted by an advice.
pub trait AdviceEvent: Send + Sync + fmt::Debug {
    /// A short static tag for the event kind (e.g. `"CallRejected"`).
    fn event_type(&self) -> &'static str;

    /// When the event occurred.
    fn timestamp(&self) -> Instant;

    /// The configured name of the advice instance that emitted the event.
    fn advice_name(&self) -> &str;
}

/// A consumer of advice events.
pub trait EventListener<E: AdviceEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

/// A set of listeners sharing one event type.
///
/// Emission isolates listeners from each other: a panicking listener is
/// caught so the remaining listeners still observe the event.
#[derive(Clone)]
pub struct EventListeners<E: AdviceEvent> {
    listeners: Vec<Arc<dyn EventListener<E>>>,
}

impl<E: AdviceEvent> EventListeners<E> {
    /// Creates an empty listener set.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Registers a listener.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Delivers `event` to every listener, isolating panics.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }

    /// Returns true if no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: AdviceEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A listener backed by a plain function.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _marker: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: AdviceEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
