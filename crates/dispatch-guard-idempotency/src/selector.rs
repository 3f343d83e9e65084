//! Duplicate detection strategies.

use dispatch_guard_core::Message;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Default bound on remembered message keys for [`FirstSeenSelector`].
pub const DEFAULT_SEEN_CAPACITY: usize = 1000;

/// Decides whether a message is an original (accepted) or a duplicate.
///
/// Implementations may keep state; `accept` is called once per message and
/// a `true` return commits the message as seen.
pub trait DuplicateSelector<P>: Send + Sync {
    /// Returns true to accept the message, false to treat it as a
    /// duplicate.
    fn accept(&self, message: &Message<P>) -> bool;
}

/// Selector from a plain closure, for stateless or externally-backed
/// checks.
pub struct FnSelector<F> {
    f: F,
}

impl<F> FnSelector<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<P, F> DuplicateSelector<P> for FnSelector<F>
where
    F: Fn(&Message<P>) -> bool + Send + Sync,
{
    fn accept(&self, message: &Message<P>) -> bool {
        (self.f)(message)
    }
}

/// Accepts the first message carrying each key and treats every later
/// sighting as a duplicate, remembering at most `capacity` keys in LRU
/// order. Evicting a key forgets it: its next sighting is accepted again.
pub struct FirstSeenSelector<P> {
    key_fn: Box<dyn Fn(&Message<P>) -> String + Send + Sync>,
    seen: Mutex<LruCache<String, ()>>,
}

impl<P> FirstSeenSelector<P> {
    /// Creates a selector with the default capacity.
    pub fn new<F>(key_fn: F) -> Self
    where
        F: Fn(&Message<P>) -> String + Send + Sync + 'static,
    {
        Self::with_capacity(key_fn, DEFAULT_SEEN_CAPACITY)
    }

    /// Creates a selector remembering at most `capacity` keys. Clamped to
    /// at least 1.
    pub fn with_capacity<F>(key_fn: F, capacity: usize) -> Self
    where
        F: Fn(&Message<P>) -> String + Send + Sync + 'static,
    {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or(NonZeroUsize::new(DEFAULT_SEEN_CAPACITY).unwrap());
        Self {
            key_fn: Box::new(key_fn),
            seen: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl<P> DuplicateSelector<P> for FirstSeenSelector<P>
where
    P: Send + Sync,
{
    fn accept(&self, message: &Message<P>) -> bool {
        let key = (self.key_fn)(message);
        // put returns the previous value for the key; None means this is
        // the first sighting.
        self.seen.lock().unwrap().put(key, ()).is_none()
    }
}
