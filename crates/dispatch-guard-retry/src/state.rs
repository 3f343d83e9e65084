//! Per-key backoff progress for the stateful retry mode.
//!
//! The cache is a bounded LRU map from retry key to [`RetryState`]. A single
//! mutex makes get-or-create-and-touch atomic, so duplicate redeliveries of
//! the same key from two tasks cannot corrupt the recency order or lose an
//! entry. Eviction on insert silently drops the evicted key's progress; its
//! next arrival starts a fresh episode.

use crate::policy::RetryPolicy;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default bound on concurrently-tracked retry keys.
pub const DEFAULT_STATE_CAPACITY: usize = 100;

/// Backoff progress for one retry key. Never exists without at least one
/// recorded failure.
struct RetryState<E> {
    failures: Vec<E>,
    attempt: usize,
    due_at: Instant,
}

/// What [`RetryStateCache::record_failure`] decided.
pub(crate) enum FailureOutcome<E> {
    /// The episode continues; the next attempt is due after `delay`.
    Rescheduled { attempt: usize, delay: Duration },
    /// The policy is exhausted; the state was removed. `failures` holds
    /// every recorded failure for the episode, oldest first, including the
    /// one just recorded.
    Exhausted { attempts: usize, failures: Vec<E> },
}

pub(crate) struct RetryStateCache<E> {
    entries: Mutex<LruCache<String, RetryState<E>>>,
}

impl<E> RetryStateCache<E> {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or(NonZeroUsize::new(DEFAULT_STATE_CAPACITY).unwrap());
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Remaining backoff wait for `key`, touching its recency. `None` means
    /// no episode is in flight (first sighting, or progress was evicted).
    pub(crate) fn remaining_delay(&self, key: &str) -> Option<Duration> {
        let mut entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .map(|state| state.due_at.saturating_duration_since(Instant::now()))
    }

    /// Starts a fresh episode for `key` after its first retryable failure.
    pub(crate) fn begin_episode(&self, key: String, failure: E, delay: Duration) {
        let state = RetryState {
            failures: vec![failure],
            attempt: 1,
            due_at: Instant::now() + delay,
        };
        let mut entries = self.entries.lock().unwrap();
        entries.push(key, state);
    }

    /// Records a failure on a redelivered key and advances the backoff
    /// cursor, removing the state when the policy is exhausted.
    ///
    /// If the state was evicted since the caller last saw it, a fresh
    /// episode is started instead.
    pub(crate) fn record_failure(
        &self,
        key: &str,
        failure: E,
        policy: &RetryPolicy<E>,
    ) -> FailureOutcome<E> {
        let mut entries = self.entries.lock().unwrap();
        let exhausted = match entries.get_mut(key) {
            Some(state) => {
                state.failures.push(failure);
                state.attempt += 1;
                if state.attempt >= policy.max_attempts() {
                    true
                } else {
                    let delay = policy.delay_for(state.attempt - 1);
                    state.due_at = Instant::now() + delay;
                    return FailureOutcome::Rescheduled {
                        attempt: state.attempt,
                        delay,
                    };
                }
            }
            None => {
                let delay = policy.delay_for(0);
                entries.push(
                    key.to_string(),
                    RetryState {
                        failures: vec![failure],
                        attempt: 1,
                        due_at: Instant::now() + delay,
                    },
                );
                return FailureOutcome::Rescheduled { attempt: 1, delay };
            }
        };

        debug_assert!(exhausted);
        match entries.pop(key) {
            Some(state) => FailureOutcome::Exhausted {
                attempts: state.attempt,
                failures: state.failures,
            },
            // Unreachable: the entry was present above and the lock is held.
            None => FailureOutcome::Rescheduled {
                attempt: 0,
                delay: Duration::ZERO,
            },
        }
    }

    /// Clears the episode for `key` after a success, returning how many
    /// failed attempts it had accumulated.
    pub(crate) fn clear(&self, key: &str) -> Option<usize> {
        let mut entries = self.entries.lock().unwrap();
        entries.pop(key).map(|state| state.attempt)
    }

    /// Drops any in-flight episode for `key` without reading it.
    pub(crate) fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.pop(key);
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains(key)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}
