//! Named lock lookup.
//!
//! A registry maps lock names to `tokio::sync::Mutex` instances so that
//! every handler asking for the same name contends on the same lock. The
//! in-memory implementation creates locks lazily and never drops them; the
//! trait seam exists so a distributed registry can be swapped in.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Source of named locks shared across handler clones.
pub trait LockRegistry: Send + Sync {
    /// Returns the lock registered under `key`, creating it if absent.
    fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>>;
}

/// Process-local registry of lazily-created named locks.
#[derive(Default)]
pub struct InMemoryLockRegistry {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl InMemoryLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of locks created so far.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().unwrap().is_empty()
    }
}

impl LockRegistry for InMemoryLockRegistry {
    fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        match locks.get(key) {
            Some(lock) => Arc::clone(lock),
            None => {
                let lock = Arc::new(tokio::sync::Mutex::new(()));
                locks.insert(key.to_string(), Arc::clone(&lock));
                lock
            }
        }
    }
}
