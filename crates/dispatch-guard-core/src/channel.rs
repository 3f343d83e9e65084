//! Discard/divert destinations.
//!
//! Advices that reject or divert a message hand it to a [`MessageChannel`].
//! The contract is deliberately narrow: `send` returns `false` when the
//! message could not be delivered, and never panics or returns an error —
//! a failed divert is observable but must not replace the advice's own
//! outcome.

use crate::message::Message;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A destination messages can be sent to.
pub trait MessageChannel<P>: Send + Sync {
    /// Attempts to deliver the message; returns `false` if it was not
    /// accepted (e.g. the destination is full).
    fn send(&self, message: Message<P>) -> bool;
}

/// A bounded in-memory channel backed by a queue.
///
/// The default discard destination: diverted messages accumulate until
/// drained. `send` returns `false` once the capacity is reached.
#[derive(Debug)]
pub struct BufferChannel<P> {
    capacity: usize,
    queue: Mutex<VecDeque<Message<P>>>,
}

impl<P> BufferChannel<P> {
    /// Creates a channel holding at most `capacity` messages (clamped to 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Removes and returns all buffered messages, oldest first.
    pub fn drain(&self) -> Vec<Message<P>> {
        self.queue.lock().unwrap().drain(..).collect()
    }

    /// Returns the number of buffered messages.
    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Returns true if no messages are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: Send> MessageChannel<P> for BufferChannel<P> {
    fn send(&self, message: Message<P>) -> bool {
        let mut queue = self.queue.lock().unwrap();
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back(message);
        true
    }
}
