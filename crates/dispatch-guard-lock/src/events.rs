use dispatch_guard_core::AdviceEvent;
use std::time::{Duration, Instant};

/// Events emitted by the lock advice.
#[derive(Debug, Clone)]
pub enum LockEvent {
    /// The lock was acquired after waiting `wait`.
    LockAcquired {
        advice_name: String,
        timestamp: Instant,
        key: String,
        wait: Duration,
    },
    /// Acquisition gave up after the configured wait.
    AcquireTimedOut {
        advice_name: String,
        timestamp: Instant,
        key: String,
    },
    /// The key function produced no key and the message was diverted to
    /// the discard channel.
    NullKeyDiscarded {
        advice_name: String,
        timestamp: Instant,
    },
}

impl AdviceEvent for LockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LockEvent::LockAcquired { .. } => "LockAcquired",
            LockEvent::AcquireTimedOut { .. } => "AcquireTimedOut",
            LockEvent::NullKeyDiscarded { .. } => "NullKeyDiscarded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            LockEvent::LockAcquired { timestamp, .. }
            | LockEvent::AcquireTimedOut { timestamp, .. }
            | LockEvent::NullKeyDiscarded { timestamp, .. } => *timestamp,
        }
    }

    fn advice_name(&self) -> &str {
        match self {
            LockEvent::LockAcquired { advice_name, .. }
            | LockEvent::AcquireTimedOut { advice_name, .. }
            | LockEvent::NullKeyDiscarded { advice_name, .. } => advice_name,
        }
    }
}
