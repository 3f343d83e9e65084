use dispatch_guard_core::AdviceEvent;
use std::time::{Duration, Instant};

/// Events emitted by the retry advice.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An in-process retry is about to be made after sleeping `delay`.
    Retry {
        advice_name: String,
        timestamp: Instant,
        attempt: usize,
        delay: Duration,
    },
    /// Stateful mode recorded the failure and is rethrowing so the
    /// transport redelivers the message; the next attempt is due after
    /// `delay`.
    Rescheduled {
        advice_name: String,
        timestamp: Instant,
        attempt: usize,
        delay: Duration,
    },
    /// The handler succeeded (first try or after retries).
    Success {
        advice_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The policy gave up after `attempts` invocations.
    Error {
        advice_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// A failure was classified non-retryable and propagated untouched.
    IgnoredError {
        advice_name: String,
        timestamp: Instant,
    },
}

impl AdviceEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "Retry",
            RetryEvent::Rescheduled { .. } => "Rescheduled",
            RetryEvent::Success { .. } => "Success",
            RetryEvent::Error { .. } => "Error",
            RetryEvent::IgnoredError { .. } => "IgnoredError",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Rescheduled { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Error { timestamp, .. }
            | RetryEvent::IgnoredError { timestamp, .. } => *timestamp,
        }
    }

    fn advice_name(&self) -> &str {
        match self {
            RetryEvent::Retry { advice_name, .. }
            | RetryEvent::Rescheduled { advice_name, .. }
            | RetryEvent::Success { advice_name, .. }
            | RetryEvent::Error { advice_name, .. }
            | RetryEvent::IgnoredError { advice_name, .. } => advice_name,
        }
    }
}
