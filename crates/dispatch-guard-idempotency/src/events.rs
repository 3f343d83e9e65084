use dispatch_guard_core::AdviceEvent;
use std::time::Instant;

/// Events emitted by the idempotent receiver advice.
#[derive(Debug, Clone)]
pub enum IdempotencyEvent {
    /// A duplicate was diverted to the discard channel.
    DuplicateDiscarded {
        advice_name: String,
        timestamp: Instant,
    },
    /// A duplicate was tagged with the `duplicate-message` header and
    /// passed through to the handler.
    DuplicateTagged {
        advice_name: String,
        timestamp: Instant,
    },
    /// A duplicate was rejected with an error.
    DuplicateRejected {
        advice_name: String,
        timestamp: Instant,
    },
}

impl AdviceEvent for IdempotencyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            IdempotencyEvent::DuplicateDiscarded { .. } => "DuplicateDiscarded",
            IdempotencyEvent::DuplicateTagged { .. } => "DuplicateTagged",
            IdempotencyEvent::DuplicateRejected { .. } => "DuplicateRejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            IdempotencyEvent::DuplicateDiscarded { timestamp, .. }
            | IdempotencyEvent::DuplicateTagged { timestamp, .. }
            | IdempotencyEvent::DuplicateRejected { timestamp, .. } => *timestamp,
        }
    }

    fn advice_name(&self) -> &str {
        match self {
            IdempotencyEvent::DuplicateDiscarded { advice_name, .. }
            | IdempotencyEvent::DuplicateTagged { advice_name, .. }
            | IdempotencyEvent::DuplicateRejected { advice_name, .. } => advice_name,
        }
    }
}
