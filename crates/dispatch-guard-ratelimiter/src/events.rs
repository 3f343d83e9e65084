use dispatch_guard_core::AdviceEvent;
use std::time::{Duration, Instant};

/// Events emitted by the rate limiter advice.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// Admission was granted after waiting `wait` (zero when a slot was
    /// free).
    PermitAcquired {
        advice_name: String,
        timestamp: Instant,
        wait: Duration,
    },
    /// Admission was refused because the wait would exceed the configured
    /// bound.
    PermitRejected {
        advice_name: String,
        timestamp: Instant,
        required: Duration,
    },
}

impl AdviceEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::PermitAcquired { .. } => "PermitAcquired",
            RateLimiterEvent::PermitRejected { .. } => "PermitRejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::PermitAcquired { timestamp, .. }
            | RateLimiterEvent::PermitRejected { timestamp, .. } => *timestamp,
        }
    }

    fn advice_name(&self) -> &str {
        match self {
            RateLimiterEvent::PermitAcquired { advice_name, .. }
            | RateLimiterEvent::PermitRejected { advice_name, .. } => advice_name,
        }
    }
}
