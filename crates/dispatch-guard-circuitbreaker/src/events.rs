use dispatch_guard_core::AdviceEvent;
use std::time::Instant;

/// Events emitted by the circuit breaker advice.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// A call was allowed through to the handler.
    CallPermitted {
        advice_name: String,
        timestamp: Instant,
    },
    /// A call was rejected because the circuit is open.
    CallRejected {
        advice_name: String,
        timestamp: Instant,
        failures: usize,
    },
    /// The handler failed and the failure counter advanced.
    FailureRecorded {
        advice_name: String,
        timestamp: Instant,
        failures: usize,
    },
    /// A success reset a non-zero failure counter back to zero.
    CircuitReset {
        advice_name: String,
        timestamp: Instant,
    },
}

impl AdviceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::CallPermitted { .. } => "CallPermitted",
            CircuitBreakerEvent::CallRejected { .. } => "CallRejected",
            CircuitBreakerEvent::FailureRecorded { .. } => "FailureRecorded",
            CircuitBreakerEvent::CircuitReset { .. } => "CircuitReset",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. }
            | CircuitBreakerEvent::CircuitReset { timestamp, .. } => *timestamp,
        }
    }

    fn advice_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::CallPermitted { advice_name, .. }
            | CircuitBreakerEvent::CallRejected { advice_name, .. }
            | CircuitBreakerEvent::FailureRecorded { advice_name, .. }
            | CircuitBreakerEvent::CircuitReset { advice_name, .. } => advice_name,
        }
    }
}
