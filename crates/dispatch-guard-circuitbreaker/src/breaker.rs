//! Lock-free failure tracking with derived circuit state.
//!
//! No state machine is stored: whether the circuit is open is computed on
//! every call from the failure count and the time of the last failure. The
//! check-then-act window between reading the state and recording an outcome
//! is accepted; a handful of extra calls slipping through while the circuit
//! trips does not change the steady-state behavior.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Circuit state derived from the tracker, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Below the failure threshold; calls pass through.
    Closed,
    /// At or above the threshold and still inside the open window; calls
    /// are rejected.
    Open,
    /// At or above the threshold but the open window has elapsed; the next
    /// call probes the handler.
    HalfOpen,
}

/// Shared failure tracker for one circuit breaker instance.
///
/// The last-failure time is kept as a nanosecond offset from a
/// construction-time base `Instant`, with 0 meaning "never failed" so the
/// field fits in a single atomic.
pub(crate) struct FailureTracker {
    failures: AtomicUsize,
    last_failure_nanos: AtomicU64,
    base: Instant,
}

impl FailureTracker {
    pub(crate) fn new() -> Self {
        Self {
            failures: AtomicUsize::new(0),
            last_failure_nanos: AtomicU64::new(0),
            base: Instant::now(),
        }
    }

    fn now_nanos(&self) -> u64 {
        // 0 is the never-failed sentinel; a failure recorded in the same
        // nanosecond as construction must not look like one.
        (self.base.elapsed().as_nanos() as u64).max(1)
    }

    pub(crate) fn record_failure(&self) -> usize {
        self.last_failure_nanos
            .store(self.now_nanos(), Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Resets the failure count; returns true if there was anything to
    /// reset.
    pub(crate) fn record_success(&self) -> bool {
        self.failures.swap(0, Ordering::Relaxed) > 0
    }

    pub(crate) fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    pub(crate) fn state(&self, threshold: usize, half_open_after: Duration) -> CircuitState {
        if self.failures.load(Ordering::Relaxed) < threshold {
            return CircuitState::Closed;
        }
        let last = self.last_failure_nanos.load(Ordering::Relaxed);
        if last == 0 {
            // Threshold reached but no failure time recorded yet; treat as
            // probing rather than rejecting forever.
            return CircuitState::HalfOpen;
        }
        let elapsed = self.base.elapsed().saturating_sub(Duration::from_nanos(last));
        if elapsed < half_open_after {
            CircuitState::Open
        } else {
            CircuitState::HalfOpen
        }
    }
}
