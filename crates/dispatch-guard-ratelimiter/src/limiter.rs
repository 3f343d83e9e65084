//! Fixed-slot admission scheduling.
//!
//! The limiter keeps one atomic slot per permitted concurrent period. Each
//! reservation takes the next slot round-robin and commits a scheduled
//! start time of `max(now, previous + period)` for it, so at most `rate`
//! starts land in any window of one period. Slots store nanosecond offsets
//! from a construction-time base `Instant` (0 = slot never used), which
//! keeps the whole structure lock-free.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub(crate) struct SlotLimiter {
    slots: Box<[AtomicU64]>,
    cursor: AtomicUsize,
    base: Instant,
    period: Duration,
}

/// Why a reservation was refused.
#[derive(Debug)]
pub(crate) struct WouldExceedDelay {
    /// The wait the caller would have had to absorb.
    pub(crate) required: Duration,
}

impl SlotLimiter {
    /// `rate` is clamped to at least one slot.
    pub(crate) fn new(rate: usize, period: Duration) -> Self {
        let rate = rate.max(1);
        let slots = (0..rate).map(|_| AtomicU64::new(0)).collect();
        Self {
            slots,
            cursor: AtomicUsize::new(0),
            base: Instant::now(),
            period,
        }
    }

    fn now_nanos(&self) -> u64 {
        // 0 is the never-used sentinel for slots.
        (self.base.elapsed().as_nanos() as u64).max(1)
    }

    /// Reserves the next slot and returns how long the caller must wait
    /// before proceeding. Refuses without committing the slot when the wait
    /// would exceed `max_delay`.
    pub(crate) fn reserve(&self, max_delay: Option<Duration>) -> Result<Duration, WouldExceedDelay> {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        let slot = &self.slots[idx];
        let period = self.period.as_nanos() as u64;

        let mut prev = slot.load(Ordering::Relaxed);
        loop {
            let now = self.now_nanos();
            let scheduled = if prev == 0 { now } else { (prev + period).max(now) };
            let wait = Duration::from_nanos(scheduled.saturating_sub(now));

            if let Some(max) = max_delay {
                if wait > max {
                    return Err(WouldExceedDelay { required: wait });
                }
            }

            match slot.compare_exchange_weak(prev, scheduled, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return Ok(wait),
                Err(actual) => prev = actual,
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn rate(&self) -> usize {
        self.slots.len()
    }
}
