//! Millisecond timebase shared by every component of the control loop.
//!
//! Timestamps come from a free-running counter that wraps, so durations are
//! always computed with wrapping subtraction and never by comparing absolute
//! values.

/// Milliseconds from the monotonic clock, truncated to 32 bits.
pub type Millis = u32;

/// Time elapsed from `earlier` to `now`, correct across counter wraparound.
pub const fn elapsed(now: Millis, earlier: Millis) -> Millis {
    now.wrapping_sub(earlier)
}

/// A `(last event, interval)` pair compared against the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntervalTimer {
    last: Millis,
    interval: Millis,
}

impl IntervalTimer {
    pub const fn new(interval: Millis) -> Self {
        Self { last: 0, interval }
    }

    /// Create a timer whose last event is `now`.
    pub const fn armed_at(now: Millis, interval: Millis) -> Self {
        Self {
            last: now,
            interval,
        }
    }

    pub const fn last(&self) -> Millis {
        self.last
    }

    pub fn elapsed(&self, now: Millis) -> Millis {
        elapsed(now, self.last)
    }

    /// `true` once at least `interval` has passed since the last event.
    pub fn is_due(&self, now: Millis) -> bool {
        self.elapsed(now) >= self.interval
    }

    /// Record an event at `now`.
    pub fn rearm(&mut self, now: Millis) {
        self.last = now;
    }
}
