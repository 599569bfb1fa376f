//! Connection indicator LED.
//!
//! One short pulse per blink interval: every second while looking for a
//! host, every ten seconds once paired. The LED is dark while asleep.
//! Nothing here waits; each call compares elapsed time against the
//! interval and only touches the pin when the wanted level changes.

use crate::config::{
    CONNECTED_BLINK_INTERVAL_MS, CONNECTING_BLINK_INTERVAL_MS, CONNECTION_BLINK_ON_DURATION_MS,
};
use crate::platform::{DigitalIo, Level, PinId};
use crate::time::{elapsed, Millis};

/// Blink interval for the given connection state.
pub const fn blink_interval(connected: bool) -> Millis {
    if connected {
        CONNECTED_BLINK_INTERVAL_MS
    } else {
        CONNECTING_BLINK_INTERVAL_MS
    }
}

/// Wanted LED level `since_cycle_start` ms into a blink cycle.
pub const fn pulse_level(since_cycle_start: Millis) -> Level {
    if since_cycle_start <= CONNECTION_BLINK_ON_DURATION_MS {
        Level::High
    } else {
        Level::Low
    }
}

#[derive(Debug)]
pub struct IndicatorScheduler {
    pin: PinId,
    /// Last level written to the pin.
    level: Level,
    /// Start of the current blink cycle.
    cycle_start: Millis,
}

impl IndicatorScheduler {
    pub const fn new(pin: PinId, now: Millis) -> Self {
        Self {
            pin,
            level: Level::Low,
            cycle_start: now,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn cycle_start(&self) -> Millis {
        self.cycle_start
    }

    /// Advance the blink schedule. Returns the new level if the pin was written.
    ///
    /// The elapsed time is taken before a due cycle is re-armed, so the
    /// re-arming iteration itself stays dark and the pulse starts on the
    /// next one. Each interval therefore produces exactly one pulse.
    pub fn update<D: DigitalIo>(&mut self, now: Millis, connected: bool, io: &mut D) -> Option<Level> {
        let since = elapsed(now, self.cycle_start);
        if since >= blink_interval(connected) {
            self.cycle_start = now;
        }
        self.set(pulse_level(since), io)
    }

    /// Drive the pin to `level` unless it is already there.
    pub fn set<D: DigitalIo>(&mut self, level: Level, io: &mut D) -> Option<Level> {
        if level == self.level {
            return None;
        }
        self.level = level;
        io.write_pin(self.pin, level);
        Some(level)
    }

    /// Write the current level unconditionally (power-on pin setup).
    pub fn sync<D: DigitalIo>(&self, io: &mut D) {
        io.write_pin(self.pin, self.level);
    }

    /// Start a new blink cycle at `now`.
    pub fn restart(&mut self, now: Millis) {
        self.cycle_start = now;
    }
}
