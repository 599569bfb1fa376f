//! Button sampling.
//!
//! Buttons are active-low with pull-ups. Sampling is gated by the activity
//! timer: a scan happens only while connected and at least
//! `REPORT_BUTTONS_CHANGED_INTERVAL_MS` after the last button activity,
//! which doubles as the debounce.

use heapless::Vec;

use crate::hid::keyboard::{KeyCode, KEY_NONE, MAX_REPORT_KEYS};
use crate::platform::{DigitalIo, Level, PinId};
use crate::time::{IntervalTimer, Millis};

/// Static configuration of one physical button. A button's identity is
/// its position in the button table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Button {
    pub pin: PinId,
    pub code: KeyCode,
}

impl Button {
    pub const fn new(pin: PinId, code: KeyCode) -> Self {
        Self { pin, code }
    }
}

/// Codes of the buttons held down during one scan, in button order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonSampleSet {
    codes: Vec<KeyCode, MAX_REPORT_KEYS>,
}

impl ButtonSampleSet {
    pub const fn new() -> Self {
        Self { codes: Vec::new() }
    }

    pub fn count(&self) -> usize {
        self.codes.len()
    }

    pub fn is_full(&self) -> bool {
        self.codes.is_full()
    }

    pub fn codes(&self) -> &[KeyCode] {
        &self.codes
    }

    /// Append a code. Returns `false` when the report buffer is already full.
    pub fn push(&mut self, code: KeyCode) -> bool {
        self.codes.push(code).is_ok()
    }

    /// Fixed-size report buffer, unused slots filled with `KEY_NONE`.
    pub fn to_report_codes(&self) -> [KeyCode; MAX_REPORT_KEYS] {
        let mut out = [KEY_NONE; MAX_REPORT_KEYS];
        out[..self.codes.len()].copy_from_slice(&self.codes);
        out
    }
}

/// Polls the configured button pins.
pub struct InputSampler<'a> {
    buttons: &'a [Button],
}

impl<'a> InputSampler<'a> {
    pub const fn new(buttons: &'a [Button]) -> Self {
        Self { buttons }
    }

    /// Read every button pin once.
    ///
    /// Scanning stops as soon as the report buffer holds
    /// `MAX_REPORT_KEYS` codes; further pressed buttons are dropped.
    pub fn scan<D: DigitalIo>(&self, io: &mut D) -> ButtonSampleSet {
        let mut sample = ButtonSampleSet::new();
        for button in self.buttons {
            if io.read_pin(button.pin) != Level::Low {
                continue;
            }
            sample.push(button.code);
            if sample.is_full() {
                break;
            }
        }
        sample
    }

    /// Gated scan for one loop iteration.
    ///
    /// Returns `None` when disconnected or when the activity timer has not
    /// yet reached its interval. A scan with pressed buttons re-arms the
    /// activity timer at `now`.
    pub fn poll<D: DigitalIo>(
        &self,
        now: Millis,
        connected: bool,
        activity: &mut IntervalTimer,
        io: &mut D,
    ) -> Option<ButtonSampleSet> {
        if !connected || !activity.is_due(now) {
            return None;
        }

        let sample = self.scan(io);
        if sample.count() > 0 {
            activity.rearm(now);
        }
        Some(sample)
    }
}
