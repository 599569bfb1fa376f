//! Shared test doubles for the printer-remote integration tests.

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use printer_remote::hid::keyboard::{KeyCode, MAX_REPORT_KEYS};
use printer_remote::input::Button;
use printer_remote::platform::{
    AdvertisingConfig, BatteryMonitor, ConnectionProvider, DigitalIo, Level, PinId,
};

// ============================================================================
// Mock transport
// ============================================================================

/// Every call the control loop made into the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostCall {
    Report([KeyCode; MAX_REPORT_KEYS]),
    Release,
    StartAdvertising,
    StopAdvertising,
    Battery(u8),
}

#[derive(Default)]
pub struct MockHost {
    pub connected: bool,
    pub calls: Vec<HostCall>,
}

impl MockHost {
    /// Report and release calls only.
    pub fn key_calls(&self) -> Vec<HostCall> {
        self.calls
            .iter()
            .copied()
            .filter(|c| matches!(c, HostCall::Report(_) | HostCall::Release))
            .collect()
    }

    pub fn count(&self, call: HostCall) -> usize {
        self.calls.iter().filter(|&&c| c == call).count()
    }

    pub fn battery_calls(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HostCall::Battery(level) => Some(*level),
                _ => None,
            })
            .collect()
    }
}

impl ConnectionProvider for MockHost {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn send_key_report(&mut self, keycodes: &[KeyCode; MAX_REPORT_KEYS], _modifier: u8) {
        self.calls.push(HostCall::Report(*keycodes));
    }

    fn send_key_release(&mut self) {
        self.calls.push(HostCall::Release);
    }

    fn start_advertising(&mut self, _config: &AdvertisingConfig) {
        self.calls.push(HostCall::StartAdvertising);
    }

    fn stop_advertising(&mut self) {
        self.calls.push(HostCall::StopAdvertising);
    }

    fn report_battery(&mut self, percent: u8) {
        self.calls.push(HostCall::Battery(percent));
    }
}

// ============================================================================
// Mock pins
// ============================================================================

/// Buttons listed in `pressed` read low; everything written is recorded.
#[derive(Default)]
pub struct MockIo {
    pub pressed: Vec<PinId>,
    pub reads: usize,
    pub writes: Vec<(PinId, Level)>,
}

impl MockIo {
    pub fn press(&mut self, pins: &[PinId]) {
        self.pressed = pins.to_vec();
    }

    pub fn release_all(&mut self) {
        self.pressed.clear();
    }

    /// Last level written to `pin`.
    pub fn level(&self, pin: PinId) -> Option<Level> {
        self.writes
            .iter()
            .rev()
            .find(|(p, _)| *p == pin)
            .map(|(_, level)| *level)
    }
}

impl DigitalIo for MockIo {
    fn read_pin(&mut self, pin: PinId) -> Level {
        self.reads += 1;
        if self.pressed.contains(&pin) {
            Level::Low
        } else {
            Level::High
        }
    }

    fn write_pin(&mut self, pin: PinId, level: Level) {
        self.writes.push((pin, level));
    }
}

// ============================================================================
// Mock battery
// ============================================================================

pub struct MockBattery(pub Option<u8>);

impl BatteryMonitor for MockBattery {
    fn level_percent(&mut self) -> Option<u8> {
        self.0
    }
}

// ============================================================================
// Button tables
// ============================================================================

pub const PIN_A: PinId = PinId::new(0, 2);
pub const PIN_B: PinId = PinId::new(0, 3);

pub const BUTTON_A: Button = Button::new(PIN_A, 0x81);
pub const BUTTON_B: Button = Button::new(PIN_B, 0x80);

pub const TWO_BUTTONS: [Button; 2] = [BUTTON_A, BUTTON_B];

/// Seven buttons on P0.20..P0.26 with codes 0x04..0x0A.
pub fn seven_buttons() -> [Button; 7] {
    core::array::from_fn(|i| Button::new(PinId::new(0, 20 + i as u8), 0x04 + i as u8))
}
