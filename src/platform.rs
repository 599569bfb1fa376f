//! Boundary to the services the control loop calls into.
//!
//! The wireless transport, pin I/O and battery gauge are external
//! collaborators. The core only sees these traits; `main.rs` implements
//! them on top of the SoftDevice and embassy-nrf, the integration tests
//! implement them with recording mocks.

use crate::hid::keyboard::{KeyCode, MAX_REPORT_KEYS};

/// Digital pin level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// GPIO identity as `(port, pin)`, e.g. P1.02 is `PinId::new(1, 2)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId {
    pub port: u8,
    pub pin: u8,
}

impl PinId {
    pub const fn new(port: u8, pin: u8) -> Self {
        Self { port, pin }
    }

    /// Flat pin number (`port * 32 + pin`) as used by the nRF GPIO blocks.
    pub const fn number(&self) -> u8 {
        self.port * 32 + self.pin
    }
}

/// Pin read/write primitives.
pub trait DigitalIo {
    fn read_pin(&mut self, pin: PinId) -> Level;
    fn write_pin(&mut self, pin: PinId, level: Level);
}

/// How the transport should advertise while no host is connected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdvertisingConfig {
    /// 16-bit service UUID placed in the advertisement.
    pub service_uuid16: u16,
    /// GAP appearance value.
    pub appearance: u16,
    pub device_name: &'static str,
    /// Fast advertising interval (0.625 ms units).
    pub fast_interval: u16,
    /// Slow advertising interval used after the fast timeout (0.625 ms units).
    pub slow_interval: u16,
    /// Seconds spent in fast mode before switching to the slow interval.
    pub fast_timeout_secs: u16,
    /// Resume advertising automatically when a host disconnects.
    pub restart_on_disconnect: bool,
}

/// The wireless HID transport.
///
/// Every call is fire-and-forget: failures are absorbed by the
/// implementation and never surface to the control loop.
pub trait ConnectionProvider {
    fn is_connected(&self) -> bool;

    /// Send a keyboard input report. Unused slots hold `KEY_NONE`.
    fn send_key_report(&mut self, keycodes: &[KeyCode; MAX_REPORT_KEYS], modifier: u8);

    /// Send an all-keys-released report.
    fn send_key_release(&mut self);

    fn start_advertising(&mut self, config: &AdvertisingConfig);

    fn stop_advertising(&mut self);

    /// Publish the battery level (percent) to the host.
    fn report_battery(&mut self, percent: u8);
}

/// Source of the most recent battery measurement.
pub trait BatteryMonitor {
    /// Battery level in percent, or `None` until the first sample exists.
    fn level_percent(&mut self) -> Option<u8>;
}
