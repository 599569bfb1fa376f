//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

use crate::hid::keyboard::{KeyCode, KEY_VOLUME_DOWN};
use crate::input::Button;
use crate::platform::{AdvertisingConfig, PinId};
use crate::time::Millis;

// GPIO pin assignments (Adafruit Feather nRF52840 Express)
//
// These are logical ids; the matching `embassy_nrf::peripherals::*` pins
// are bound in `main.rs`.  Adjust for your own board.
//
//   Board user switch → P1.02
//   Remote jack (A0)  → P0.04  (pin next to ground)
//   Connection LED    → P1.10  (blue "conn" LED)
//   VBAT divider      → P0.29  (AIN5, 1:2)

/// Number of mapped buttons.
pub const BUTTON_COUNT: usize = 2;

/// Button pins (mapping below matches button order).
pub const BUTTON_PINS: [PinId; BUTTON_COUNT] = [PinId::new(1, 2), PinId::new(0, 4)];

/// Key code sent for each button. A volume key triggers the camera shutter
/// on most phones.
pub const BUTTON_MAPPING: [KeyCode; BUTTON_COUNT] = [KEY_VOLUME_DOWN, KEY_VOLUME_DOWN];

/// Static button table built from the pin and key mappings above.
pub const BUTTONS: [Button; BUTTON_COUNT] = [
    Button::new(BUTTON_PINS[0], BUTTON_MAPPING[0]),
    Button::new(BUTTON_PINS[1], BUTTON_MAPPING[1]),
];

/// Pin driving the connection indicator LED.
pub const CONNECTION_LED_PIN: PinId = PinId::new(1, 10);

// Timing

/// How often to blink if connected.
pub const CONNECTED_BLINK_INTERVAL_MS: Millis = 10_000;

/// How often to blink if not connected.
pub const CONNECTING_BLINK_INTERVAL_MS: Millis = 1_000;

/// How long to attempt to connect to a host before giving up and going to sleep.
pub const CONNECTION_GIVE_UP_DURATION_MS: Millis = 30_000;

/// How long the LED stays on when blinking.
pub const CONNECTION_BLINK_ON_DURATION_MS: Millis = 10;

/// Minimum interval at which to check/report button presses.
pub const REPORT_BUTTONS_CHANGED_INTERVAL_MS: Millis = 1_000;

/// Sleep while connected after this long without a button press.
pub const IDLE_SLEEP_DURATION_MS: Millis = 15 * 60 * 1_000;

/// Re-report the battery level at this interval while connected.
pub const BATTERY_REPORT_INTERVAL_MS: Millis = 60_000;

/// How often the battery voltage is sampled.
pub const BATTERY_SAMPLE_INTERVAL_MS: Millis = 30_000;

/// Control loop wake cadence (ms). Matches the clock granularity.
pub const LOOP_TICK_MS: Millis = 1;

/// Before System OFF: how long to wait for the host link to close.
pub const SHUTDOWN_LINK_DOWN_TIMEOUT_MS: Millis = 1_000;

/// Before System OFF: how long to wait for the bond to reach flash.
pub const SHUTDOWN_BOND_FLUSH_TIMEOUT_MS: Millis = 2_000;

// BLE

/// Advertised device name (also the GAP device name).
pub const DEVICE_NAME: &str = "Printer remote";

/// Device Information Service strings.
pub const DEVICE_MANUFACTURER: &str = "printer-remote";
pub const DEVICE_MODEL: &str = "Printer remote v1";

/// GAP appearance: HID keyboard.
pub const APPEARANCE_HID_KEYBOARD: u16 = 0x03C1;

/// HID-over-GATT service UUID.
pub const HID_SERVICE_UUID: u16 = 0x1812;

/// Radio TX power (dBm).
pub const BLE_TX_POWER_DBM: i8 = 4;

/// Advertising intervals are in 0.625 ms units: 32 = 20 ms, 244 = 152.5 ms.
pub const ADVERTISING: AdvertisingConfig = AdvertisingConfig {
    service_uuid16: HID_SERVICE_UUID,
    appearance: APPEARANCE_HID_KEYBOARD,
    device_name: DEVICE_NAME,
    fast_interval: 32,
    slow_interval: 244,
    fast_timeout_secs: 30,
    restart_on_disconnect: true,
};

/// BLE connection interval range (in 1.25 ms units).
pub const BLE_CONN_INTERVAL_MIN: u16 = 6;
pub const BLE_CONN_INTERVAL_MAX: u16 = 24;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 4;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

// Bond storage

/// Flash page index where bond storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for bond storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;

// Device Information Service PnP ID

/// Vendor ID source: 0x02 = USB Implementer's Forum.
pub const PNP_VENDOR_ID_SOURCE: u8 = 0x02;

/// "pid.codes" open-source test VID/PID. Replace with your own allocation.
pub const PNP_VENDOR_ID: u16 = 0x1209;
pub const PNP_PRODUCT_ID: u16 = 0x0001;
pub const PNP_PRODUCT_VERSION: u16 = 0x0100;
