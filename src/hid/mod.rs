//! HID report types sent to the paired host.

pub mod keyboard;

pub use keyboard::{KeyCode, KeyboardReport, KEY_NONE, MAX_REPORT_KEYS};
