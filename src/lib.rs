//! Control core of the printer remote.
//!
//! A BLE keyboard with two buttons that sends "volume down" to a paired
//! phone, which most camera apps treat as the shutter. Everything that
//! decides *what* the remote does lives here and runs on the host:
//!
//! - [`input`] - debounced button sampling
//! - [`report`] - press/release reports on pressed-count changes
//! - [`connection`] - connection edges and the give-up / idle timers
//! - [`indicator`] - non-blocking LED blink schedule
//! - [`remote`] - the loop that ticks all of the above
//!
//! The hardware side (SoftDevice, GPIO, SAADC, flash) is in the embedded
//! binary (`main.rs`, `embedded` feature) and plugs in through
//! [`platform`].
//!
//! Usage: `cargo test` on the host; `cargo run --release --features embedded
//! --target thumbv7em-none-eabihf` on the board.

#![cfg_attr(not(test), no_std)]

pub mod battery;
pub mod bond;
pub mod config;
pub mod connection;
pub mod hid;
pub mod indicator;
pub mod input;
pub mod platform;
pub mod power_logic;
pub mod remote;
pub mod report;
pub mod time;

pub use remote::{Remote, TickOutcome};
