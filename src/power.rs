//! Power management - System OFF for battery operation.
//!
//! nRF52840 power modes:
//! - System ON: Normal operation (~3.5 mA advertising, less once connected)
//! - System ON Idle: CPU sleeping between loop ticks
//! - System OFF: Deep sleep, wake on GPIO SENSE (~0.4 µA)
//!
//! Waking from System OFF is a reset: the firmware boots from scratch, the
//! bond comes back from flash and advertising starts again.

use defmt::{info, warn};
use embassy_nrf::pac;
use embassy_nrf::pac::gpio::vals;
use embassy_time::{with_timeout, Duration, Timer};
use nrf_softdevice::raw;
use printer_remote::platform::PinId;
use printer_remote::power_logic::{ShutdownStep, SleepReason};

use crate::{ble, storage};

/// Close the host link, flush the bond to flash, then enter System OFF.
///
/// Each wait is bounded so a stuck link or flash write still powers off.
pub async fn shutdown(reason: SleepReason, wake_pins: &[PinId]) -> ! {
    info!("Shutting down ({})", reason);

    let mut step = ShutdownStep::first(ble::link_up());
    while step != ShutdownStep::PowerOff {
        let limit = Duration::from_millis(u64::from(step.timeout_ms()));
        let done = match step {
            ShutdownStep::CloseLink => with_timeout(limit, ble::close_link()).await,
            ShutdownStep::FlushBond => with_timeout(limit, storage::flush()).await,
            ShutdownStep::PowerOff => Ok(()),
        };
        if done.is_err() {
            warn!("Shutdown step {} timed out", step);
        }
        step = step.next();
    }

    info!("Entering System OFF");
    // Let RTT drain the last log line.
    Timer::after_millis(10).await;

    enter_system_off(wake_pins)
}

/// Arm SENSE-low wake on `wake_pins` and enter System OFF.
///
/// The pins keep their pull-ups so a button press (active-low) pulls the
/// line down and wakes the chip.
fn enter_system_off(wake_pins: &[PinId]) -> ! {
    for pin in wake_pins {
        let port = match pin.port {
            0 => pac::P0,
            _ => pac::P1,
        };
        port.pin_cnf(pin.pin as usize).write(|w| {
            w.set_dir(vals::Dir::INPUT);
            w.set_input(vals::Input::CONNECT);
            w.set_pull(vals::Pull::PULLUP);
            w.set_sense(vals::Sense::LOW);
        });
    }

    unsafe {
        raw::sd_power_system_off();
    }

    // Only reached in debug interface mode, where System OFF is emulated.
    loop {
        cortex_m::asm::wfe();
    }
}
