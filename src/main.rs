//! Printer remote firmware for the nRF52840.
//!
//! Boots the SoftDevice, restores the host bond from flash, spawns the BLE,
//! storage and battery tasks, then runs the control loop on a fixed 1 ms
//! ticker. When the loop decides to sleep the host link is closed, the bond
//! flushed to flash and the chip goes to System OFF; a button press boots it
//! again.

#![no_std]
#![no_main]

mod ble;
mod board;
mod error;
mod power;
mod storage;

use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{self, Input, Output, OutputDrive, Pull};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::saadc::{self, ChannelConfig, Saadc};
use embassy_nrf::bind_interrupts;
use embassy_time::{Duration, Instant, Ticker};
use nrf_softdevice::{Flash, Softdevice};
use printer_remote::config;
use printer_remote::connection::{ConnectionEdge, ConnectionState};
use printer_remote::report::ReportEvent;
use printer_remote::time::Millis;
use printer_remote::{Remote, TickOutcome};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use ble::services::Server;
use ble::BleLink;
use board::{BatteryGauge, BoardIo};
use error::Error;

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
});

fn now_millis() -> Millis {
    // Truncation is fine: all time arithmetic wraps.
    Instant::now().as_millis() as Millis
}

fn log_outcome(outcome: &TickOutcome, state: ConnectionState, since_last_connected: Millis) {
    match outcome.edge {
        Some(ConnectionEdge::Established) => info!("Connection established"),
        Some(ConnectionEdge::Lost) => info!("Connection lost"),
        None => {}
    }

    match outcome.report {
        Some(ReportEvent::Press { count }) => info!("Reporting {} buttons", count),
        Some(ReportEvent::Release) => info!("Releasing buttons"),
        None => {}
    }

    if let Some(percent) = outcome.battery {
        info!("Battery level {}%", percent);
    }

    if outcome.indicator.is_some() && state != ConnectionState::Connected {
        info!(
            "Connecting {}/{}ms",
            since_last_connected,
            config::CONNECTION_GIVE_UP_DURATION_MS
        );
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Printer remote starting");

    // The SoftDevice reserves interrupt priorities 0, 1 and 4.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);
    interrupt::SAADC.set_priority(Priority::P3);

    let io = BoardIo::new(
        [
            (config::BUTTON_PINS[0], Input::new(p.P1_02, Pull::Up)),
            (config::BUTTON_PINS[1], Input::new(p.P0_04, Pull::Up)),
        ],
        (
            config::CONNECTION_LED_PIN,
            Output::new(p.P1_10, gpio::Level::Low, OutputDrive::Standard),
        ),
    );

    let vbat = ChannelConfig::single_ended(p.P0_29);
    let saadc = Saadc::new(p.SAADC, Irqs, saadc::Config::default(), [vbat]);

    let sd = Softdevice::enable(&ble::softdevice_config());
    static SERVER: StaticCell<Server> = StaticCell::new();
    let server: &'static Server = SERVER.init(unwrap!(Server::new(sd).map_err(Error::from)));
    let sd: &'static Softdevice = sd;

    unwrap!(spawner.spawn(ble::softdevice_task(sd)));

    let mut flash = Flash::take(sd);
    let bond = storage::load_bond(&mut flash).await;

    unwrap!(spawner.spawn(storage::bond_store_task(flash)));
    unwrap!(spawner.spawn(ble::peripheral_task(sd, server, bond)));
    unwrap!(spawner.spawn(board::battery_task(saadc)));

    let mut remote = Remote::new(&config::BUTTONS, BleLink::new(sd, server), io, BatteryGauge);
    remote.begin(now_millis());

    let mut ticker = Ticker::every(Duration::from_millis(u64::from(config::LOOP_TICK_MS)));
    loop {
        let now = now_millis();
        let outcome = remote.tick(now);
        if !outcome.is_quiet() {
            log_outcome(
                &outcome,
                remote.connection_state(),
                remote.state().connection.since_last_connected(now),
            );
        }

        if let Some(reason) = outcome.sleep {
            power::shutdown(reason, &config::BUTTON_PINS).await;
        }

        ticker.next().await;
    }
}
