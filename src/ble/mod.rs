//! Bluetooth Low Energy subsystem.
//!
//! This module drives the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **Services** - Device Information, Battery and HID-over-GATT
//!    (keyboard) registered on the GATT server.
//! 2. **Bonder** - Just-Works pairing with a single remembered host.
//! 3. **Peripheral task** - advertises (fast, then slow) when told to,
//!    accepts the host connection and serves GATT until it drops.
//!
//! The control loop talks to this module only through [`BleLink`], its
//! [`ConnectionProvider`] implementation. Advertising commands reach the
//! peripheral task through a [`Signal`]; the live connection is shared
//! through a blocking mutex so `is_connected` never awaits.

pub mod bonder;
pub mod services;

use core::cell::RefCell;
use core::mem;
use core::pin::pin;

use defmt::{info, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use nrf_softdevice::ble::advertisement_builder::{
    AdvertisementDataType, Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload,
    ServiceList, ServiceUuid16,
};
use nrf_softdevice::ble::peripheral::{self, AdvertiseError, ConnectableAdvertisement};
use nrf_softdevice::ble::security::SecurityHandler;
use nrf_softdevice::ble::{gatt_server, Connection, TxPower};
use nrf_softdevice::{raw, Softdevice};
use printer_remote::bond::BondRecord;
use printer_remote::config;
use printer_remote::hid::keyboard::{KeyCode, KeyboardReport, KEYBOARD_REPORT_SIZE, MAX_REPORT_KEYS};
use printer_remote::platform::{AdvertisingConfig, ConnectionProvider};
use static_cell::StaticCell;

use crate::error::Error;
use bonder::Bonder;
use services::Server;

/// Commands from the control loop to the peripheral task.
#[derive(Clone, Copy)]
pub enum AdvertisingCommand {
    Start(AdvertisingConfig),
    Stop,
}

static ADVERTISING: Signal<CriticalSectionRawMutex, AdvertisingCommand> = Signal::new();

/// The current host link, if any.
static CONNECTION: Mutex<CriticalSectionRawMutex, RefCell<Option<Connection>>> =
    Mutex::new(RefCell::new(None));

/// Raised each time the peripheral task lets go of a host link.
static LINK_DOWN: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// `true` while the peripheral task is serving a host link.
pub fn link_up() -> bool {
    CONNECTION.lock(|c| c.borrow().is_some())
}

/// Ask the peripheral task to drop the host link and wait until it has.
pub async fn close_link() {
    ADVERTISING.signal(AdvertisingCommand::Stop);
    while link_up() {
        LINK_DOWN.wait().await;
    }
}

fn current_connection() -> Option<Connection> {
    CONNECTION
        .lock(|c| c.borrow().clone())
        .filter(|conn| conn.handle().is_some())
}

fn set_connection(conn: Option<Connection>) {
    CONNECTION.lock(|c| *c.borrow_mut() = conn);
}

/// SoftDevice configuration: one peripheral link, 32.768 kHz crystal.
pub fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_XTAL as u8,
            rc_ctiv: 0,
            rc_temp_ctiv: 0,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_20_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 256 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: config::DEVICE_NAME.as_ptr() as _,
            current_len: config::DEVICE_NAME.len() as u16,
            max_len: config::DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// [`ConnectionProvider`] backed by the SoftDevice GATT server.
pub struct BleLink {
    sd: &'static Softdevice,
    server: &'static Server,
}

impl BleLink {
    pub fn new(sd: &'static Softdevice, server: &'static Server) -> Self {
        Self { sd, server }
    }

    fn notify(&self, report: &KeyboardReport) {
        let Some(conn) = current_connection() else {
            return;
        };

        let mut buf = [0u8; KEYBOARD_REPORT_SIZE];
        report.serialize(&mut buf);
        if let Err(e) = self.server.hid.send_report(&conn, &buf) {
            warn!("Key report not delivered: {}", e);
        }
    }
}

impl ConnectionProvider for BleLink {
    fn is_connected(&self) -> bool {
        current_connection().is_some()
    }

    fn send_key_report(&mut self, keycodes: &[KeyCode; MAX_REPORT_KEYS], modifier: u8) {
        self.notify(&KeyboardReport::new(*keycodes, modifier));
    }

    fn send_key_release(&mut self) {
        self.notify(&KeyboardReport::empty());
    }

    fn start_advertising(&mut self, config: &AdvertisingConfig) {
        ADVERTISING.signal(AdvertisingCommand::Start(*config));
    }

    fn stop_advertising(&mut self) {
        ADVERTISING.signal(AdvertisingCommand::Stop);
    }

    fn report_battery(&mut self, percent: u8) {
        let conn = current_connection();
        if let Err(e) = self.server.bas.set_level(self.sd, conn.as_ref(), percent) {
            warn!("Battery level not updated: {}", e);
        }
    }
}

fn tx_power(dbm: i8) -> TxPower {
    match dbm {
        4.. => TxPower::Plus4dBm,
        0..=3 => TxPower::ZerodBm,
        -4..=-1 => TxPower::Minus4dBm,
        -8..=-5 => TxPower::Minus8dBm,
        -12..=-9 => TxPower::Minus12dBm,
        -16..=-13 => TxPower::Minus16dBm,
        -20..=-17 => TxPower::Minus20dBm,
        _ => TxPower::Minus40dBm,
    }
}

fn advertisement(config: &AdvertisingConfig) -> LegacyAdvertisementPayload {
    LegacyAdvertisementBuilder::new()
        .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
        .services_16(
            ServiceList::Complete,
            &[ServiceUuid16::from_u16(config.service_uuid16)],
        )
        .raw(AdvertisementDataType::APPEARANCE, &config.appearance.to_le_bytes())
        .full_name(config.device_name)
        .build()
}

/// Advertise at the fast interval until the fast timeout, then keep going
/// at the slow interval until a host connects.
async fn advertise(
    sd: &'static Softdevice,
    config: &AdvertisingConfig,
    bonder: &'static Bonder,
) -> Result<Connection, AdvertiseError> {
    let adv_data = advertisement(config);
    let scan_data: [u8; 0] = [];

    let fast = peripheral::Config {
        interval: u32::from(config.fast_interval),
        timeout: Some(config.fast_timeout_secs * 100),
        tx_power: tx_power(config::BLE_TX_POWER_DBM),
        ..Default::default()
    };
    let adv = ConnectableAdvertisement::ScannableUndirected {
        adv_data: &adv_data,
        scan_data: &scan_data,
    };
    match peripheral::advertise_pairable(sd, adv, &fast, bonder).await {
        Err(AdvertiseError::Timeout) => info!("Fast advertising timed out, slowing down"),
        other => return other,
    }

    let slow = peripheral::Config {
        interval: u32::from(config.slow_interval),
        tx_power: tx_power(config::BLE_TX_POWER_DBM),
        ..Default::default()
    };
    let adv = ConnectableAdvertisement::ScannableUndirected {
        adv_data: &adv_data,
        scan_data: &scan_data,
    };
    peripheral::advertise_pairable(sd, adv, &slow, bonder).await
}

fn request_connection_params(conn: &Connection) {
    let params = raw::ble_gap_conn_params_t {
        min_conn_interval: config::BLE_CONN_INTERVAL_MIN,
        max_conn_interval: config::BLE_CONN_INTERVAL_MAX,
        slave_latency: config::BLE_SLAVE_LATENCY,
        conn_sup_timeout: config::BLE_SUP_TIMEOUT,
    };
    if conn.set_conn_params(params).is_err() {
        warn!("Connection parameter update rejected");
    }
}

/// Serve one host connection until it drops or a new advertising command
/// arrives. A command ends the link; it is returned for the caller to run.
async fn serve(
    conn: Connection,
    server: &'static Server,
    bonder: &'static Bonder,
) -> Option<AdvertisingCommand> {
    request_connection_params(&conn);
    set_connection(Some(conn.clone()));

    let mut run = pin!(gatt_server::run(&conn, server, |_| {}));
    let ended_by = match select(run.as_mut(), ADVERTISING.wait()).await {
        Either::First(_) => None,
        Either::Second(cmd) => {
            // Capture the host's subscriptions while the link still exists.
            bonder.save_sys_attrs(&conn);
            if conn.disconnect().is_ok() {
                run.await;
            }
            Some(cmd)
        }
    };

    set_connection(None);
    LINK_DOWN.signal(());
    ended_by
}

#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Advertising and connection handling for the single host link.
#[embassy_executor::task]
pub async fn peripheral_task(
    sd: &'static Softdevice,
    server: &'static Server,
    bond: Option<BondRecord>,
) -> ! {
    static BONDER: StaticCell<Bonder> = StaticCell::new();
    let bonder: &'static Bonder = BONDER.init(Bonder::new());
    if let Some(record) = &bond {
        bonder.restore(record);
    }

    let mut pending = None;
    loop {
        let cmd = match pending.take() {
            Some(cmd) => cmd,
            None => ADVERTISING.wait().await,
        };
        let AdvertisingCommand::Start(adv_config) = cmd else {
            continue;
        };

        info!("Advertising as \"{}\"", adv_config.device_name);
        let conn = match select(advertise(sd, &adv_config, bonder), ADVERTISING.wait()).await {
            Either::First(Ok(conn)) => conn,
            Either::First(Err(e)) => {
                warn!("Advertising failed: {}", Error::from(e));
                Timer::after_secs(1).await;
                pending = Some(cmd);
                continue;
            }
            Either::Second(next) => {
                pending = Some(next);
                continue;
            }
        };

        info!("Host connected");
        match serve(conn, server, bonder).await {
            Some(next) => pending = Some(next),
            None => {
                info!("Host disconnected");
                if adv_config.restart_on_disconnect {
                    pending = Some(cmd);
                }
            }
        }
    }
}
