//! GATT services exposed to the host: Device Information, Battery and
//! HID-over-GATT (keyboard).
//!
//! Built with the SoftDevice `ServiceBuilder` so the HID report map and
//! report reference descriptors can be registered as raw attributes.

use defmt::{info, warn};
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties};
use nrf_softdevice::ble::gatt_server::{self, RegisterError, WriteOp};
use nrf_softdevice::ble::{Connection, SecurityMode, Uuid};
use nrf_softdevice::Softdevice;
use printer_remote::config;
use printer_remote::hid::keyboard::{
    KEYBOARD_REPORT_DESCRIPTOR, KEYBOARD_REPORT_ID, KEYBOARD_REPORT_SIZE,
};

use crate::error::Error;

const DEVICE_INFORMATION: Uuid = Uuid::new_16(0x180a);
const BATTERY_SERVICE: Uuid = Uuid::new_16(0x180f);
const HID_SERVICE: Uuid = Uuid::new_16(config::HID_SERVICE_UUID);

const MANUFACTURER_NAME: Uuid = Uuid::new_16(0x2a29);
const MODEL_NUMBER: Uuid = Uuid::new_16(0x2a24);
const PNP_ID: Uuid = Uuid::new_16(0x2a50);

const BATTERY_LEVEL: Uuid = Uuid::new_16(0x2a19);

const HID_INFO: Uuid = Uuid::new_16(0x2a4a);
const REPORT_MAP: Uuid = Uuid::new_16(0x2a4b);
const HID_CONTROL_POINT: Uuid = Uuid::new_16(0x2a4c);
const HID_REPORT: Uuid = Uuid::new_16(0x2a4d);
const PROTOCOL_MODE: Uuid = Uuid::new_16(0x2a4e);
const BOOT_KEYBOARD_INPUT: Uuid = Uuid::new_16(0x2a22);
const HID_REPORT_REF: Uuid = Uuid::new_16(0x2908);

/// Report reference types.
const REPORT_TYPE_INPUT: u8 = 0x01;
const REPORT_TYPE_OUTPUT: u8 = 0x02;

/// Protocol mode values.
const PROTOCOL_MODE_BOOT: u8 = 0x00;
const PROTOCOL_MODE_REPORT: u8 = 0x01;

pub struct DeviceInformationService;

impl DeviceInformationService {
    pub fn new(sd: &mut Softdevice) -> Result<Self, RegisterError> {
        let mut sb = ServiceBuilder::new(sd, DEVICE_INFORMATION)?;

        let read = || Metadata::new(Properties::new().read());
        sb.add_characteristic(
            MANUFACTURER_NAME,
            Attribute::new(config::DEVICE_MANUFACTURER),
            read(),
        )?
        .build();
        sb.add_characteristic(MODEL_NUMBER, Attribute::new(config::DEVICE_MODEL), read())?
            .build();

        let vid = config::PNP_VENDOR_ID.to_le_bytes();
        let pid = config::PNP_PRODUCT_ID.to_le_bytes();
        let version = config::PNP_PRODUCT_VERSION.to_le_bytes();
        let pnp = [
            config::PNP_VENDOR_ID_SOURCE,
            vid[0],
            vid[1],
            pid[0],
            pid[1],
            version[0],
            version[1],
        ];
        sb.add_characteristic(PNP_ID, Attribute::new(pnp), read())?
            .build();

        let _service_handle = sb.build();
        Ok(Self)
    }
}

pub struct BatteryService {
    value_handle: u16,
}

impl BatteryService {
    pub fn new(sd: &mut Softdevice) -> Result<Self, RegisterError> {
        let mut sb = ServiceBuilder::new(sd, BATTERY_SERVICE)?;
        let handles = sb
            .add_characteristic(
                BATTERY_LEVEL,
                Attribute::new([0u8]),
                Metadata::new(Properties::new().read().notify()),
            )?
            .build();
        let _service_handle = sb.build();

        Ok(Self {
            value_handle: handles.value_handle,
        })
    }

    /// Store the level for reads and notify it if the host subscribed.
    pub fn set_level(&self, sd: &Softdevice, conn: Option<&Connection>, percent: u8) -> Result<(), Error> {
        gatt_server::set_value(sd, self.value_handle, &[percent])?;
        if let Some(conn) = conn {
            // Not subscribed yet is fine: the host reads the stored value.
            if gatt_server::notify_value(conn, self.value_handle, &[percent]).is_err() {
                info!("battery notify skipped");
            }
        }
        Ok(())
    }
}

pub struct HidService {
    input_report: u16,
    boot_input: u16,
    protocol_mode: u16,
    control_point: u16,
}

impl HidService {
    pub fn new(sd: &mut Softdevice) -> Result<Self, RegisterError> {
        let mut sb = ServiceBuilder::new(sd, HID_SERVICE)?;

        // bcdHID 1.11, country 0, flags: normally connectable
        sb.add_characteristic(
            HID_INFO,
            Attribute::new([0x11u8, 0x01, 0x00, 0x02]),
            Metadata::new(Properties::new().read()),
        )?
        .build();

        sb.add_characteristic(
            REPORT_MAP,
            Attribute::new(KEYBOARD_REPORT_DESCRIPTOR),
            Metadata::new(Properties::new().read()),
        )?
        .build();

        let control_point = sb
            .add_characteristic(
                HID_CONTROL_POINT,
                Attribute::new([0u8]),
                Metadata::new(Properties::new().write_without_response()),
            )?
            .build();

        let protocol_mode = sb
            .add_characteristic(
                PROTOCOL_MODE,
                Attribute::new([PROTOCOL_MODE_REPORT]),
                Metadata::new(Properties::new().read().write_without_response()),
            )?
            .build();

        let mut input = sb.add_characteristic(
            HID_REPORT,
            Attribute::new([0u8; KEYBOARD_REPORT_SIZE]).security(SecurityMode::JustWorks),
            Metadata::new(Properties::new().read().notify()),
        )?;
        input.add_descriptor(
            HID_REPORT_REF,
            Attribute::new([KEYBOARD_REPORT_ID, REPORT_TYPE_INPUT]).security(SecurityMode::JustWorks),
        )?;
        let input = input.build();

        // Keyboard LEDs from the host; accepted and ignored.
        let mut output = sb.add_characteristic(
            HID_REPORT,
            Attribute::new([0u8; 1]).security(SecurityMode::JustWorks),
            Metadata::new(Properties::new().read().write().write_without_response()),
        )?;
        output.add_descriptor(
            HID_REPORT_REF,
            Attribute::new([KEYBOARD_REPORT_ID, REPORT_TYPE_OUTPUT]).security(SecurityMode::JustWorks),
        )?;
        let _output = output.build();

        let boot_input = sb
            .add_characteristic(
                BOOT_KEYBOARD_INPUT,
                Attribute::new([0u8; KEYBOARD_REPORT_SIZE]).security(SecurityMode::JustWorks),
                Metadata::new(Properties::new().read().notify()),
            )?
            .build();

        let _service_handle = sb.build();

        Ok(Self {
            input_report: input.value_handle,
            boot_input: boot_input.value_handle,
            protocol_mode: protocol_mode.value_handle,
            control_point: control_point.value_handle,
        })
    }

    /// Notify an 8-byte keyboard report on the input report (report
    /// protocol) and the boot keyboard input (boot protocol).
    pub fn send_report(&self, conn: &Connection, report: &[u8; KEYBOARD_REPORT_SIZE]) -> Result<(), Error> {
        gatt_server::notify_value(conn, self.input_report, report)?;
        // Only hosts that switched to boot protocol subscribe to this one.
        let _ = gatt_server::notify_value(conn, self.boot_input, report);
        Ok(())
    }

    pub fn on_write(&self, handle: u16, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if handle == self.protocol_mode {
            match data[0] {
                PROTOCOL_MODE_BOOT => info!("HID: host selected boot protocol"),
                PROTOCOL_MODE_REPORT => info!("HID: host selected report protocol"),
                other => warn!("HID: unknown protocol mode {}", other),
            }
        } else if handle == self.control_point {
            // 0x00 = suspend, 0x01 = exit suspend
            info!("HID: control point {}", data[0]);
        }
    }
}

/// The GATT server registered with the SoftDevice.
pub struct Server {
    _dis: DeviceInformationService,
    pub bas: BatteryService,
    pub hid: HidService,
}

impl Server {
    pub fn new(sd: &mut Softdevice) -> Result<Self, RegisterError> {
        let dis = DeviceInformationService::new(sd)?;
        let bas = BatteryService::new(sd)?;
        let hid = HidService::new(sd)?;
        Ok(Self { _dis: dis, bas, hid })
    }
}

impl gatt_server::Server for Server {
    type Event = ();

    fn on_write(
        &self,
        _conn: &Connection,
        handle: u16,
        _op: WriteOp,
        _offset: usize,
        data: &[u8],
    ) -> Option<Self::Event> {
        self.hid.on_write(handle, data);
        None
    }
}
