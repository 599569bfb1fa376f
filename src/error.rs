//! Error type for the embedded adapters.
//!
//! The control loop itself has no fallible operations; these errors come
//! from SoftDevice and flash calls made by the transport and storage
//! adapters. We avoid `alloc` - all variants carry only fixed-size data.

use defmt::Format;

/// Top-level error type used by the embedded binary.
#[derive(Debug, Clone, Copy, Format)]
pub enum Error {
    // BLE
    /// The SoftDevice returned a BLE-level error.
    Ble(BleError),

    // Storage
    /// Flash read/write/erase failed.
    Storage,

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

/// Subset of BLE errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Debug, Clone, Copy, Format)]
pub enum BleError {
    /// GATT service or characteristic registration failed.
    Register,
    /// Advertising could not start.
    Advertise,
    /// No free connection slot in the SoftDevice.
    NoFreeConn,
    /// Notification to the host failed.
    Notify,
    /// Writing a local attribute value failed.
    SetValue,
}

// Convenience conversions

impl From<nrf_softdevice::ble::gatt_server::RegisterError> for Error {
    fn from(_: nrf_softdevice::ble::gatt_server::RegisterError) -> Self {
        Error::Ble(BleError::Register)
    }
}

impl From<nrf_softdevice::ble::gatt_server::NotifyValueError> for Error {
    fn from(_: nrf_softdevice::ble::gatt_server::NotifyValueError) -> Self {
        Error::Ble(BleError::Notify)
    }
}

impl From<nrf_softdevice::ble::gatt_server::SetValueError> for Error {
    fn from(_: nrf_softdevice::ble::gatt_server::SetValueError) -> Self {
        Error::Ble(BleError::SetValue)
    }
}

impl From<nrf_softdevice::ble::peripheral::AdvertiseError> for Error {
    fn from(e: nrf_softdevice::ble::peripheral::AdvertiseError) -> Self {
        match e {
            nrf_softdevice::ble::peripheral::AdvertiseError::NoFreeConn => {
                Error::Ble(BleError::NoFreeConn)
            }
            _ => Error::Ble(BleError::Advertise),
        }
    }
}
