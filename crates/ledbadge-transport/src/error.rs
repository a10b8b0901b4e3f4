//! Errors raised while discovering or talking to a BLE badge peripheral.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors from BLE adapter discovery, connection, and GATT I/O.
#[derive(Error, Debug)]
pub enum TransportError {
    /// No Bluetooth adapter is present on this host.
    #[error("no Bluetooth adapter found")]
    NoAdapter,

    /// No peripheral matching the requested address/name filter was seen
    /// within the scan window.
    #[error("no matching device found (filter: {filter})")]
    DeviceNotFound {
        /// The address or name filter that was scanned for.
        filter: String,
    },

    /// One of the four logical endpoints' GATT characteristics was not
    /// present on the connected peripheral.
    #[error("characteristic {uuid} not found on peripheral (endpoint: {endpoint})")]
    CharacteristicNotFound {
        /// Which logical endpoint this characteristic was supposed to back.
        endpoint: &'static str,
        /// The UUID that was searched for.
        uuid: String,
    },

    /// The underlying `btleplug` call failed.
    #[error("BLE I/O error: {0}")]
    Ble(#[from] btleplug::Error),
}
