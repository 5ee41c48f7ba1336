//! # Printer Transport Layer
//!
//! Connection setup for the printer. The encoder only needs
//! [`std::io::Write`]; this module produces one.
//!
//! ## Available Transports
//!
//! - [`bluetooth`]: Bluetooth RFCOMM TTY (Linux)

pub mod bluetooth;

pub use bluetooth::{BluetoothTransport, resolve_device};
