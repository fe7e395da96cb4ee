//! Application core: GATT request routing, zero I/O.
//!
//! This module wires the chili pad characteristics to the device controller.
//! All interaction with hardware and the BLE stack happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable without
//! real peripherals.

pub mod events;
pub mod ports;
pub mod service;
