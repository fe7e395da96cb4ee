//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured peripheral events to the
//! `log` facade (the ESP-IDF logger on the device, UART / USB-CDC in
//! production).

use log::{info, warn};

use crate::app::events::PeripheralEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`PeripheralEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &PeripheralEvent) {
        match event {
            PeripheralEvent::ServiceRegistered {
                uuid,
                characteristics,
            } => {
                info!("GATT  | service {:032x} registered ({} chars)", uuid, characteristics);
            }
            PeripheralEvent::PowerRead(state) => {
                info!("POWER | read -> {:?}", state);
            }
            PeripheralEvent::PowerChanged { from, to } => {
                info!("POWER | {:?} -> {:?}", from, to);
            }
            PeripheralEvent::PowerWriteIgnored(state) => {
                info!("POWER | already {:?}, write ignored", state);
            }
            PeripheralEvent::UnrecognizedCommand { byte: Some(b) } => {
                warn!("POWER | unrecognized command 0x{:02x}", b);
            }
            PeripheralEvent::UnrecognizedCommand { byte: None } => {
                warn!("POWER | empty command");
            }
            PeripheralEvent::TemperatureRead(f) => {
                info!("TEMP  | read -> {}F", f);
            }
            PeripheralEvent::TargetTemperatureSet(f) => {
                info!("TEMP  | target {}F", f);
            }
            PeripheralEvent::TemperatureRejected { value, min, max } => {
                warn!("TEMP  | {}F rejected, limits {}..={}F", value, min, max);
            }
            PeripheralEvent::DeviceFault(e) => {
                warn!("FAULT | {}", e);
            }
        }
    }
}
