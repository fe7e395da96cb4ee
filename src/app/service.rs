//! Peripheral service: the hexagonal core.
//!
//! [`PeripheralService`] composes the power and temperature characteristics
//! into one GATT service and routes transport callbacks to them.  It owns the
//! device behind [`DevicePort`] and the injected [`EventSink`], and holds no
//! state of its own beyond the composed parts.
//!
//! ```text
//!  GattTransport ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!                    │      PeripheralService       │
//!                    │  Power · Temperature · CUD   │
//!                    └──────────────┬──────────────┘
//!                                   ▼
//!                               DevicePort
//! ```
//!
//! Access flags are enforced by the transport before any call reaches the
//! handler methods here.

use log::{debug, info};

use crate::error::GattError;
use crate::gatt::power::PowerCharacteristic;
use crate::gatt::temperature::TemperatureCharacteristic;
use crate::gatt::{
    slice_from, AttValue, CharacteristicDef, RequestOptions, ServiceDef, CHAR_POWER,
    CHAR_TEMPERATURE, SERVICE_UUID,
};

use super::events::PeripheralEvent;
use super::ports::{AttributeHandler, DevicePort, EventSink, GattTransport};

const CHARACTERISTICS: [CharacteristicDef; 2] =
    [PowerCharacteristic::DEF, TemperatureCharacteristic::DEF];

// ───────────────────────────────────────────────────────────────
// PeripheralService
// ───────────────────────────────────────────────────────────────

pub struct PeripheralService<D: DevicePort, S: EventSink> {
    device: D,
    sink: S,
    power: PowerCharacteristic,
    temperature: TemperatureCharacteristic,
}

impl<D: DevicePort, S: EventSink> PeripheralService<D, S> {
    /// The chili pad service as registered with the transport.
    pub const DEFINITION: ServiceDef = ServiceDef {
        uuid: SERVICE_UUID,
        primary: true,
        characteristics: &CHARACTERISTICS,
    };

    pub fn new(device: D, sink: S) -> Self {
        Self {
            device,
            sink,
            power: PowerCharacteristic::new(),
            temperature: TemperatureCharacteristic,
        }
    }

    /// Hand the service and every characteristic to the transport.
    pub fn register(&mut self, transport: &mut impl GattTransport) -> Result<(), GattError> {
        let service = Self::DEFINITION;
        transport.register_service(&service)?;
        for characteristic in service.characteristics {
            transport.register_characteristic(service.uuid, characteristic)?;
        }
        info!(
            "service: registered {:032x} with {} characteristics",
            service.uuid,
            service.characteristics.len()
        );
        self.sink.emit(&PeripheralEvent::ServiceRegistered {
            uuid: service.uuid,
            characteristics: service.characteristics.len(),
        });
        Ok(())
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Give back the device and sink.  The device's teardown runs when the
    /// caller drops it.
    pub fn into_parts(self) -> (D, S) {
        (self.device, self.sink)
    }

    fn definition_of(uuid: u128) -> Result<CharacteristicDef, GattError> {
        Self::DEFINITION
            .characteristic(uuid)
            .copied()
            .ok_or(GattError::UnknownAttribute(uuid))
    }
}

impl<D: DevicePort, S: EventSink> AttributeHandler for PeripheralService<D, S> {
    fn on_read(&mut self, uuid: u128, options: &RequestOptions) -> Result<AttValue, GattError> {
        let value = match uuid {
            CHAR_POWER => self.power.read(&mut self.sink),
            CHAR_TEMPERATURE => self.temperature.read(&self.device, &mut self.sink),
            _ => return Err(GattError::UnknownAttribute(uuid)),
        };
        slice_from(&value, options.offset)
    }

    fn on_write(
        &mut self,
        uuid: u128,
        value: &[u8],
        options: &RequestOptions,
    ) -> Result<(), GattError> {
        Self::definition_of(uuid)?;
        if options.offset != 0 {
            debug!("service: write to {:032x} at offset {} rejected", uuid, options.offset);
            return Err(GattError::InvalidOffset);
        }
        match uuid {
            CHAR_POWER => self.power.write(&mut self.device, value, &mut self.sink),
            CHAR_TEMPERATURE => self.temperature.write(&mut self.device, value, &mut self.sink),
            _ => Err(GattError::UnknownAttribute(uuid)),
        }
    }

    fn on_read_description(
        &mut self,
        uuid: u128,
        options: &RequestOptions,
    ) -> Result<AttValue, GattError> {
        let def = Self::definition_of(uuid)?;
        slice_from(def.description.as_bytes(), options.offset)
    }
}
