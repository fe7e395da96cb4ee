//! Target temperature characteristic.
//!
//! Wire format: one unsigned byte, degrees Fahrenheit.  Extra bytes after the
//! first are ignored; an empty write is rejected.  Reads report the
//! controller's last known pad temperature, saturated into `0..=255`.

use crate::app::events::PeripheralEvent;
use crate::app::ports::{DevicePort, EventSink};
use crate::error::{DeviceError, GattError};

use super::{AccessFlags, CharacteristicDef, CHAR_TEMPERATURE};

pub struct TemperatureCharacteristic;

impl TemperatureCharacteristic {
    pub const DEF: CharacteristicDef = CharacteristicDef {
        uuid: CHAR_TEMPERATURE,
        flags: AccessFlags::ENCRYPT_READ.union(AccessFlags::ENCRYPT_WRITE),
        description: "Set temperature in degrees F",
    };

    pub fn decode(value: &[u8]) -> Result<u8, GattError> {
        value.first().copied().ok_or(GattError::InvalidValueLength)
    }

    pub fn encode(fahrenheit: i32) -> [u8; 1] {
        [fahrenheit.clamp(0, i32::from(u8::MAX)) as u8]
    }

    pub fn read(&self, device: &impl DevicePort, sink: &mut impl EventSink) -> [u8; 1] {
        let current = device.get_temp();
        sink.emit(&PeripheralEvent::TemperatureRead(current));
        Self::encode(current)
    }

    pub fn write(
        &self,
        device: &mut impl DevicePort,
        value: &[u8],
        sink: &mut impl EventSink,
    ) -> Result<(), GattError> {
        let fahrenheit = i32::from(Self::decode(value)?);
        let limits = device.limits();
        if !limits.contains(fahrenheit) {
            sink.emit(&PeripheralEvent::TemperatureRejected {
                value: fahrenheit,
                min: limits.min(),
                max: limits.max(),
            });
            return Err(GattError::NotPermitted);
        }

        match device.set_temp(fahrenheit) {
            Ok(()) => {
                sink.emit(&PeripheralEvent::TargetTemperatureSet(fahrenheit));
                Ok(())
            }
            Err(DeviceError::OutOfRange { value, min, max }) => {
                sink.emit(&PeripheralEvent::TemperatureRejected { value, min, max });
                Err(GattError::NotPermitted)
            }
            Err(e) => {
                sink.emit(&PeripheralEvent::DeviceFault(e));
                Err(GattError::Failed)
            }
        }
    }
}
