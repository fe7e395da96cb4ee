//! Power control characteristic.
//!
//! Wire format: one byte, `0x00` = OFF, `0x01` = ON.  Only the first byte of
//! a write is inspected.  Anything else is an unrecognised command: it is
//! reported through the event sink and the write is accepted with no effect,
//! so a garbled or retried write never surfaces as an ATT error.
//!
//! Reads return the last successfully written value, not the controller's
//! live state.  The two agree because the controller is only driven through
//! this characteristic and starts OFF.

use crate::app::events::PeripheralEvent;
use crate::app::ports::{DevicePort, EventSink};
use crate::control::device::PowerState;
use crate::error::GattError;

use super::{AccessFlags, CharacteristicDef, Decoded, CHAR_POWER};

pub struct PowerCharacteristic {
    cached: PowerState,
}

impl PowerCharacteristic {
    pub const DEF: CharacteristicDef = CharacteristicDef {
        uuid: CHAR_POWER,
        flags: AccessFlags::ENCRYPT_READ.union(AccessFlags::ENCRYPT_WRITE),
        description: "Chili pad controls",
    };

    pub fn new() -> Self {
        Self {
            cached: PowerState::Off,
        }
    }

    pub fn decode(value: &[u8]) -> Decoded<PowerState> {
        match value.first() {
            Some(0) => Decoded::Recognized(PowerState::Off),
            Some(1) => Decoded::Recognized(PowerState::On),
            Some(&other) => Decoded::Unrecognized(Some(other)),
            None => Decoded::Unrecognized(None),
        }
    }

    pub const fn encode(state: PowerState) -> [u8; 1] {
        [state as u8]
    }

    pub fn cached(&self) -> PowerState {
        self.cached
    }

    pub fn read(&self, sink: &mut impl EventSink) -> [u8; 1] {
        sink.emit(&PeripheralEvent::PowerRead(self.cached));
        Self::encode(self.cached)
    }

    /// Apply a remote write.  The cache moves only after the controller call
    /// succeeds.
    pub fn write(
        &mut self,
        device: &mut impl DevicePort,
        value: &[u8],
        sink: &mut impl EventSink,
    ) -> Result<(), GattError> {
        let requested = match Self::decode(value) {
            Decoded::Recognized(state) => state,
            Decoded::Unrecognized(byte) => {
                sink.emit(&PeripheralEvent::UnrecognizedCommand { byte });
                return Ok(());
            }
        };

        if requested == self.cached {
            sink.emit(&PeripheralEvent::PowerWriteIgnored(requested));
            return Ok(());
        }

        let result = match requested {
            PowerState::On => device.power_on(),
            PowerState::Off => device.power_off(),
        };
        if let Err(e) = result {
            sink.emit(&PeripheralEvent::DeviceFault(e));
            return Err(GattError::Failed);
        }

        sink.emit(&PeripheralEvent::PowerChanged {
            from: self.cached,
            to: requested,
        });
        self.cached = requested;
        Ok(())
    }
}

impl Default for PowerCharacteristic {
    fn default() -> Self {
        Self::new()
    }
}
