//! Outbound peripheral events.
//!
//! The GATT characteristics and the [`PeripheralService`](super::service::PeripheralService)
//! emit these through the [`EventSink`](super::ports::EventSink) port.  The
//! adapter on the other side decides where they go (serial log in production,
//! a `Vec` in tests).

use crate::control::device::PowerState;
use crate::error::DeviceError;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralEvent {
    /// The GATT service and its characteristics were handed to the transport.
    ServiceRegistered { uuid: u128, characteristics: usize },

    /// A central read the power characteristic.
    PowerRead(PowerState),

    /// A power write reached the controller and succeeded.
    PowerChanged { from: PowerState, to: PowerState },

    /// A power write matched the cached value; the controller was not called.
    PowerWriteIgnored(PowerState),

    /// A power write carried an unknown byte (or none at all).
    UnrecognizedCommand { byte: Option<u8> },

    /// A central read the temperature characteristic.
    TemperatureRead(i32),

    /// The target temperature was accepted by the controller.
    TargetTemperatureSet(i32),

    /// A temperature write fell outside the device limits.
    TemperatureRejected { value: i32, min: i32, max: i32 },

    /// The controller failed while applying a remote command.
    DeviceFault(DeviceError),
}
