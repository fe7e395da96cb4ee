//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   GattTransport ──▶ AttributeHandler (PeripheralService)
//!                          │
//!                          ▼
//!                     DevicePort (DeviceController)
//!                          │
//!             ┌────────────┴────────────┐
//!             ▼                         ▼
//!   DigitalOutput (RelayBank)     ThermalPort
//! ```
//!
//! Driven adapters (pins, thermal drive, event sinks) implement these traits
//! and are injected at construction, so nothing in the core needs a radio or
//! real GPIO to be exercised.

use crate::control::device::{PowerState, TemperatureLimits};
use crate::error::{DeviceError, GattError};
use crate::gatt::{AttValue, CharacteristicDef, RequestOptions, ServiceDef};

// ───────────────────────────────────────────────────────────────
// Digital-output port (driven adapter: relay bank → GPIO)
// ───────────────────────────────────────────────────────────────

/// Logical output level.  The adapter decides the electrical polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Close the circuit (relay energised).
    Assert,
    /// Open the circuit.
    Deassert,
}

/// Failure reported by a [`DigitalOutput`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    /// No pin with this id was configured as an output.
    UnknownPin(u8),
    /// The underlying write failed.
    WriteFailed(u8),
    /// A pin with this id is already registered.
    DuplicatePin(u8),
    /// No room left in the pin table.
    TableFull(u8),
}

impl core::fmt::Display for OutputError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownPin(pin) => write!(f, "pin {} not configured", pin),
            Self::WriteFailed(pin) => write!(f, "write to pin {} failed", pin),
            Self::DuplicatePin(pin) => write!(f, "pin {} already registered", pin),
            Self::TableFull(pin) => write!(f, "no room to register pin {}", pin),
        }
    }
}

impl std::error::Error for OutputError {}

/// The pin-level primitive.  [`RelayBank`](crate::drivers::relay::RelayBank)
/// is its only caller.
pub trait DigitalOutput {
    /// Drive `pin` to `level`.  Assumed synchronous and fast.
    fn set_level(&mut self, pin: u8, level: Level) -> Result<(), OutputError>;

    /// Release every pin resource.  Called exactly once, at teardown.
    fn cleanup(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Thermal port (driven adapter: controller → chiller hardware)
// ───────────────────────────────────────────────────────────────

/// Setpoint drive and temperature sensing for the chiller.
pub trait ThermalPort {
    /// Forward a validated setpoint to the hardware.
    fn command_setpoint(&mut self, fahrenheit: i32) -> Result<(), DeviceError>;

    /// Sample the pad temperature.  `None` when no sensor is fitted.
    fn read_current(&mut self) -> Option<i32>;
}

// ───────────────────────────────────────────────────────────────
// Device port (domain: characteristic contracts → controller)
// ───────────────────────────────────────────────────────────────

/// Operations the characteristic contracts invoke on the device.
pub trait DevicePort {
    fn power_on(&mut self) -> Result<(), DeviceError>;
    fn power_off(&mut self) -> Result<(), DeviceError>;
    fn set_temp(&mut self, fahrenheit: i32) -> Result<(), DeviceError>;

    /// Last known pad temperature.  May be stale; no sensor poll happens here.
    fn get_temp(&self) -> i32;

    fn limits(&self) -> TemperatureLimits;
    fn power_state(&self) -> PowerState;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The service emits structured [`PeripheralEvent`](super::events::PeripheralEvent)s
/// through this port.  Constructed once at start-up and injected.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::PeripheralEvent);
}

// ───────────────────────────────────────────────────────────────
// GATT transport (external collaborator)
// ───────────────────────────────────────────────────────────────

/// Registration half of the GATT transport capability.
///
/// The transport owns advertising, pairing and framing.  It MUST enforce each
/// characteristic's [`AccessFlags`](crate::gatt::AccessFlags) before calling
/// into the [`AttributeHandler`].
pub trait GattTransport {
    fn register_service(&mut self, service: &ServiceDef) -> Result<(), GattError>;

    fn register_characteristic(
        &mut self,
        service_uuid: u128,
        characteristic: &CharacteristicDef,
    ) -> Result<(), GattError>;
}

/// Callback half of the GATT transport capability.  The transport delivers
/// one request at a time; each runs to completion.
pub trait AttributeHandler {
    fn on_read(&mut self, uuid: u128, options: &RequestOptions) -> Result<AttValue, GattError>;

    fn on_write(
        &mut self,
        uuid: u128,
        value: &[u8],
        options: &RequestOptions,
    ) -> Result<(), GattError>;

    /// Read the user-description descriptor of a characteristic.
    fn on_read_description(
        &mut self,
        uuid: u128,
        options: &RequestOptions,
    ) -> Result<AttValue, GattError>;
}
