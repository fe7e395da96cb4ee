//! Unified error types for the chili pad peripheral.
//!
//! One small `Copy` enum per layer (relay, device, GATT, config), each
//! convertible into the top-level [`Error`].  [`Error::class`] folds them back
//! into the three handling categories the transport cares about.

use core::fmt;

use crate::drivers::relay::{ChannelMask, RelayChannel};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Relay(RelayError),
    Device(DeviceError),
    Gatt(GattError),
    Config(ConfigError),
}

/// How a caller is expected to treat an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Unknown channel or attribute, bad config.  Programmer error, never retried.
    Configuration,
    /// A value failed device bounds.  Rejected, state unchanged.
    Validation,
    /// The output primitive failed.  State unchanged, retry is allowed.
    HardwareIo,
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Relay(e) => e.class(),
            Self::Device(e) => e.class(),
            Self::Gatt(e) => e.class(),
            Self::Config(_) => ErrorClass::Configuration,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relay(e) => write!(f, "relay: {e}"),
            Self::Device(e) => write!(f, "device: {e}"),
            Self::Gatt(e) => write!(f, "gatt: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Relay errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayError {
    /// Channel id is not a known relay channel, or not installed on this bank.
    UnknownChannel(u8),
    /// The pin write for a single channel failed.
    PinWrite(RelayChannel),
    /// A bulk operation failed on the channels in the mask.
    Partial(ChannelMask),
}

impl RelayError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownChannel(_) => ErrorClass::Configuration,
            Self::PinWrite(_) | Self::Partial(_) => ErrorClass::HardwareIo,
        }
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownChannel(id) => write!(f, "unknown relay channel {id}"),
            Self::PinWrite(ch) => write!(f, "pin write failed on {ch}"),
            Self::Partial(mask) => write!(f, "pin write failed on {mask}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<RelayError> for Error {
    fn from(e: RelayError) -> Self {
        Self::Relay(e)
    }
}

// ---------------------------------------------------------------------------
// Device errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// Temperature outside the model's fixed limits.
    OutOfRange { value: i32, min: i32, max: i32 },
    /// The relay bank failed while changing power state.
    Relay(RelayError),
}

impl DeviceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::OutOfRange { .. } => ErrorClass::Validation,
            Self::Relay(e) => e.class(),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { value, min, max } => {
                write!(f, "{value}F outside {min}..={max}F")
            }
            Self::Relay(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DeviceError {}

impl From<RelayError> for DeviceError {
    fn from(e: RelayError) -> Self {
        Self::Relay(e)
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Self::Device(e)
    }
}

// ---------------------------------------------------------------------------
// GATT errors (transport-visible rejections)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattError {
    /// Value rejected by device bounds, or attribute is read-only.
    NotPermitted,
    /// Payload has the wrong length for the characteristic.
    InvalidValueLength,
    /// Read or write offset past the end of the value.
    InvalidOffset,
    /// Attribute requires an encrypted link and the link is not encrypted.
    InsufficientEncryption,
    /// Operation not supported on this attribute.
    NotSupported,
    /// No characteristic with this UUID is registered.
    UnknownAttribute(u128),
    /// The device failed while applying an accepted value.
    Failed,
}

impl GattError {
    /// ATT error code sent back to the central (Bluetooth Core Vol 3, Part F, 3.4.1.1).
    pub const fn att_code(self) -> u8 {
        match self {
            Self::UnknownAttribute(_) => 0x01,
            Self::NotPermitted => 0x03,
            Self::NotSupported => 0x06,
            Self::InvalidOffset => 0x07,
            Self::InvalidValueLength => 0x0D,
            Self::Failed => 0x0E,
            Self::InsufficientEncryption => 0x0F,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownAttribute(_) | Self::NotSupported => ErrorClass::Configuration,
            Self::NotPermitted
            | Self::InvalidValueLength
            | Self::InvalidOffset
            | Self::InsufficientEncryption => ErrorClass::Validation,
            Self::Failed => ErrorClass::HardwareIo,
        }
    }
}

impl fmt::Display for GattError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPermitted => write!(f, "not permitted"),
            Self::InvalidValueLength => write!(f, "invalid value length"),
            Self::InvalidOffset => write!(f, "invalid offset"),
            Self::InsufficientEncryption => write!(f, "insufficient encryption"),
            Self::NotSupported => write!(f, "not supported"),
            Self::UnknownAttribute(uuid) => write!(f, "unknown attribute {uuid:032x}"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::error::Error for GattError {}

impl From<GattError> for Error {
    fn from(e: GattError) -> Self {
        Self::Gatt(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Input could not be parsed.
    Malformed,
    /// A field failed validation.  The message names the field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed config"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
