//! GATT characteristic contracts.
//!
//! Each characteristic is a pure byte ⇄ value mapping plus the metadata the
//! transport needs to register it (UUID, access flags, user description).
//!
//! ## Service layout
//!
//! | Characteristic | UUID                                   | Access                   |
//! |----------------|----------------------------------------|--------------------------|
//! | Power          | `4116f8d2-9f66-4f58-a53d-fc7440e7c14e` | Encrypted read + write   |
//! | Temperature    | `322e774f-c909-49c4-bd7b-48a4003a967f` | Encrypted read + write   |
//!
//! Both carry a read-only Characteristic User Description (0x2901).

use core::ops::BitOr;

use crate::error::GattError;

pub mod power;
pub mod temperature;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x12634d89_d598_4874_8e86_7d042ee07ba7;
pub const CHAR_POWER: u128 = 0x4116f8d2_9f66_4f58_a53d_fc7440e7c14e;
pub const CHAR_TEMPERATURE: u128 = 0x322e774f_c909_49c4_bd7b_48a4003a967f;

/// Characteristic User Description descriptor.
pub const CUD_UUID: u16 = 0x2901;

/// Longest attribute value the service ever produces.
pub const MAX_VALUE_LEN: usize = 32;

pub type AttValue = heapless::Vec<u8, MAX_VALUE_LEN>;

// ───────────────────────────────────────────────────────────────
// Access control
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOp {
    Read,
    Write,
}

/// Characteristic permission bits.  An `ENCRYPT_*` bit implies the plain one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessFlags(u8);

impl AccessFlags {
    pub const READ: Self = Self(0b0001);
    pub const WRITE: Self = Self(0b0010);
    pub const ENCRYPT_READ: Self = Self(0b0100);
    pub const ENCRYPT_WRITE: Self = Self(0b1000);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Decide whether `op` is allowed over a link with the given encryption state.
    pub fn permits(self, op: AccessOp, link_encrypted: bool) -> Result<(), GattError> {
        let (plain, encrypted) = match op {
            AccessOp::Read => (Self::READ, Self::ENCRYPT_READ),
            AccessOp::Write => (Self::WRITE, Self::ENCRYPT_WRITE),
        };
        if self.contains(encrypted) {
            if link_encrypted {
                Ok(())
            } else {
                Err(GattError::InsufficientEncryption)
            }
        } else if self.contains(plain) {
            Ok(())
        } else {
            Err(GattError::NotPermitted)
        }
    }
}

impl BitOr for AccessFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

// ───────────────────────────────────────────────────────────────
// Registration metadata
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicDef {
    pub uuid: u128,
    pub flags: AccessFlags,
    /// Exposed read-only through the 0x2901 descriptor.
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDef {
    pub uuid: u128,
    pub primary: bool,
    pub characteristics: &'static [CharacteristicDef],
}

impl ServiceDef {
    pub fn characteristic(&self, uuid: u128) -> Option<&CharacteristicDef> {
        self.characteristics.iter().find(|c| c.uuid == uuid)
    }
}

/// Options the transport attaches to every read/write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub offset: u16,
    pub link_encrypted: bool,
}

impl RequestOptions {
    pub const fn encrypted() -> Self {
        Self {
            offset: 0,
            link_encrypted: true,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Decoding helpers
// ───────────────────────────────────────────────────────────────

/// Outcome of decoding an enumerated wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded<T> {
    Recognized(T),
    /// The payload's first byte, or `None` for an empty payload.
    Unrecognized(Option<u8>),
}

/// Copy `value` starting at `offset`.  An offset equal to the length yields an
/// empty value; past the end is rejected.
pub fn slice_from(value: &[u8], offset: u16) -> Result<AttValue, GattError> {
    let offset = usize::from(offset);
    let tail = value.get(offset..).ok_or(GattError::InvalidOffset)?;
    AttValue::from_slice(tail).map_err(|()| GattError::InvalidValueLength)
}
