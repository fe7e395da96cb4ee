//! Simulated BLE GATT server.
//!
//! Implements [`GattTransport`] for host-side runs and tests.  It keeps the
//! registered attribute table and plays the part of the BLE stack in front of
//! an [`AttributeHandler`]: every request is checked against the registered
//! characteristic's [`AccessFlags`] before the handler sees it.
//!
//! On the device the same role is played by
//! [`BluedroidGatt`](super::bluedroid::BluedroidGatt).
//!
//! ## Descriptor policy
//!
//! Each characteristic carries a Characteristic User Description (0x2901).
//! It is readable on any link and never writable.

use log::{debug, info};

use crate::app::ports::{AttributeHandler, GattTransport};
use crate::error::GattError;
use crate::gatt::{
    AccessFlags, AccessOp, AttValue, CharacteristicDef, RequestOptions, ServiceDef, CUD_UUID,
};

const MAX_SERVICES: usize = 4;
const MAX_CHARACTERISTICS: usize = 16;

/// Flags of the user-description descriptor.
pub const CUD_FLAGS: AccessFlags = AccessFlags::READ;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisteredCharacteristic {
    pub service_uuid: u128,
    pub def: CharacteristicDef,
}

#[derive(Default)]
pub struct SimGattServer {
    services: heapless::Vec<u128, MAX_SERVICES>,
    characteristics: heapless::Vec<RegisteredCharacteristic, MAX_CHARACTERISTICS>,
}

impl SimGattServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn services(&self) -> &[u128] {
        &self.services
    }

    pub fn characteristics(&self) -> &[RegisteredCharacteristic] {
        &self.characteristics
    }

    fn lookup(&self, uuid: u128) -> Result<&CharacteristicDef, GattError> {
        self.characteristics
            .iter()
            .find(|c| c.def.uuid == uuid)
            .map(|c| &c.def)
            .ok_or(GattError::UnknownAttribute(uuid))
    }

    /// Deliver a read request from a central.
    pub fn read(
        &self,
        handler: &mut impl AttributeHandler,
        uuid: u128,
        options: &RequestOptions,
    ) -> Result<AttValue, GattError> {
        let def = self.lookup(uuid)?;
        def.flags.permits(AccessOp::Read, options.link_encrypted)?;
        handler.on_read(uuid, options)
    }

    /// Deliver a write request from a central.
    pub fn write(
        &self,
        handler: &mut impl AttributeHandler,
        uuid: u128,
        value: &[u8],
        options: &RequestOptions,
    ) -> Result<(), GattError> {
        let def = self.lookup(uuid)?;
        def.flags.permits(AccessOp::Write, options.link_encrypted)?;
        handler.on_write(uuid, value, options)
    }

    /// Read a descriptor of the characteristic `uuid`.
    pub fn read_descriptor(
        &self,
        handler: &mut impl AttributeHandler,
        uuid: u128,
        descriptor: u16,
        options: &RequestOptions,
    ) -> Result<AttValue, GattError> {
        self.lookup(uuid)?;
        if descriptor != CUD_UUID {
            return Err(GattError::UnknownAttribute(u128::from(descriptor)));
        }
        CUD_FLAGS.permits(AccessOp::Read, options.link_encrypted)?;
        handler.on_read_description(uuid, options)
    }

    /// Descriptors are read-only; this only decides which error to return.
    pub fn write_descriptor(
        &self,
        uuid: u128,
        descriptor: u16,
        options: &RequestOptions,
    ) -> Result<(), GattError> {
        self.lookup(uuid)?;
        if descriptor != CUD_UUID {
            return Err(GattError::UnknownAttribute(u128::from(descriptor)));
        }
        debug!("BLE(sim): descriptor write on {:032x} refused", uuid);
        CUD_FLAGS.permits(AccessOp::Write, options.link_encrypted)
    }
}

impl GattTransport for SimGattServer {
    fn register_service(&mut self, service: &ServiceDef) -> Result<(), GattError> {
        if self.services.contains(&service.uuid) {
            return Err(GattError::Failed);
        }
        self.services
            .push(service.uuid)
            .map_err(|_| GattError::Failed)?;
        info!("BLE(sim): service {:032x} (primary={})", service.uuid, service.primary);
        Ok(())
    }

    fn register_characteristic(
        &mut self,
        service_uuid: u128,
        characteristic: &CharacteristicDef,
    ) -> Result<(), GattError> {
        if !self.services.contains(&service_uuid) {
            return Err(GattError::UnknownAttribute(service_uuid));
        }
        if self.lookup(characteristic.uuid).is_ok() {
            return Err(GattError::Failed);
        }
        self.characteristics
            .push(RegisteredCharacteristic {
                service_uuid,
                def: *characteristic,
            })
            .map_err(|_| GattError::Failed)?;
        info!(
            "BLE(sim): characteristic {:032x} '{}' flags=0b{:04b}",
            characteristic.uuid,
            characteristic.description,
            characteristic.flags.bits()
        );
        Ok(())
    }
}
