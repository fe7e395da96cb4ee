//! Bluedroid GATT adapter (ESP-IDF only).
//!
//! Implements [`GattTransport`] on the ESP32 Bluedroid stack via
//! `esp_idf_svc::sys`.  Registration only records the attribute table;
//! [`BluedroidGatt::start`] brings the controller up, builds the table from
//! inside the GATTS callback and starts advertising.
//!
//! Characteristics are created with `ESP_GATT_RSP_BY_APP`, so every read and
//! write lands in [`ble_gatts_event_handler`], which forwards it to the
//! installed [`AttributeHandler`] and answers with the matching ATT status.
//! Encrypted permissions are enforced by the stack before the callback runs.

use core::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::Mutex;

use esp_idf_svc::sys::*;
use log::{error, info, warn};

use crate::app::ports::{AttributeHandler, GattTransport};
use crate::error::GattError;
use crate::gatt::{AccessFlags, CharacteristicDef, RequestOptions, ServiceDef, CUD_UUID};

const MAX_CHARACTERISTICS: usize = 8;

// ── Static state bridging C callbacks to Rust ─────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures.  GATTS callbacks run in the Bluedroid task (not ISR), so std
// Mutex is safe.

type BoxedHandler = Box<dyn AttributeHandler + Send>;

static HANDLER: Mutex<Option<BoxedHandler>> = Mutex::new(None);
static SERVICE: Mutex<Option<ServiceDef>> = Mutex::new(None);
static CHARACTERISTICS: Mutex<heapless::Vec<CharacteristicDef, MAX_CHARACTERISTICS>> =
    Mutex::new(heapless::Vec::new());
static HANDLES: Mutex<heapless::Vec<(u16, Attr), { MAX_CHARACTERISTICS * 2 }>> =
    Mutex::new(heapless::Vec::new());

static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
/// Index of the characteristic currently being added.
static BLE_CHAR_STEP: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Copy)]
enum Attr {
    Value(u128),
    Description(u128),
}

fn uuid128_to_esp(uuid: u128) -> esp_bt_uuid_t {
    let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    t.uuid.uuid128 = uuid.to_le_bytes();
    t
}

fn uuid16_to_esp(uuid: u16) -> esp_bt_uuid_t {
    let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 2;
    t.uuid.uuid16 = uuid;
    t
}

fn esp_perm(flags: AccessFlags) -> esp_gatt_perm_t {
    let mut perm = 0;
    if flags.contains(AccessFlags::ENCRYPT_READ) {
        perm |= ESP_GATT_PERM_READ_ENCRYPTED;
    } else if flags.contains(AccessFlags::READ) {
        perm |= ESP_GATT_PERM_READ;
    }
    if flags.contains(AccessFlags::ENCRYPT_WRITE) {
        perm |= ESP_GATT_PERM_WRITE_ENCRYPTED;
    } else if flags.contains(AccessFlags::WRITE) {
        perm |= ESP_GATT_PERM_WRITE;
    }
    perm as esp_gatt_perm_t
}

fn esp_prop(flags: AccessFlags) -> esp_gatt_char_prop_t {
    let mut prop = 0;
    if flags.contains(AccessFlags::READ) || flags.contains(AccessFlags::ENCRYPT_READ) {
        prop |= ESP_GATT_CHAR_PROP_BIT_READ;
    }
    if flags.contains(AccessFlags::WRITE) || flags.contains(AccessFlags::ENCRYPT_WRITE) {
        prop |= ESP_GATT_CHAR_PROP_BIT_WRITE;
    }
    prop as esp_gatt_char_prop_t
}

fn remember(handle: u16, attr: Attr) {
    if let Ok(mut handles) = HANDLES.lock() {
        if handles.push((handle, attr)).is_err() {
            warn!("BLE GATTS: handle table full, {} dropped", handle);
        }
    }
}

fn attr_for(handle: u16) -> Option<Attr> {
    HANDLES
        .lock()
        .ok()
        .and_then(|h| h.iter().find(|(id, _)| *id == handle).map(|(_, a)| *a))
}

fn characteristic_at(index: usize) -> Option<CharacteristicDef> {
    CHARACTERISTICS.lock().ok().and_then(|c| c.get(index).copied())
}

unsafe fn add_gatt_char(svc_handle: u16, def: &CharacteristicDef) {
    let mut char_uuid = uuid128_to_esp(def.uuid);
    let mut control = esp_attr_control_t {
        auto_rsp: ESP_GATT_RSP_BY_APP as u8,
    };
    let ret = unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut char_uuid,
            esp_perm(def.flags),
            esp_prop(def.flags),
            core::ptr::null_mut(),
            &mut control,
        )
    };
    if ret != ESP_OK as esp_err_t {
        error!("BLE GATTS: add_char {:032x} failed ({})", def.uuid, ret);
    }
}

unsafe fn add_cud_descr(svc_handle: u16) {
    let mut descr_uuid = uuid16_to_esp(CUD_UUID);
    let mut control = esp_attr_control_t {
        auto_rsp: ESP_GATT_RSP_BY_APP as u8,
    };
    let ret = unsafe {
        esp_ble_gatts_add_char_descr(
            svc_handle,
            &mut descr_uuid,
            ESP_GATT_PERM_READ as esp_gatt_perm_t,
            core::ptr::null_mut(),
            &mut control,
        )
    };
    if ret != ESP_OK as esp_err_t {
        error!("BLE GATTS: add_char_descr failed ({})", ret);
    }
}

unsafe fn start_advertising() {
    let mut adv_params = esp_ble_adv_params_t {
        adv_int_min: 0x20,
        adv_int_max: 0x40,
        adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
        own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
        adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
        ..unsafe { core::mem::zeroed() }
    };
    unsafe {
        esp_ble_gap_start_advertising(&mut adv_params);
    }
}

unsafe fn send_response(
    gatts_if: esp_gatt_if_t,
    conn_id: u16,
    trans_id: u32,
    handle: u16,
    result: Result<&[u8], GattError>,
) {
    let mut rsp: esp_gatt_rsp_t = unsafe { core::mem::zeroed() };
    let status = match result {
        Ok(bytes) => {
            let attr = unsafe { &mut rsp.attr_value };
            let len = bytes.len().min(attr.value.len());
            attr.value[..len].copy_from_slice(&bytes[..len]);
            attr.len = len as u16;
            attr.handle = handle;
            esp_gatt_status_t_ESP_GATT_OK
        }
        Err(e) => esp_gatt_status_t::from(e.att_code()),
    };
    unsafe {
        esp_ble_gatts_send_response(gatts_if, conn_id, trans_id, status, &mut rsp);
    }
}

fn with_handler<R>(f: impl FnOnce(&mut dyn AttributeHandler) -> Result<R, GattError>) -> Result<R, GattError> {
    let mut guard = HANDLER.lock().map_err(|_| GattError::Failed)?;
    match guard.as_mut() {
        Some(handler) => f(handler.as_mut()),
        None => Err(GattError::Failed),
    }
}

unsafe extern "C" fn ble_gap_event_handler(
    event: esp_gap_ble_cb_event_t,
    param: *mut esp_ble_gap_cb_param_t,
) {
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            info!("BLE GAP: advertising started");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SEC_REQ_EVT => unsafe {
            esp_ble_gap_security_rsp((*param).ble_security.ble_req.bd_addr.as_mut_ptr(), true);
        },
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_AUTH_CMPL_EVT => {
            let p = unsafe { &(*param).ble_security.auth_cmpl };
            if p.success {
                info!("BLE GAP: authentication complete (bonded)");
            } else {
                warn!("BLE GAP: authentication failed (reason={})", p.fail_reason);
            }
        }
        _ => {}
    }
}

unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_gatts_cb_event_t,
    gatts_if: esp_gatt_if_t,
    param: *mut esp_ble_gatts_cb_param_t,
) {
    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            let Some(service) = SERVICE.lock().ok().and_then(|s| *s) else {
                error!("BLE GATTS: no service registered");
                return;
            };
            // service decl + (char decl + value + CUD) per characteristic
            let num_handles = 1 + 3 * service.characteristics.len() as u16;
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid128_to_esp(service.uuid),
                    inst_id: 0,
                },
                is_primary: service.primary,
            };
            info!("BLE GATTS: app registered (if={})", gatts_if);
            unsafe {
                esp_ble_gatts_create_service(gatts_if, &mut svc_id, num_handles);
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let svc_handle = unsafe { (*param).create.service_handle };
            BLE_SVC_HANDLE.store(u32::from(svc_handle), AtomicOrdering::Relaxed);
            BLE_CHAR_STEP.store(0, AtomicOrdering::Relaxed);
            info!("BLE GATTS: service created (handle={})", svc_handle);
            unsafe {
                esp_ble_gatts_start_service(svc_handle);
            }
            if let Some(first) = characteristic_at(0) {
                unsafe { add_gatt_char(svc_handle, &first) };
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let handle = unsafe { (*param).add_char.attr_handle };
            let step = BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) as usize;
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            if let Some(def) = characteristic_at(step) {
                remember(handle, Attr::Value(def.uuid));
                info!("BLE GATTS: '{}' (handle={})", def.description, handle);
                unsafe { add_cud_descr(svc_handle) };
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
            let handle = unsafe { (*param).add_char_descr.attr_handle };
            let step = BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) as usize;
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            if let Some(def) = characteristic_at(step) {
                remember(handle, Attr::Description(def.uuid));
            }
            BLE_CHAR_STEP.store((step + 1) as u32, AtomicOrdering::Relaxed);
            match characteristic_at(step + 1) {
                Some(next) => unsafe { add_gatt_char(svc_handle, &next) },
                None => {
                    info!("BLE GATTS: attribute table complete");
                    unsafe { start_advertising() };
                }
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let p = unsafe { &(*param).connect };
            info!("BLE GATTS: client connected (conn_id={})", p.conn_id);
            unsafe {
                esp_ble_set_encryption(
                    p.remote_bda.as_ptr() as *mut u8,
                    esp_ble_sec_act_t_ESP_BLE_SEC_ENCRYPT,
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            info!("BLE GATTS: client disconnected");
            unsafe { start_advertising() };
        }
        esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => {
            let p = unsafe { &(*param).read };
            if !p.need_rsp {
                return;
            }
            // The stack has already enforced the encrypted permission.
            let options = RequestOptions {
                offset: p.offset,
                link_encrypted: true,
            };
            let value = match attr_for(p.handle) {
                Some(Attr::Value(uuid)) => with_handler(|h| h.on_read(uuid, &options)),
                Some(Attr::Description(uuid)) => {
                    with_handler(|h| h.on_read_description(uuid, &options))
                }
                None => Err(GattError::UnknownAttribute(u128::from(p.handle))),
            };
            unsafe {
                send_response(
                    gatts_if,
                    p.conn_id,
                    p.trans_id,
                    p.handle,
                    value.as_ref().map(|v| v.as_slice()).map_err(|e| *e),
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
            let options = RequestOptions {
                offset: p.offset,
                link_encrypted: true,
            };
            let result = if p.is_prep {
                Err(GattError::NotSupported)
            } else {
                match attr_for(p.handle) {
                    Some(Attr::Value(uuid)) => with_handler(|h| h.on_write(uuid, data, &options)),
                    Some(Attr::Description(_)) => Err(GattError::NotPermitted),
                    None => Err(GattError::UnknownAttribute(u128::from(p.handle))),
                }
            };
            if let Err(e) = result {
                warn!("BLE GATTS: write to handle {} rejected: {}", p.handle, e);
            }
            if p.need_rsp {
                unsafe {
                    send_response(gatts_if, p.conn_id, p.trans_id, p.handle, result.map(|()| &[][..]));
                }
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BluedroidGatt
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    Idle,
    Advertising,
    Failed,
}

pub struct BluedroidGatt {
    state: BleState,
    device_name: heapless::String<24>,
}

impl BluedroidGatt {
    pub fn new(device_name: heapless::String<24>) -> Self {
        Self {
            state: BleState::Idle,
            device_name,
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    /// Install `handler`, bring the stack up and start advertising once the
    /// attribute table is built.
    pub fn start(&mut self, handler: impl AttributeHandler + Send + 'static) -> Result<(), GattError> {
        {
            let mut slot = HANDLER.lock().map_err(|_| GattError::Failed)?;
            *slot = Some(Box::new(handler));
        }
        if let Err(e) = unsafe { self.platform_start() } {
            self.state = BleState::Failed;
            return Err(e);
        }
        self.state = BleState::Advertising;
        Ok(())
    }

    unsafe fn platform_start(&mut self) -> Result<(), GattError> {
        fn check(step: &str, ret: esp_err_t) -> Result<(), GattError> {
            if ret == ESP_OK as esp_err_t {
                Ok(())
            } else {
                error!("BLE: {} failed ({})", step, ret);
                Err(GattError::Failed)
            }
        }

        unsafe {
            // Release classic BT memory (BLE-only mode).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            check("bt_controller_init", esp_bt_controller_init(&mut bt_cfg))?;
            check(
                "bt_controller_enable",
                esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE),
            )?;
            check("bluedroid_init", esp_bluedroid_init())?;
            check("bluedroid_enable", esp_bluedroid_enable())?;

            check(
                "gap_register_callback",
                esp_ble_gap_register_callback(Some(ble_gap_event_handler)),
            )?;
            check(
                "gatts_register_callback",
                esp_ble_gatts_register_callback(Some(ble_gatts_event_handler)),
            )?;

            // Just-works pairing with bonding; encrypted attributes need it.
            let auth_req = esp_ble_auth_req_t_ESP_LE_AUTH_REQ_SC_BOND;
            let iocap = esp_ble_io_cap_t_ESP_IO_CAP_NONE;
            let key_size: u8 = 16;
            let init_key: u8 = (ESP_BLE_ENC_KEY_MASK | ESP_BLE_ID_KEY_MASK) as u8;
            let rsp_key: u8 = (ESP_BLE_ENC_KEY_MASK | ESP_BLE_ID_KEY_MASK) as u8;
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_AUTHEN_REQ_MODE,
                &auth_req as *const _ as *mut _,
                core::mem::size_of_val(&auth_req) as u8,
            );
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_IOCAP_MODE,
                &iocap as *const _ as *mut _,
                core::mem::size_of_val(&iocap) as u8,
            );
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_MAX_KEY_SIZE,
                &key_size as *const _ as *mut _,
                1,
            );
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_SET_INIT_KEY,
                &init_key as *const _ as *mut _,
                1,
            );
            esp_ble_gap_set_security_param(
                esp_ble_sm_param_t_ESP_BLE_SM_SET_RSP_KEY,
                &rsp_key as *const _ as *mut _,
                1,
            );

            let mut name = [0u8; 25];
            name[..self.device_name.len()].copy_from_slice(self.device_name.as_bytes());
            esp_ble_gap_set_device_name(name.as_ptr() as *const _);

            check("gatts_app_register", esp_ble_gatts_app_register(0))?;
        }
        info!("BLE(espidf): Bluedroid up as '{}'", self.device_name);
        Ok(())
    }
}

impl GattTransport for BluedroidGatt {
    fn register_service(&mut self, service: &ServiceDef) -> Result<(), GattError> {
        let mut slot = SERVICE.lock().map_err(|_| GattError::Failed)?;
        if slot.is_some() {
            return Err(GattError::Failed);
        }
        *slot = Some(*service);
        Ok(())
    }

    fn register_characteristic(
        &mut self,
        service_uuid: u128,
        characteristic: &CharacteristicDef,
    ) -> Result<(), GattError> {
        let registered = SERVICE
            .lock()
            .map_err(|_| GattError::Failed)?
            .map(|s| s.uuid);
        if registered != Some(service_uuid) {
            return Err(GattError::UnknownAttribute(service_uuid));
        }
        CHARACTERISTICS
            .lock()
            .map_err(|_| GattError::Failed)?
            .push(*characteristic)
            .map_err(|_| GattError::Failed)
    }
}
