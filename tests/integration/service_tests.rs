//! End-to-end tests: simulated GATT server → PeripheralService →
//! DeviceController → RelayBank → recording output.

use chilipad::adapters::ble::SimGattServer;
use chilipad::adapters::thermal::OpenLoopThermal;
use chilipad::app::events::PeripheralEvent;
use chilipad::app::ports::{DevicePort, Level};
use chilipad::app::service::PeripheralService;
use chilipad::config::PeripheralConfig;
use chilipad::control::device::{DeviceController, PowerState};
use chilipad::error::GattError;
use chilipad::gatt::{RequestOptions, CHAR_POWER, CHAR_TEMPERATURE, CUD_UUID, SERVICE_UUID};
use chilipad::pins::RELAY_CH1_GPIO;

use super::mock_hw::{CountingDevice, FakeOutput, RecordingSink};

type Device = CountingDevice<DeviceController<FakeOutput, OpenLoopThermal>>;
type Service = PeripheralService<Device, RecordingSink>;

const ENC: RequestOptions = RequestOptions::encrypted();

fn setup() -> (Service, SimGattServer, FakeOutput) {
    let out = FakeOutput::new();
    let controller = DeviceController::from_config(
        &PeripheralConfig::default(),
        out.clone(),
        OpenLoopThermal::new(),
    )
    .unwrap();
    let mut service = PeripheralService::new(CountingDevice::new(controller), RecordingSink::new());
    let mut server = SimGattServer::new();
    service.register(&mut server).unwrap();
    (service, server, out)
}

#[test]
fn registers_one_service_with_two_characteristics() {
    let (service, server, _out) = setup();
    assert_eq!(server.services(), &[SERVICE_UUID]);
    let uuids: Vec<u128> = server.characteristics().iter().map(|c| c.def.uuid).collect();
    assert_eq!(uuids, vec![CHAR_POWER, CHAR_TEMPERATURE]);
    assert!(server.characteristics().iter().all(|c| c.service_uuid == SERVICE_UUID));
    assert_eq!(
        service.sink().last(),
        Some(&PeripheralEvent::ServiceRegistered {
            uuid: SERVICE_UUID,
            characteristics: 2
        })
    );
}

#[test]
fn temperature_write_read_and_rejection() {
    let (mut service, server, _out) = setup();
    server.write(&mut service, CHAR_TEMPERATURE, &[60], &ENC).unwrap();
    let read = server.read(&mut service, CHAR_TEMPERATURE, &ENC).unwrap();
    assert_eq!(read.as_slice(), &[60]);

    assert_eq!(
        server.write(&mut service, CHAR_TEMPERATURE, &[110], &ENC),
        Err(GattError::NotPermitted)
    );
    assert_eq!(service.device().get_temp(), 60);
    assert_eq!(
        service.sink().last(),
        Some(&PeripheralEvent::TemperatureRejected { value: 110, min: 55, max: 105 })
    );
    assert_eq!(service.device().set_temp_calls, 1, "rejected writes never reach the controller");
}

#[test]
fn max_accepted_max_plus_one_rejected() {
    let (mut service, server, _out) = setup();
    server.write(&mut service, CHAR_TEMPERATURE, &[105], &ENC).unwrap();
    assert_eq!(
        server.write(&mut service, CHAR_TEMPERATURE, &[106], &ENC),
        Err(GattError::NotPermitted)
    );
    assert_eq!(service.device().inner.target_temp(), 105);
    assert_eq!(
        server.write(&mut service, CHAR_TEMPERATURE, &[54], &ENC),
        Err(GattError::NotPermitted)
    );
}

#[test]
fn empty_temperature_write_is_a_length_error() {
    let (mut service, server, _out) = setup();
    assert_eq!(
        server.write(&mut service, CHAR_TEMPERATURE, &[], &ENC),
        Err(GattError::InvalidValueLength)
    );
    assert_eq!(GattError::InvalidValueLength.att_code(), 0x0D);
}

#[test]
fn power_on_twice_is_one_hardware_transition() {
    let (mut service, server, out) = setup();
    out.clear();
    server.write(&mut service, CHAR_POWER, &[1], &ENC).unwrap();
    let writes = out.set_level_count();
    server.write(&mut service, CHAR_POWER, &[1], &ENC).unwrap();
    assert_eq!(out.set_level_count(), writes);
    assert_eq!(service.device().power_on_calls, 1);
    assert_eq!(out.level_of(RELAY_CH1_GPIO), Some(Level::Assert));
    assert_eq!(
        server.read(&mut service, CHAR_POWER, &ENC).unwrap().as_slice(),
        &[1]
    );
}

#[test]
fn unrecognized_power_byte_is_ignored() {
    let (mut service, server, out) = setup();
    out.clear();
    assert_eq!(server.write(&mut service, CHAR_POWER, &[0x7F], &ENC), Ok(()));
    assert_eq!(service.device().total_calls(), 0);
    assert_eq!(service.device().power_state(), PowerState::Off);
    assert_eq!(out.set_level_count(), 0);
    assert_eq!(
        service.sink().last(),
        Some(&PeripheralEvent::UnrecognizedCommand { byte: Some(0x7F) })
    );
    assert_eq!(
        server.read(&mut service, CHAR_POWER, &ENC).unwrap().as_slice(),
        &[0]
    );
}

#[test]
fn pin_failure_surfaces_as_att_failure() {
    let (mut service, server, out) = setup();
    out.fail_pin(RELAY_CH1_GPIO);
    let err = server.write(&mut service, CHAR_POWER, &[1], &ENC).unwrap_err();
    assert_eq!(err, GattError::Failed);
    assert_eq!(err.att_code(), 0x0E);
    assert_eq!(service.device().power_state(), PowerState::Off);
    assert!(matches!(service.sink().last(), Some(PeripheralEvent::DeviceFault(_))));

    // cache did not move, so a retry reaches the controller again
    out.heal_pin(RELAY_CH1_GPIO);
    server.write(&mut service, CHAR_POWER, &[1], &ENC).unwrap();
    assert_eq!(service.device().power_on_calls, 2);
    assert_eq!(service.device().power_state(), PowerState::On);
}

#[test]
fn unencrypted_link_is_refused_before_decode() {
    let (mut service, server, _out) = setup();
    let plain = RequestOptions::default();
    assert_eq!(
        server.write(&mut service, CHAR_POWER, &[1], &plain),
        Err(GattError::InsufficientEncryption)
    );
    assert_eq!(
        server.read(&mut service, CHAR_TEMPERATURE, &plain),
        Err(GattError::InsufficientEncryption)
    );
    assert_eq!(service.device().total_calls(), 0);
    assert!(service.sink().events.len() == 1, "only the registration event");
}

#[test]
fn user_descriptions_are_readable_not_writable() {
    let (mut service, server, _out) = setup();
    let plain = RequestOptions::default();
    let power = server
        .read_descriptor(&mut service, CHAR_POWER, CUD_UUID, &plain)
        .unwrap();
    assert_eq!(power.as_slice(), b"Chili pad controls");
    let temp = server
        .read_descriptor(&mut service, CHAR_TEMPERATURE, CUD_UUID, &plain)
        .unwrap();
    assert_eq!(temp.as_slice(), b"Set temperature in degrees F");
    assert_eq!(
        server.write_descriptor(CHAR_POWER, CUD_UUID, &ENC),
        Err(GattError::NotPermitted)
    );
}

#[test]
fn read_offsets() {
    let (mut service, server, _out) = setup();
    let past_end = RequestOptions {
        offset: 2,
        link_encrypted: true,
    };
    assert_eq!(
        server.read(&mut service, CHAR_TEMPERATURE, &past_end),
        Err(GattError::InvalidOffset)
    );
    let at_end = RequestOptions {
        offset: 1,
        link_encrypted: true,
    };
    assert!(server.read(&mut service, CHAR_POWER, &at_end).unwrap().is_empty());
    assert_eq!(
        server.write(&mut service, CHAR_TEMPERATURE, &[70], &at_end),
        Err(GattError::InvalidOffset)
    );
}

#[test]
fn teardown_releases_relays() {
    let (mut service, server, out) = setup();
    server.write(&mut service, CHAR_POWER, &[1], &ENC).unwrap();
    let (device, sink) = service.into_parts();
    assert!(!sink.events.is_empty());
    drop(device);
    assert_eq!(out.cleanup_count(), 1);
    assert_eq!(out.level_of(RELAY_CH1_GPIO), Some(Level::Deassert));
}

#[test]
fn sensor_sample_shows_up_in_temperature_reads() {
    let (mut service, server, _out) = setup();
    server.write(&mut service, CHAR_TEMPERATURE, &[70], &ENC).unwrap();
    service.device_mut().inner.record_current_temp(78);

    let read = server.read(&mut service, CHAR_TEMPERATURE, &ENC).unwrap();
    assert_eq!(read.as_slice(), &[78]);
    assert_eq!(service.device().inner.target_temp(), 70);
    assert_eq!(service.sink().last(), Some(&PeripheralEvent::TemperatureRead(78)));
}
