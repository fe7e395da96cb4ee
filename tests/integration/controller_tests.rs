//! Integration tests for the device controller driving a real relay bank
//! over the recording output.

use chilipad::adapters::thermal::OpenLoopThermal;
use chilipad::app::ports::{DevicePort, Level};
use chilipad::config::PeripheralConfig;
use chilipad::control::device::{DeviceController, PowerState, TemperatureLimits};
use chilipad::drivers::relay::{ChannelMask, RelayBank, RelayChannel};
use chilipad::error::{DeviceError, ErrorClass, RelayError};
use chilipad::pins::{RELAY_CH1_GPIO, RELAY_CH2_GPIO, RELAY_CH3_GPIO};

use super::mock_hw::FakeOutput;

type Controller = DeviceController<FakeOutput, OpenLoopThermal>;

fn controller() -> (Controller, FakeOutput) {
    let out = FakeOutput::new();
    let dev = DeviceController::from_config(
        &PeripheralConfig::default(),
        out.clone(),
        OpenLoopThermal::new(),
    )
    .unwrap();
    (dev, out)
}

#[test]
fn starts_off_and_holds_initial_temperature() {
    let (dev, out) = controller();
    assert_eq!(dev.power_state(), PowerState::Off);
    assert_eq!(dev.get_temp(), 75);
    assert_eq!(dev.target_temp(), 75);
    assert_eq!(dev.limits(), TemperatureLimits::CHILI_PAD);
    for pin in [RELAY_CH1_GPIO, RELAY_CH2_GPIO, RELAY_CH3_GPIO] {
        assert_eq!(out.level_of(pin), Some(Level::Deassert));
    }
}

#[test]
fn set_temp_then_out_of_range_keeps_previous_value() {
    let (mut dev, _out) = controller();
    dev.set_temp(60).unwrap();
    assert_eq!(dev.get_temp(), 60);

    let err = dev.set_temp(110).unwrap_err();
    assert_eq!(err, DeviceError::OutOfRange { value: 110, min: 55, max: 105 });
    assert_eq!(err.class(), ErrorClass::Validation);
    assert_eq!(dev.get_temp(), 60);
    assert_eq!(dev.target_temp(), 60);
}

#[test]
fn limits_are_inclusive() {
    let (mut dev, _out) = controller();
    dev.set_temp(55).unwrap();
    dev.set_temp(105).unwrap();
    assert!(dev.set_temp(54).is_err());
    assert!(dev.set_temp(106).is_err());
    assert_eq!(dev.get_temp(), 105);
}

#[test]
fn power_on_twice_writes_pins_once() {
    let (mut dev, out) = controller();
    out.clear();
    dev.power_on().unwrap();
    let after_first = out.set_level_count();
    assert_eq!(after_first, 2, "CH1 and CH2 only");
    dev.power_on().unwrap();
    assert_eq!(out.set_level_count(), after_first);
    assert_eq!(dev.power_state(), PowerState::On);
}

#[test]
fn power_cycle_switches_only_power_channels() {
    let (mut dev, out) = controller();
    dev.power_on().unwrap();
    assert_eq!(out.level_of(RELAY_CH1_GPIO), Some(Level::Assert));
    assert_eq!(out.level_of(RELAY_CH2_GPIO), Some(Level::Assert));
    assert_eq!(out.level_of(RELAY_CH3_GPIO), Some(Level::Deassert));
    assert_eq!(
        dev.relays().enabled(),
        ChannelMask::from_channels(&[RelayChannel::Ch1, RelayChannel::Ch2])
    );

    dev.power_off().unwrap();
    assert_eq!(dev.power_state(), PowerState::Off);
    assert!(dev.relays().enabled().is_empty());
}

#[test]
fn pin_failure_leaves_power_state_unchanged() {
    let (mut dev, out) = controller();
    out.fail_pin(RELAY_CH2_GPIO);
    let err = dev.power_on().unwrap_err();
    assert_eq!(
        err,
        DeviceError::Relay(RelayError::Partial(ChannelMask::from_channels(&[
            RelayChannel::Ch2
        ])))
    );
    assert_eq!(err.class(), ErrorClass::HardwareIo);
    assert_eq!(dev.power_state(), PowerState::Off);

    // the retry completes once the pin recovers
    out.heal_pin(RELAY_CH2_GPIO);
    dev.power_on().unwrap();
    assert_eq!(dev.power_state(), PowerState::On);
}

#[test]
fn failed_power_on_reopens_closed_channels() {
    let (mut dev, out) = controller();
    out.fail_pin(RELAY_CH2_GPIO);
    assert!(dev.power_on().is_err());
    assert_eq!(dev.power_state(), PowerState::Off);
    assert_eq!(out.level_of(RELAY_CH1_GPIO), Some(Level::Deassert));
    assert!(dev.relays().enabled().is_empty());
}

#[test]
fn power_off_opens_channels_left_closed_by_a_failed_power_on() {
    let (mut dev, out) = controller();
    out.fail_pin(RELAY_CH2_GPIO);
    out.fail_level(RELAY_CH1_GPIO, Level::Deassert);
    assert!(dev.power_on().is_err());
    assert_eq!(dev.power_state(), PowerState::Off);
    assert_eq!(out.level_of(RELAY_CH1_GPIO), Some(Level::Assert));

    out.heal_pin(RELAY_CH1_GPIO);
    out.heal_pin(RELAY_CH2_GPIO);
    dev.power_off().unwrap();
    assert_eq!(dev.power_state(), PowerState::Off);
    assert_eq!(out.level_of(RELAY_CH1_GPIO), Some(Level::Deassert));
    assert!(dev.relays().enabled().is_empty());

    // nothing left closed, so a second OFF writes nothing
    out.clear();
    dev.power_off().unwrap();
    assert_eq!(out.set_level_count(), 0);
}

#[test]
fn record_current_temp_feeds_reads() {
    let (mut dev, _out) = controller();
    dev.set_temp(70).unwrap();
    dev.record_current_temp(78);
    assert_eq!(dev.get_temp(), 78);
    assert_eq!(dev.target_temp(), 70);
}

#[test]
fn dropping_the_controller_releases_the_bank() {
    let (mut dev, out) = controller();
    dev.power_on().unwrap();
    drop(dev);
    assert_eq!(out.cleanup_count(), 1);
    assert_eq!(out.level_of(RELAY_CH1_GPIO), Some(Level::Deassert));
    assert_eq!(out.level_of(RELAY_CH2_GPIO), Some(Level::Deassert));
}

#[test]
fn explicit_limits_and_channels() {
    let out = FakeOutput::new();
    let relays = RelayBank::new(out.clone(), &[RelayChannel::Ch3]).unwrap();
    let limits = TemperatureLimits::new(60, 80).unwrap();
    let mut dev =
        DeviceController::new(relays, OpenLoopThermal::new(), limits, &[RelayChannel::Ch3], 70)
            .unwrap();
    dev.power_on().unwrap();
    assert_eq!(out.level_of(RELAY_CH3_GPIO), Some(Level::Assert));
    assert_eq!(
        dev.set_temp(81),
        Err(DeviceError::OutOfRange { value: 81, min: 60, max: 80 })
    );
}
