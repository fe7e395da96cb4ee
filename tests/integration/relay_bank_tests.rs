//! Integration tests for the relay bank on top of a recording output.

use chilipad::app::ports::Level;
use chilipad::drivers::relay::{ChannelMask, RelayBank, RelayChannel};
use chilipad::error::{ErrorClass, RelayError};
use chilipad::pins::{RELAY_CH1_GPIO, RELAY_CH2_GPIO, RELAY_CH3_GPIO};

use super::mock_hw::{FakeOutput, OutputCall};

fn bank() -> (RelayBank<FakeOutput>, FakeOutput) {
    let out = FakeOutput::new();
    let bank = RelayBank::new(out.clone(), &RelayChannel::ALL).unwrap();
    (bank, out)
}

#[test]
fn construction_forces_every_channel_open() {
    let (bank, out) = bank();
    assert_eq!(
        out.calls(),
        vec![
            OutputCall::SetLevel { pin: RELAY_CH1_GPIO, level: Level::Deassert },
            OutputCall::SetLevel { pin: RELAY_CH2_GPIO, level: Level::Deassert },
            OutputCall::SetLevel { pin: RELAY_CH3_GPIO, level: Level::Deassert },
        ]
    );
    assert!(bank.enabled().is_empty());
}

#[test]
fn all_on_then_all_off() {
    let (mut bank, _out) = bank();
    bank.all_on().unwrap();
    for ch in RelayChannel::ALL {
        assert!(bank.is_on(ch).unwrap(), "{} should be on", ch);
    }
    bank.all_off().unwrap();
    for ch in RelayChannel::ALL {
        assert!(!bank.is_on(ch).unwrap(), "{} should be off", ch);
    }
}

#[test]
fn turn_on_drives_the_mapped_pin() {
    let (mut bank, out) = bank();
    out.clear();
    bank.turn_on(RelayChannel::Ch2).unwrap();
    assert_eq!(
        out.calls(),
        vec![OutputCall::SetLevel { pin: RELAY_CH2_GPIO, level: Level::Assert }]
    );
    assert_eq!(bank.enabled(), ChannelMask::from_channels(&[RelayChannel::Ch2]));
}

#[test]
fn uninstalled_channel_is_a_configuration_error() {
    let out = FakeOutput::new();
    let mut bank = RelayBank::new(out.clone(), &[RelayChannel::Ch1]).unwrap();
    out.clear();
    let err = bank.turn_on(RelayChannel::Ch3).unwrap_err();
    assert_eq!(err, RelayError::UnknownChannel(3));
    assert_eq!(chilipad::error::Error::from(err).class(), ErrorClass::Configuration);
    assert!(bank.is_on(RelayChannel::Ch3).is_err());
    assert!(out.calls().is_empty(), "no pin may be touched");
}

#[test]
fn failed_write_leaves_state_unchanged() {
    let (mut bank, out) = bank();
    out.fail_pin(RELAY_CH1_GPIO);
    let err = bank.turn_on(RelayChannel::Ch1).unwrap_err();
    assert_eq!(err, RelayError::PinWrite(RelayChannel::Ch1));
    assert_eq!(chilipad::error::Error::from(err).class(), ErrorClass::HardwareIo);
    assert!(!bank.is_on(RelayChannel::Ch1).unwrap());

    // retry after the fault clears
    out.heal_pin(RELAY_CH1_GPIO);
    bank.turn_on(RelayChannel::Ch1).unwrap();
    assert!(bank.is_on(RelayChannel::Ch1).unwrap());
}

#[test]
fn sweep_continues_past_a_failing_channel() {
    let (mut bank, out) = bank();
    out.fail_pin(RELAY_CH2_GPIO);
    let err = bank.all_on().unwrap_err();
    assert_eq!(
        err,
        RelayError::Partial(ChannelMask::from_channels(&[RelayChannel::Ch2]))
    );
    assert!(bank.is_on(RelayChannel::Ch1).unwrap());
    assert!(!bank.is_on(RelayChannel::Ch2).unwrap());
    assert!(bank.is_on(RelayChannel::Ch3).unwrap());
}

#[test]
fn repeated_turn_on_writes_every_time() {
    let (mut bank, out) = bank();
    out.clear();
    bank.turn_on(RelayChannel::Ch1).unwrap();
    bank.turn_on(RelayChannel::Ch1).unwrap();
    assert_eq!(out.set_level_count(), 2);
}

#[test]
fn shutdown_opens_channels_and_cleans_up_once() {
    let (mut bank, out) = bank();
    bank.all_on().unwrap();
    bank.shutdown().unwrap();
    assert_eq!(out.cleanup_count(), 1);
    for pin in [RELAY_CH1_GPIO, RELAY_CH2_GPIO, RELAY_CH3_GPIO] {
        assert_eq!(out.level_of(pin), Some(Level::Deassert));
    }
}

#[test]
fn drop_runs_teardown() {
    let out = FakeOutput::new();
    {
        let mut bank = RelayBank::new(out.clone(), &RelayChannel::ALL).unwrap();
        bank.turn_on(RelayChannel::Ch3).unwrap();
    }
    assert_eq!(out.cleanup_count(), 1);
    assert_eq!(out.level_of(RELAY_CH3_GPIO), Some(Level::Deassert));
    assert_eq!(out.calls().last(), Some(&OutputCall::Cleanup));
}

#[test]
fn empty_channel_list_is_refused() {
    assert!(matches!(
        RelayBank::new(FakeOutput::new(), &[]),
        Err(RelayError::UnknownChannel(0))
    ));
}
