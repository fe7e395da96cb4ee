//! Chili pad device controller.
//!
//! Owns the relay bank and thermal port and is the single source of truth for
//! `power_state`, `temperature_target` and `temperature_current`.  Those
//! fields change only through the methods below; the GATT layer reaches them
//! through [`DevicePort`].
//!
//! The controller always starts OFF with every relay open.  Turning the pad
//! on requires an explicit `power_on()` (a remote ON write).

use log::{debug, info, warn};

use crate::app::ports::{DevicePort, DigitalOutput, ThermalPort};
use crate::config::PeripheralConfig;
use crate::drivers::relay::{ChannelMask, RelayBank, RelayChannel};
use crate::error::{DeviceError, RelayError};

// ───────────────────────────────────────────────────────────────
// Value types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PowerState {
    #[default]
    Off = 0,
    On = 1,
}

/// Inclusive setpoint bounds in °F, fixed per device model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureLimits {
    min: i32,
    max: i32,
}

impl TemperatureLimits {
    /// Chili pad cube: 55–105 °F.
    pub const CHILI_PAD: Self = Self { min: 55, max: 105 };

    /// Returns `None` when `min > max`.
    pub const fn new(min: i32, max: i32) -> Option<Self> {
        if min > max {
            None
        } else {
            Some(Self { min, max })
        }
    }

    pub const fn min(self) -> i32 {
        self.min
    }

    pub const fn max(self) -> i32 {
        self.max
    }

    pub const fn contains(self, fahrenheit: i32) -> bool {
        self.min <= fahrenheit && fahrenheit <= self.max
    }

    /// `Ok` if in range, else the matching [`DeviceError::OutOfRange`].
    pub fn check(self, fahrenheit: i32) -> Result<(), DeviceError> {
        if self.contains(fahrenheit) {
            Ok(())
        } else {
            Err(DeviceError::OutOfRange {
                value: fahrenheit,
                min: self.min,
                max: self.max,
            })
        }
    }
}

// ───────────────────────────────────────────────────────────────
// DeviceController
// ───────────────────────────────────────────────────────────────

pub struct DeviceController<O: DigitalOutput, T: ThermalPort> {
    relays: RelayBank<O>,
    thermal: T,
    limits: TemperatureLimits,
    /// Channels energised by `power_on`.
    power_channels: ChannelMask,
    power_state: PowerState,
    temperature_target: i32,
    temperature_current: i32,
}

impl<O: DigitalOutput, T: ThermalPort> DeviceController<O, T> {
    /// Build the controller.  `initial_temp` seeds both target and current
    /// temperature and must lie inside `limits`.
    pub fn new(
        relays: RelayBank<O>,
        thermal: T,
        limits: TemperatureLimits,
        power_channels: &[RelayChannel],
        initial_temp: i32,
    ) -> Result<Self, DeviceError> {
        limits.check(initial_temp)?;
        for &ch in power_channels {
            if !relays.installed().contains(ch) {
                return Err(RelayError::UnknownChannel(ch as u8).into());
            }
        }
        info!(
            "device: limits {}..={}F, power channels {}, initial {}F, power OFF",
            limits.min,
            limits.max,
            ChannelMask::from_channels(power_channels),
            initial_temp
        );
        Ok(Self {
            relays,
            thermal,
            limits,
            power_channels: ChannelMask::from_channels(power_channels),
            power_state: PowerState::Off,
            temperature_target: initial_temp,
            temperature_current: initial_temp,
        })
    }

    /// Build from a validated config for the chili pad model.
    pub fn from_config(
        config: &PeripheralConfig,
        output: O,
        thermal: T,
    ) -> Result<Self, DeviceError> {
        let relays = RelayBank::new(output, &config.relay_channels)?;
        Self::new(
            relays,
            thermal,
            TemperatureLimits::CHILI_PAD,
            &config.power_channels,
            config.initial_temp_f,
        )
    }

    pub fn target_temp(&self) -> i32 {
        self.temperature_target
    }

    pub fn relays(&self) -> &RelayBank<O> {
        &self.relays
    }

    /// Sensor feed entry point.  Taking `&mut self` keeps every writer on the
    /// owning context.
    pub fn record_current_temp(&mut self, fahrenheit: i32) {
        if fahrenheit != self.temperature_current {
            debug!("device: current {}F -> {}F", self.temperature_current, fahrenheit);
        }
        self.temperature_current = fahrenheit;
    }

    /// Poll the thermal port once and record the sample, if any.
    pub fn refresh_current_temp(&mut self) -> i32 {
        if let Some(sample) = self.thermal.read_current() {
            self.record_current_temp(sample);
        }
        self.temperature_current
    }

    /// Power channels the relay bank currently records as closed.
    fn energised_power_channels(&self) -> ChannelMask {
        self.relays.enabled().intersection(self.power_channels)
    }

    /// Drive every power channel; a failure does not stop the sweep.
    fn switch_power_channels(&mut self, on: bool) -> Result<(), RelayError> {
        let mut failed = ChannelMask::EMPTY;
        for ch in self.power_channels.iter() {
            let result = if on {
                self.relays.turn_on(ch)
            } else {
                self.relays.turn_off(ch)
            };
            if result.is_err() {
                failed.insert(ch);
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(RelayError::Partial(failed))
        }
    }
}

impl<O: DigitalOutput, T: ThermalPort> DevicePort for DeviceController<O, T> {
    fn power_on(&mut self) -> Result<(), DeviceError> {
        if self.power_state == PowerState::On {
            debug!("device: already ON");
            return Ok(());
        }
        if let Err(e) = self.switch_power_channels(true) {
            // Leave no power channel closed behind an OFF state.
            let closed = self.energised_power_channels();
            warn!("device: power ON failed ({}), reopening {}", e, closed);
            for ch in closed.iter() {
                if self.relays.turn_off(ch).is_err() {
                    warn!("device: {:?} could not be reopened", ch);
                }
            }
            return Err(e.into());
        }
        self.power_state = PowerState::On;
        info!("device: power ON");
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), DeviceError> {
        if self.power_state == PowerState::Off && self.energised_power_channels().is_empty() {
            debug!("device: already OFF");
            return Ok(());
        }
        self.switch_power_channels(false)?;
        self.power_state = PowerState::Off;
        info!("device: power OFF");
        Ok(())
    }

    fn set_temp(&mut self, fahrenheit: i32) -> Result<(), DeviceError> {
        self.limits.check(fahrenheit)?;
        self.thermal.command_setpoint(fahrenheit)?;
        self.temperature_target = fahrenheit;
        // Without a sensor the pad is assumed to settle on the setpoint.
        match self.thermal.read_current() {
            Some(sample) => self.record_current_temp(sample),
            None => self.record_current_temp(fahrenheit),
        }
        info!("device: target {}F", fahrenheit);
        Ok(())
    }

    fn get_temp(&self) -> i32 {
        self.temperature_current
    }

    fn limits(&self) -> TemperatureLimits {
        self.limits
    }

    fn power_state(&self) -> PowerState {
        self.power_state
    }
}

impl<O: DigitalOutput, T: ThermalPort> Drop for DeviceController<O, T> {
    fn drop(&mut self) {
        if self.power_state == PowerState::On {
            warn!("device: dropped while ON, relay bank will force channels open");
        }
    }
}
