//! Open-loop thermal adapter.
//!
//! The reference board has no setpoint drive into the chiller and no pad
//! sensor; the relay bank only switches mains and the pump.  This adapter
//! accepts and remembers setpoints, and reports no samples so the controller
//! treats the pad as settling on its target.
//!
//! A board with a thermistor or a chiller serial link implements
//! [`ThermalPort`] in its place.

use log::info;

use crate::app::ports::ThermalPort;
use crate::error::DeviceError;

#[derive(Debug, Default)]
pub struct OpenLoopThermal {
    setpoint: Option<i32>,
}

impl OpenLoopThermal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last setpoint handed to the adapter.
    pub fn setpoint(&self) -> Option<i32> {
        self.setpoint
    }
}

impl ThermalPort for OpenLoopThermal {
    fn command_setpoint(&mut self, fahrenheit: i32) -> Result<(), DeviceError> {
        info!("thermal: setpoint {}F not forwarded, no chiller drive fitted", fahrenheit);
        self.setpoint = Some(fahrenheit);
        Ok(())
    }

    fn read_current(&mut self) -> Option<i32> {
        None
    }
}
