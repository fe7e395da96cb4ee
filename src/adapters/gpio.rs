//! GPIO output adapter.
//!
//! Implements [`DigitalOutput`] over any set of embedded-hal `OutputPin`s.
//! On the device these are `esp_idf_hal::gpio::PinDriver`s; host tests use a
//! recording mock.  Pins are addressed by their board GPIO number (see
//! [`crate::pins`]) and the adapter owns the electrical polarity.

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::app::ports::{DigitalOutput, Level, OutputError};

/// Most output pins one adapter drives.
pub const MAX_OUTPUTS: usize = 8;

pub struct HalOutputs<P: OutputPin> {
    pins: heapless::Vec<(u8, P), MAX_OUTPUTS>,
    /// `Level::Assert` drives the pin LOW.
    active_low: bool,
}

impl<P: OutputPin> HalOutputs<P> {
    pub fn new(active_low: bool) -> Self {
        Self {
            pins: heapless::Vec::new(),
            active_low,
        }
    }

    /// Take ownership of `pin` under the board number `id`.  The pin is
    /// driven to the de-asserted level immediately.
    pub fn add(&mut self, id: u8, mut pin: P) -> Result<(), OutputError> {
        if self.pins.iter().any(|(existing, _)| *existing == id) {
            return Err(OutputError::DuplicatePin(id));
        }
        drive(&mut pin, !self.active_low).map_err(|()| OutputError::WriteFailed(id))?;
        self.pins
            .push((id, pin))
            .map_err(|_| OutputError::TableFull(id))?;
        debug!("gpio: pin {} configured (active_low={})", id, self.active_low);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    fn high_for(&self, level: Level) -> bool {
        match level {
            Level::Assert => !self.active_low,
            Level::Deassert => self.active_low,
        }
    }
}

fn drive<P: OutputPin>(pin: &mut P, high: bool) -> Result<(), ()> {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.map_err(|_| ())
}

impl<P: OutputPin> DigitalOutput for HalOutputs<P> {
    fn set_level(&mut self, pin: u8, level: Level) -> Result<(), OutputError> {
        let high = self.high_for(level);
        let (_, driver) = self
            .pins
            .iter_mut()
            .find(|(id, _)| *id == pin)
            .ok_or(OutputError::UnknownPin(pin))?;
        drive(driver, high).map_err(|()| OutputError::WriteFailed(pin))
    }

    fn cleanup(&mut self) {
        let idle_high = self.active_low;
        for (id, pin) in &mut self.pins {
            if drive(pin, idle_high).is_err() {
                warn!("gpio: pin {} failed to idle during cleanup", id);
            }
        }
        // Dropping the drivers hands the pins back to the HAL.
        self.pins.clear();
        debug!("gpio: outputs released");
    }
}
