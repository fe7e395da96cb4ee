//! Three-channel relay board driver.
//!
//! Tracks the logical on/off state of each installed channel on top of a
//! [`DigitalOutput`] primitive.  The enabled mask is only updated after the pin
//! write succeeds, so it always mirrors the last commanded physical state.
//!
//! ## Teardown
//!
//! The bank owns the output primitive.  [`RelayBank::shutdown`] (or `Drop`,
//! on any other exit path) forces every channel open and calls
//! [`DigitalOutput::cleanup`] exactly once.

use core::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{DigitalOutput, Level};
use crate::error::RelayError;
use crate::pins;

// ───────────────────────────────────────────────────────────────
// Channels
// ───────────────────────────────────────────────────────────────

/// Physical relay channels on the reference board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum RelayChannel {
    Ch1 = 1,
    Ch2 = 2,
    Ch3 = 3,
}

impl RelayChannel {
    /// Every channel, in enumeration order.
    pub const ALL: [Self; 3] = [Self::Ch1, Self::Ch2, Self::Ch3];

    /// GPIO driving this channel.
    pub const fn pin(self) -> u8 {
        match self {
            Self::Ch1 => pins::RELAY_CH1_GPIO,
            Self::Ch2 => pins::RELAY_CH2_GPIO,
            Self::Ch3 => pins::RELAY_CH3_GPIO,
        }
    }

    /// Bit for this channel in a [`ChannelMask`].
    pub const fn mask(self) -> u8 {
        1 << (self as u8 - 1)
    }
}

impl TryFrom<u8> for RelayChannel {
    type Error = RelayError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Self::Ch1),
            2 => Ok(Self::Ch2),
            3 => Ok(Self::Ch3),
            other => Err(RelayError::UnknownChannel(other)),
        }
    }
}

impl fmt::Display for RelayChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", *self as u8)
    }
}

/// A set of channels, one bit each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelMask(u8);

impl ChannelMask {
    pub const EMPTY: Self = Self(0);

    pub fn from_channels(channels: &[RelayChannel]) -> Self {
        let mut mask = Self::EMPTY;
        for &ch in channels {
            mask.insert(ch);
        }
        mask
    }

    pub fn insert(&mut self, ch: RelayChannel) {
        self.0 |= ch.mask();
    }

    pub fn remove(&mut self, ch: RelayChannel) {
        self.0 &= !ch.mask();
    }

    pub const fn contains(self, ch: RelayChannel) -> bool {
        self.0 & ch.mask() != 0
    }

    /// Channels present in both sets.
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Channels in the set, in enumeration order.
    pub fn iter(self) -> impl Iterator<Item = RelayChannel> {
        RelayChannel::ALL.into_iter().filter(move |&ch| self.contains(ch))
    }
}

impl fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for ch in self.iter() {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{ch}")?;
            first = false;
        }
        if first {
            write!(f, "none")?;
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// RelayBank
// ───────────────────────────────────────────────────────────────

pub struct RelayBank<O: DigitalOutput> {
    output: O,
    installed: ChannelMask,
    enabled: ChannelMask,
    released: bool,
}

impl<O: DigitalOutput> RelayBank<O> {
    /// Take ownership of `output` and drive every installed channel open so the
    /// hardware matches the all-disabled starting state.
    pub fn new(output: O, installed: &[RelayChannel]) -> Result<Self, RelayError> {
        if installed.is_empty() {
            return Err(RelayError::UnknownChannel(0));
        }
        let mut bank = Self {
            output,
            installed: ChannelMask::from_channels(installed),
            enabled: ChannelMask::EMPTY,
            released: false,
        };
        // On failure `bank` is dropped here, which still runs cleanup.
        bank.all_off()?;
        debug!("relay: bank ready, installed={}", bank.installed);
        Ok(bank)
    }

    /// Close the channel's contact.
    pub fn turn_on(&mut self, ch: RelayChannel) -> Result<(), RelayError> {
        self.drive(ch, Level::Assert)?;
        self.enabled.insert(ch);
        Ok(())
    }

    /// Open the channel's contact.
    pub fn turn_off(&mut self, ch: RelayChannel) -> Result<(), RelayError> {
        self.drive(ch, Level::Deassert)?;
        self.enabled.remove(ch);
        Ok(())
    }

    /// Turn on every installed channel.  Failures don't stop the sweep; the
    /// error carries the mask of channels that failed.
    pub fn all_on(&mut self) -> Result<(), RelayError> {
        self.sweep(true)
    }

    /// Turn off every installed channel.  Same failure semantics as [`all_on`](Self::all_on).
    pub fn all_off(&mut self) -> Result<(), RelayError> {
        self.sweep(false)
    }

    /// Last recorded state.  Hardware is never re-read.
    pub fn is_on(&self, ch: RelayChannel) -> Result<bool, RelayError> {
        self.check_installed(ch)?;
        Ok(self.enabled.contains(ch))
    }

    pub fn installed(&self) -> ChannelMask {
        self.installed
    }

    pub fn enabled(&self) -> ChannelMask {
        self.enabled
    }

    /// Force every channel open and release the pins.
    pub fn shutdown(mut self) -> Result<(), RelayError> {
        self.release()
    }

    fn sweep(&mut self, on: bool) -> Result<(), RelayError> {
        let mut failed = ChannelMask::EMPTY;
        for ch in self.installed.iter() {
            let result = if on { self.turn_on(ch) } else { self.turn_off(ch) };
            if let Err(e) = result {
                warn!("relay: {}", e);
                failed.insert(ch);
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(RelayError::Partial(failed))
        }
    }

    fn drive(&mut self, ch: RelayChannel, level: Level) -> Result<(), RelayError> {
        self.check_installed(ch)?;
        self.output
            .set_level(ch.pin(), level)
            .map_err(|_| RelayError::PinWrite(ch))?;
        debug!("relay: {} -> {:?}", ch, level);
        Ok(())
    }

    fn check_installed(&self, ch: RelayChannel) -> Result<(), RelayError> {
        if self.installed.contains(ch) {
            Ok(())
        } else {
            Err(RelayError::UnknownChannel(ch as u8))
        }
    }

    fn release(&mut self) -> Result<(), RelayError> {
        if self.released {
            return Ok(());
        }
        let result = self.all_off();
        self.output.cleanup();
        self.released = true;
        result
    }
}

impl<O: DigitalOutput> Drop for RelayBank<O> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("relay: teardown left channels in unknown state: {}", e);
        }
    }
}
