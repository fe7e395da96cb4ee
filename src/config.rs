//! Peripheral configuration parameters
//!
//! Relay wiring and start-up values for one chili pad peripheral.
//! Pin numbers are not configured here; see [`crate::pins`].

use serde::{Deserialize, Serialize};

use crate::control::device::TemperatureLimits;
use crate::drivers::relay::{ChannelMask, RelayChannel};
use crate::error::ConfigError;
use crate::pins::RELAY_ACTIVE_LOW;

/// Upper bound on relay channels a board can carry.
pub const MAX_CHANNELS: usize = 3;

pub type ChannelList = heapless::Vec<RelayChannel, MAX_CHANNELS>;

/// Core peripheral configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeripheralConfig {
    // --- Relays ---
    /// Channels wired on the relay board
    pub relay_channels: ChannelList,
    /// Channels closed by a power-on (chiller mains and pump)
    pub power_channels: ChannelList,
    /// A closed relay is driven LOW
    pub relay_active_low: bool,

    // --- Thermal ---
    /// Target temperature (°F) at start-up
    pub initial_temp_f: i32,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            relay_channels: ChannelList::from_slice(&RelayChannel::ALL).unwrap_or_default(),
            power_channels: ChannelList::from_slice(&[RelayChannel::Ch1, RelayChannel::Ch2])
                .unwrap_or_default(),
            relay_active_low: RELAY_ACTIVE_LOW,
            initial_temp_f: 75,
        }
    }
}

impl PeripheralConfig {
    /// Reject anything the controller would refuse.  Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay_channels.is_empty() {
            return Err(ConfigError::ValidationFailed("relay_channels is empty"));
        }
        if has_duplicates(&self.relay_channels) {
            return Err(ConfigError::ValidationFailed("relay_channels has duplicates"));
        }
        if has_duplicates(&self.power_channels) {
            return Err(ConfigError::ValidationFailed("power_channels has duplicates"));
        }
        let installed = ChannelMask::from_channels(&self.relay_channels);
        if self.power_channels.iter().any(|&ch| !installed.contains(ch)) {
            return Err(ConfigError::ValidationFailed(
                "power_channels names a channel not in relay_channels",
            ));
        }
        if !TemperatureLimits::CHILI_PAD.contains(self.initial_temp_f) {
            return Err(ConfigError::ValidationFailed(
                "initial_temp_f outside device limits",
            ));
        }
        Ok(())
    }

    /// Parse a JSON document and validate it.  Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            log::warn!("config: parse error: {}", e);
            ConfigError::Malformed
        })?;
        config.validate()?;
        Ok(config)
    }
}

fn has_duplicates(channels: &[RelayChannel]) -> bool {
    ChannelMask::from_channels(channels).iter().count() != channels.len()
}
