//! GPIO pin assignments for the chili pad relay board.
//!
//! Single source of truth: the relay driver references this module rather
//! than hard-coding pin numbers.  Change a pin here and it propagates everywhere.
//!
//! The reference board is a three-channel opto-isolated relay hat.  Its inputs
//! are active LOW: driving the pin low closes the relay contact.

// ---------------------------------------------------------------------------
// Relay channels
// ---------------------------------------------------------------------------

/// CH1: mains feed to the chiller unit.
pub const RELAY_CH1_GPIO: u8 = 37;
/// CH2: circulation pump.
pub const RELAY_CH2_GPIO: u8 = 38;
/// CH3: spare output, not energised by power-on in the default config.
pub const RELAY_CH3_GPIO: u8 = 40;

/// Relay inputs close the contact when driven low.
pub const RELAY_ACTIVE_LOW: bool = true;
