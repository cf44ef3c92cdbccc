//! Core types for the LED transceiver
//!
//! The diode is always in exactly one of three pin configurations:
//!
//! ```text
//!               Anode pin   (+) LED (-)   Cathode pin
//! Emit:         OUT high    ---->|----    OUT low      (conducts, lights)
//! ReverseBias:  OUT low     ---->|----    OUT high     (dark, junction charges)
//! Discharge:    OUT low     ---->|----    IN (hi-Z)    (charge bleeds off, faster in light)
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TransceiverError;

// ============================================================================
// Drive Mode
// ============================================================================

/// Pin configuration of the diode.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DriveMode {
    /// Forward biased: anode high, cathode low. The diode emits light.
    Emit = 0,
    /// Reverse biased: anode low, cathode high. No light, junction capacitance charges.
    ReverseBias = 1,
    /// Anode low, cathode floating input. The stored charge leaks away through
    /// the junction, faster the more light falls on it.
    Discharge = 2,
}

impl DriveMode {
    /// All modes in code order.
    pub const ALL: [Self; 3] = [Self::Emit, Self::ReverseBias, Self::Discharge];

    /// Numeric mode code as used by consumers that pass modes around as integers.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Try to convert a numeric mode code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Emit),
            1 => Some(Self::ReverseBias),
            2 => Some(Self::Discharge),
            _ => None,
        }
    }

    /// Map a boolean on/off state: `true` lights the diode, `false` darkens it.
    #[must_use]
    pub const fn from_on(on: bool) -> Self {
        if on {
            Self::Emit
        } else {
            Self::ReverseBias
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Emit => "emit",
            Self::ReverseBias => "reverse-bias",
            Self::Discharge => "discharge",
        }
    }
}

impl TryFrom<u8> for DriveMode {
    type Error = TransceiverError<core::convert::Infallible>;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(TransceiverError::InvalidMode { requested: code })
    }
}

impl fmt::Display for DriveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DriveMode {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.name());
    }
}

// ============================================================================
// Discharge Polarity
// ============================================================================

/// Logic level the cathode input settles at once the junction has discharged.
///
/// Depends on the input buffer, any pull resistors, and the diode itself, so
/// it must be confirmed on real hardware before trusting readings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DischargePolarity {
    /// Cathode reads high while charged and drops low once discharged.
    #[default]
    FallsLow,
    /// Cathode reads low while charged and rises high once discharged.
    RisesHigh,
}

impl DischargePolarity {
    /// Whether a cathode reading at `is_high` means the junction has discharged.
    #[inline]
    #[must_use]
    pub const fn is_discharged(self, is_high: bool) -> bool {
        match self {
            Self::FallsLow => !is_high,
            Self::RisesHigh => is_high,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DischargePolarity {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::FallsLow => defmt::write!(f, "falls-low"),
            Self::RisesHigh => defmt::write!(f, "rises-high"),
        }
    }
}
