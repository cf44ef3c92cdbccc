//! Error types for the Ledlink transceiver
//!
//! These errors work in `no_std` environments and carry enough context to
//! tell a rejected request from a half-finished transmission without any
//! heap allocation.

use core::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Transceiver Errors
// ============================================================================

/// Errors from the LED transceiver driver.
///
/// `E` is the pin error type of the underlying GPIO implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransceiverError<E> {
    /// A numeric mode code outside the known modes was requested.
    /// No pin was touched and the stored mode is unchanged.
    InvalidMode {
        /// The rejected mode code
        requested: u8,
    },
    /// A pin refused a direction or level change, or could not be read.
    Pin(E),
    /// A byte transmission stopped partway through. Every bit before
    /// `bit_index` of byte `byte_index` has already been emitted.
    TransmissionAborted {
        /// Index of the byte being sent within the sequence
        byte_index: usize,
        /// Index of the failing bit within that byte (0 = least significant)
        bit_index: u8,
        /// The pin error that interrupted the transition
        source: E,
    },
}

impl<E: fmt::Debug> fmt::Display for TransceiverError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMode { requested } => {
                write!(f, "Invalid drive mode code {requested}")
            }
            Self::Pin(e) => write!(f, "Pin error: {e:?}"),
            Self::TransmissionAborted { byte_index, bit_index, source } => {
                write!(
                    f,
                    "Transmission aborted at byte {byte_index}, bit {bit_index}: {source:?}"
                )
            }
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for TransceiverError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::InvalidMode { requested } => defmt::write!(f, "Invalid mode {}", requested),
            Self::Pin(e) => defmt::write!(f, "Pin error: {}", e),
            Self::TransmissionAborted { byte_index, bit_index, source } => {
                defmt::write!(f, "TX aborted byte {} bit {}: {}", byte_index, bit_index, source);
            }
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug> std::error::Error for TransceiverError<E> {}

// ============================================================================
// Profile Errors
// ============================================================================

/// Errors from validating a configuration-supplied sensor profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileError {
    /// A mark or space pulse does not fit inside the bit period
    PulseExceedsPeriod {
        /// Offending pulse width in µs
        pulse_us: u32,
        /// Bit period in µs
        period_us: u32,
    },
    /// The bit period is zero
    ZeroPeriod,
    /// The sample window is zero, so every reading would be zero
    ZeroSampleWindow,
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PulseExceedsPeriod { pulse_us, period_us } => {
                write!(f, "Pulse {pulse_us}µs longer than bit period {period_us}µs")
            }
            Self::ZeroPeriod => write!(f, "Bit period is zero"),
            Self::ZeroSampleWindow => write!(f, "Sample window is zero"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ProfileError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::PulseExceedsPeriod { pulse_us, period_us } => {
                defmt::write!(f, "Pulse {}us > period {}us", pulse_us, period_us);
            }
            Self::ZeroPeriod => defmt::write!(f, "Zero period"),
            Self::ZeroSampleWindow => defmt::write!(f, "Zero sample window"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProfileError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;

    #[test]
    fn test_transmission_aborted_display() {
        let err: TransceiverError<&str> = TransceiverError::TransmissionAborted {
            byte_index: 2,
            bit_index: 5,
            source: "stuck",
        };
        assert_eq!(
            format!("{err}"),
            "Transmission aborted at byte 2, bit 5: \"stuck\""
        );
    }

    #[test]
    fn test_invalid_mode_display() {
        let err: TransceiverError<()> = TransceiverError::InvalidMode { requested: 7 };
        assert_eq!(format!("{err}"), "Invalid drive mode code 7");
    }

    #[test]
    fn test_profile_error_display() {
        let err = ProfileError::PulseExceedsPeriod { pulse_us: 1200, period_us: 1000 };
        assert_eq!(format!("{err}"), "Pulse 1200µs longer than bit period 1000µs");
    }
}
