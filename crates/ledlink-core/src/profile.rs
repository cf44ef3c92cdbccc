//! Sensor profiles
//!
//! A profile is the full set of timing constants for one use case. The same
//! diode can be driven with short, fast periods to separate data bits or with
//! long charge/sample windows to measure ambient brightness over a wide range.
//!
//! The predefined values were tuned against a standard 5 mm red LED with a
//! 1 kΩ series resistor; other parts need their own profiles.

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// Timing constants for transmit and receive, all in microseconds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorProfile {
    /// Emit time for a 1-bit
    pub mark_us: u32,
    /// Emit time for a 0-bit
    pub space_us: u32,
    /// Total width of one bit slot, emit plus reverse-bias
    pub period_us: u32,
    /// Reverse-bias hold before each reading
    pub charge_us: u32,
    /// Longest time a reading waits for discharge
    pub sample_us: u32,
}

impl SensorProfile {
    /// Short periods for bit-level communication.
    ///
    /// Charge plus sample fits inside one bit period with some slack, so a
    /// receiver can re-align each reading to the transmitter's slot boundary.
    pub const COMMS: Self = Self::new(750, 250, 1_000, 100, 850);

    /// Long charge and sample windows for ambient light measurement.
    pub const LIGHT: Self = Self::new(8_000, 2_000, 10_000, 2_000, 60_000);

    /// Create a profile from raw timing constants.
    ///
    /// No checks are made here; the driver accepts any profile. Use
    /// [`validate`](Self::validate) on values loaded from configuration.
    #[must_use]
    pub const fn new(
        mark_us: u32,
        space_us: u32,
        period_us: u32,
        charge_us: u32,
        sample_us: u32,
    ) -> Self {
        Self {
            mark_us,
            space_us,
            period_us,
            charge_us,
            sample_us,
        }
    }

    /// Look up a predefined profile by name (`comms` or `light`).
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "comms" => Some(Self::COMMS),
            "light" => Some(Self::LIGHT),
            _ => None,
        }
    }

    /// Emit time for a bit value.
    #[inline]
    #[must_use]
    pub const fn bit_width(&self, bit: bool) -> u32 {
        if bit {
            self.mark_us
        } else {
            self.space_us
        }
    }

    /// Reverse-bias time following the pulse for a bit value.
    ///
    /// Saturates at zero when the pulse is longer than the period.
    #[inline]
    #[must_use]
    pub const fn bit_gap(&self, bit: bool) -> u32 {
        self.period_us.saturating_sub(self.bit_width(bit))
    }

    /// Nominal wall time of one reading (charge plus full sample window).
    #[must_use]
    pub const fn read_duration_us(&self) -> u64 {
        self.charge_us as u64 + self.sample_us as u64
    }

    /// Nominal wall time of sending `bytes` bytes.
    #[must_use]
    pub const fn send_duration_us(&self, bytes: usize) -> u64 {
        self.period_us as u64 * 8 * bytes as u64
    }

    /// Check that the profile describes a usable timing.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError`] if the period or sample window is zero, or if
    /// a mark or space pulse is longer than the period.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.period_us == 0 {
            return Err(ProfileError::ZeroPeriod);
        }
        if self.sample_us == 0 {
            return Err(ProfileError::ZeroSampleWindow);
        }
        for pulse_us in [self.mark_us, self.space_us] {
            if pulse_us > self.period_us {
                return Err(ProfileError::PulseExceedsPeriod {
                    pulse_us,
                    period_us: self.period_us,
                });
            }
        }
        Ok(())
    }
}

impl Default for SensorProfile {
    fn default() -> Self {
        Self::COMMS
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SensorProfile {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Profile(mark={}us space={}us period={}us charge={}us sample={}us)",
            self.mark_us,
            self.space_us,
            self.period_us,
            self.charge_us,
            self.sample_us
        );
    }
}
