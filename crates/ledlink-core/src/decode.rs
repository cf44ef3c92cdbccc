//! Consumer-side interpretation of raw readings
//!
//! The driver only reports how long the junction took to discharge. What a
//! given duration *means* depends on the circuit, the distance to the other
//! diode and the ambient light, so the policy belongs to the caller. These
//! helpers implement the usual policies; nothing in the driver calls them.
//!
//! Shorter readings mean more light.

use serde::{Deserialize, Serialize};

use crate::profile::SensorProfile;

// ============================================================================
// Two-threshold binning
// ============================================================================

/// Classification of one raw reading.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// Discharged quickly: the diode saw light
    Bright,
    /// Discharged slowly or not at all
    Dark,
    /// Between the two thresholds
    Ambiguous,
}

impl Symbol {
    /// Bit value when a bright reading encodes a 1. `None` for ambiguous readings.
    #[must_use]
    pub const fn bit(self) -> Option<bool> {
        match self {
            Self::Bright => Some(true),
            Self::Dark => Some(false),
            Self::Ambiguous => None,
        }
    }
}

/// Bins raw readings with a bright and a dark threshold.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdDecoder {
    /// Readings at or below this are [`Symbol::Bright`]
    pub bright_max_us: u32,
    /// Readings at or above this are [`Symbol::Dark`]
    pub dark_min_us: u32,
}

impl ThresholdDecoder {
    /// Create a decoder. `bright_max_us` should be below `dark_min_us`;
    /// if it is not, bright wins where the ranges overlap.
    #[must_use]
    pub const fn new(bright_max_us: u32, dark_min_us: u32) -> Self {
        Self {
            bright_max_us,
            dark_min_us,
        }
    }

    /// Thresholds at 1/2 and 7/8 of the profile's sample window.
    #[must_use]
    pub const fn for_profile(profile: &SensorProfile) -> Self {
        let window = profile.sample_us;
        Self::new(window / 2, window - window / 8)
    }

    /// Classify one reading.
    #[must_use]
    pub const fn classify(&self, reading_us: u32) -> Symbol {
        if reading_us <= self.bright_max_us {
            Symbol::Bright
        } else if reading_us >= self.dark_min_us {
            Symbol::Dark
        } else {
            Symbol::Ambiguous
        }
    }
}

// ============================================================================
// Byte assembly
// ============================================================================

/// Collects bits least-significant first into bytes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteAssembler {
    value: u8,
    count: u8,
}

impl ByteAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub const fn new() -> Self {
        Self { value: 0, count: 0 }
    }

    /// Add the next bit. Returns the byte once eight bits have arrived.
    pub fn push(&mut self, bit: bool) -> Option<u8> {
        if bit {
            self.value |= 1 << self.count;
        }
        self.count += 1;
        if self.count == 8 {
            let byte = self.value;
            self.reset();
            Some(byte)
        } else {
            None
        }
    }

    /// Number of bits collected towards the current byte.
    #[must_use]
    pub const fn pending(&self) -> u8 {
        self.count
    }

    /// Drop a partially assembled byte.
    pub fn reset(&mut self) {
        self.value = 0;
        self.count = 0;
    }
}

// ============================================================================
// Ambient smoothing
// ============================================================================

/// Moving average of raw readings for ambient light estimates.
///
/// With `N == 0` nothing is held and every average is zero.
#[derive(Clone, Debug)]
pub struct AmbientEstimator<const N: usize> {
    buffer: [u32; N],
    index: usize,
    sum: u64,
    filled: bool,
}

impl<const N: usize> AmbientEstimator<N> {
    /// Create an empty estimator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0; N],
            index: 0,
            sum: 0,
            filled: false,
        }
    }

    /// Add a reading and return the current average reading in µs.
    pub fn push(&mut self, reading_us: u32) -> u32 {
        if N == 0 {
            return 0;
        }

        // Remove oldest value from sum
        self.sum -= u64::from(self.buffer[self.index]);

        self.buffer[self.index] = reading_us;
        self.sum += u64::from(reading_us);

        self.index = (self.index + 1) % N;
        if self.index == 0 {
            self.filled = true;
        }

        self.average_us()
    }

    /// Average of the readings held, or zero if none.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn average_us(&self) -> u32 {
        let count = if self.filled { N } else { self.index };
        if count == 0 {
            return 0;
        }
        (self.sum / count as u64) as u32
    }

    /// Light level in parts per thousand of the sample window: 0 when the
    /// average never discharged, approaching 1000 for instant discharge.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn level_permille(&self, sample_us: u32) -> u16 {
        if sample_us == 0 {
            return 0;
        }
        let dark = u64::from(self.average_us().min(sample_us));
        let window = u64::from(sample_us);
        ((window - dark) * 1000 / window) as u16
    }

    /// Forget all readings.
    pub fn reset(&mut self) {
        self.buffer = [0; N];
        self.index = 0;
        self.sum = 0;
        self.filled = false;
    }
}

impl<const N: usize> Default for AmbientEstimator<N> {
    fn default() -> Self {
        Self::new()
    }
}
