//! Two-pin LED transceiver
//!
//! Driver for an LED used as both light source and light sensor.
//!
//! # Sensing
//!
//! A reverse-biased LED stores a little charge in its junction capacitance.
//! With the cathode switched to a floating input, that charge leaks away
//! through the junction; photocurrent makes it leak faster. The time until
//! the cathode input flips is therefore a rough, inverted light reading.
//!
//! ```text
//! read():  |-- ReverseBias, Tc --|-- Discharge, poll until flip ... pad to Ts --|
//!                                 ^ reading = time to flip, capped at Ts
//! ```
//!
//! # Sending
//!
//! Each bit is one fixed period `Tp`: the diode emits for the mark width (1)
//! or space width (0), then sits reverse-biased for the rest of the period.
//! Bytes go out least-significant bit first with no framing.
//!
//! ```text
//! 0x55, LSB first:  1    0    1    0    1    0    1    0
//! Emit:            ███░ █░░░ ███░ █░░░ ███░ █░░░ ███░ █░░░
//! ```

use embedded_hal::digital::PinState;

use ledlink_core::error::TransceiverError;
use ledlink_core::profile::SensorProfile;
use ledlink_core::timer::{busy_wait, MonotonicClock, Timer};
use ledlink_core::types::{DischargePolarity, DriveMode};

use crate::pin::{Direction, FlexPin};

/// LED transceiver over an anode pin, a cathode pin and a microsecond clock.
///
/// The stored [`mode`](Self::mode) is always the last configuration fully
/// committed to the pins.
pub struct Transceiver<A, C, K> {
    anode: A,
    cathode: C,
    clock: K,
    mode: DriveMode,
    profile: SensorProfile,
    polarity: DischargePolarity,
}

impl<A, C, K, E> Transceiver<A, C, K>
where
    A: FlexPin<Error = E>,
    C: FlexPin<Error = E>,
    K: MonotonicClock,
{
    /// Create a transceiver and put the diode into [`DriveMode::ReverseBias`].
    ///
    /// # Errors
    ///
    /// Returns [`TransceiverError::Pin`] if the initial configuration fails.
    pub fn new(
        anode: A,
        cathode: C,
        clock: K,
        profile: SensorProfile,
    ) -> Result<Self, TransceiverError<E>> {
        let mut transceiver = Self {
            anode,
            cathode,
            clock,
            mode: DriveMode::ReverseBias,
            profile,
            polarity: DischargePolarity::default(),
        };
        transceiver.commit(DriveMode::ReverseBias).map_err(TransceiverError::Pin)?;
        Ok(transceiver)
    }

    /// Current drive mode.
    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    /// Active sensor profile.
    pub fn profile(&self) -> &SensorProfile {
        &self.profile
    }

    /// Replace the active sensor profile. Takes effect on the next operation.
    pub fn set_profile(&mut self, profile: SensorProfile) {
        self.profile = profile;
    }

    /// Cathode level that marks a completed discharge.
    pub fn polarity(&self) -> DischargePolarity {
        self.polarity
    }

    /// Set the cathode level that marks a completed discharge.
    pub fn set_polarity(&mut self, polarity: DischargePolarity) {
        self.polarity = polarity;
    }

    /// Release the pins and clock.
    pub fn release(self) -> (A, C, K) {
        (self.anode, self.cathode, self.clock)
    }

    // ========================================================================
    // Drive state machine
    // ========================================================================

    /// Reconfigure the pins for `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`TransceiverError::Pin`] if a pin rejects the change; the
    /// stored mode then keeps its previous value.
    pub fn set_mode(&mut self, mode: DriveMode) -> Result<(), TransceiverError<E>> {
        self.commit(mode).map_err(TransceiverError::Pin)
    }

    /// Reconfigure the pins from a numeric mode code (see [`DriveMode::code`]).
    ///
    /// # Errors
    ///
    /// Returns [`TransceiverError::InvalidMode`] without touching the pins if
    /// the code is unknown, or [`TransceiverError::Pin`] as for
    /// [`set_mode`](Self::set_mode).
    pub fn set_mode_raw(&mut self, code: u8) -> Result<(), TransceiverError<E>> {
        let mode =
            DriveMode::from_code(code).ok_or(TransceiverError::InvalidMode { requested: code })?;
        self.set_mode(mode)
    }

    /// Light the diode (`true`) or reverse-bias it (`false`).
    ///
    /// # Errors
    ///
    /// As for [`set_mode`](Self::set_mode).
    pub fn set_on(&mut self, on: bool) -> Result<(), TransceiverError<E>> {
        self.set_mode(DriveMode::from_on(on))
    }

    /// Apply `mode` to the pins and record it once every step succeeded.
    ///
    /// The anode is always switched first: from either biased state that
    /// passes through "both pins equal", so no reverse pulse of current flows.
    fn commit(&mut self, mode: DriveMode) -> Result<(), E> {
        match mode {
            DriveMode::Emit => {
                self.anode.drive(PinState::High)?;
                self.cathode.drive(PinState::Low)?;
            }
            DriveMode::ReverseBias => {
                self.anode.drive(PinState::Low)?;
                self.cathode.drive(PinState::High)?;
            }
            DriveMode::Discharge => {
                self.anode.drive(PinState::Low)?;
                self.cathode.set_direction(Direction::Input)?;
            }
        }
        trace!("ledlink: {} -> {}", self.mode, mode);
        self.mode = mode;
        Ok(())
    }

    // ========================================================================
    // Receive
    // ========================================================================

    /// Take one light reading with the active profile.
    ///
    /// Returns the microseconds the junction took to discharge, in
    /// `0..=sample_us`; `sample_us` itself means no discharge inside the
    /// window. Shorter means brighter. The call always lasts the full
    /// `charge_us + sample_us`, so consecutive readings keep a fixed cadence.
    ///
    /// # Errors
    ///
    /// Only [`TransceiverError::Pin`] from the underlying GPIO.
    pub fn read(&mut self) -> Result<u32, TransceiverError<E>> {
        let SensorProfile { charge_us, sample_us, .. } = self.profile;

        self.set_mode(DriveMode::ReverseBias)?;
        busy_wait(&mut self.clock, charge_us);
        self.set_mode(DriveMode::Discharge)?;

        let mut window = Timer::start(&mut self.clock);
        let reading = loop {
            let is_high = self.cathode.is_high().map_err(TransceiverError::Pin)?;
            let elapsed = window.elapsed(&mut self.clock);
            if elapsed >= sample_us {
                break sample_us;
            }
            if self.polarity.is_discharged(is_high) {
                break elapsed;
            }
        };
        window.wait_until(&mut self.clock, sample_us);

        debug!("ledlink: reading {}us of {}us", reading, sample_us);
        Ok(reading)
    }

    /// Fill `readings` with back-to-back readings.
    ///
    /// # Errors
    ///
    /// As for [`read`](Self::read); readings taken before the error are kept.
    pub fn read_into(&mut self, readings: &mut [u32]) -> Result<(), TransceiverError<E>> {
        for slot in readings.iter_mut() {
            *slot = self.read()?;
        }
        Ok(())
    }

    // ========================================================================
    // Transmit
    // ========================================================================

    /// Send a single bit as one period slot.
    ///
    /// # Errors
    ///
    /// Returns [`TransceiverError::Pin`] if a mode transition fails.
    pub fn send_bit(&mut self, bit: bool) -> Result<(), TransceiverError<E>> {
        let mut slot = Timer::start(&mut self.clock);
        self.pulse(&mut slot, bit).map_err(TransceiverError::Pin)
    }

    /// Send a byte, least-significant bit first, in eight period slots.
    ///
    /// # Errors
    ///
    /// Returns [`TransceiverError::TransmissionAborted`] with `byte_index` 0
    /// at the first bit whose transition fails. Earlier bits stay sent.
    pub fn send_byte(&mut self, byte: u8) -> Result<(), TransceiverError<E>> {
        let mut slot = Timer::start(&mut self.clock);
        self.send_byte_in(&mut slot, byte, 0)
    }

    /// Send bytes back to back with no gap between them.
    ///
    /// An empty slice touches nothing and succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`TransceiverError::TransmissionAborted`] for the first byte
    /// that fails; later bytes are not attempted and nothing is rolled back.
    pub fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), TransceiverError<E>> {
        if bytes.is_empty() {
            return Ok(());
        }
        debug!("ledlink: sending {} bytes", bytes.len());

        let mut slot = Timer::start(&mut self.clock);
        for (byte_index, &byte) in bytes.iter().enumerate() {
            self.send_byte_in(&mut slot, byte, byte_index)?;
        }
        Ok(())
    }

    /// Send the UTF-8 bytes of `text`.
    ///
    /// # Errors
    ///
    /// As for [`send_bytes`](Self::send_bytes).
    pub fn send_str(&mut self, text: &str) -> Result<(), TransceiverError<E>> {
        self.send_bytes(text.as_bytes())
    }

    fn send_byte_in(
        &mut self,
        slot: &mut Timer,
        byte: u8,
        byte_index: usize,
    ) -> Result<(), TransceiverError<E>> {
        for bit_index in 0..8u8 {
            let bit = (byte >> bit_index) & 1 == 1;
            self.pulse(slot, bit).map_err(|source| TransceiverError::TransmissionAborted {
                byte_index,
                bit_index,
                source,
            })?;
        }
        Ok(())
    }

    /// Emit one bit in the slot starting at `slot`, then move `slot` to the
    /// start of the next period.
    ///
    /// Deadlines are measured from the slot start rather than from each
    /// transition, so switching overhead does not stretch the period.
    fn pulse(&mut self, slot: &mut Timer, bit: bool) -> Result<(), E> {
        let width = self.profile.bit_width(bit);
        let period = self.profile.period_us.max(width);

        self.commit(DriveMode::Emit)?;
        slot.wait_until(&mut self.clock, width);
        self.commit(DriveMode::ReverseBias)?;
        if period > width {
            slot.wait_until(&mut self.clock, period);
        }
        slot.rebase(period);
        Ok(())
    }
}
