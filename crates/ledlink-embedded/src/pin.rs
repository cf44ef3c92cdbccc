//! Pin capability used by the transceiver
//!
//! `embedded-hal` splits GPIO into separate input and output traits, but the
//! cathode side of the LED has to change direction on every reading. HALs
//! expose that as a "flex" or "dynamic" pin; implement [`FlexPin`] for it (a
//! few lines forwarding to the HAL) and hand it to the driver.

use embedded_hal::digital::{ErrorType, PinState};

/// Direction of a GPIO line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// High-impedance input
    Input,
    /// Push-pull output
    Output,
}

/// A GPIO line that can switch direction at runtime.
pub trait FlexPin: ErrorType {
    /// Switch the line between input and output.
    ///
    /// # Errors
    ///
    /// Returns the HAL error if the line cannot be reconfigured.
    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error>;

    /// Drive the output level. Only meaningful while the line is an output.
    ///
    /// # Errors
    ///
    /// Returns the HAL error if the level cannot be set.
    fn set_level(&mut self, level: PinState) -> Result<(), Self::Error>;

    /// Sample the input level.
    ///
    /// # Errors
    ///
    /// Returns the HAL error if the line cannot be read.
    fn is_high(&mut self) -> Result<bool, Self::Error>;

    /// Make the line an output and drive `level`.
    ///
    /// # Errors
    ///
    /// Returns the first HAL error encountered.
    fn drive(&mut self, level: PinState) -> Result<(), Self::Error> {
        self.set_direction(Direction::Output)?;
        self.set_level(level)
    }
}

impl<T: FlexPin + ?Sized> FlexPin for &mut T {
    #[inline]
    fn set_direction(&mut self, direction: Direction) -> Result<(), Self::Error> {
        T::set_direction(self, direction)
    }

    #[inline]
    fn set_level(&mut self, level: PinState) -> Result<(), Self::Error> {
        T::set_level(self, level)
    }

    #[inline]
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        T::is_high(self)
    }
}
