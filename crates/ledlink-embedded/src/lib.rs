//! Ledlink Embedded - single-LED optical transceiver driver
//!
//! Drives an ordinary LED across two GPIO pins so that it can both send and
//! sense light:
//! - Emit, reverse-bias and discharge pin configurations
//! - Timed discharge readings for ambient light and received bits
//! - Fixed-period pulse-width transmission of bits, bytes and strings
//!
//! # Wiring
//!
//! ```text
//! Anode pin ---- (+) LED (-) ---- 1kΩ ---- Cathode pin
//! ```
//!
//! The cathode pin must be able to switch between push-pull output and
//! floating input at runtime (a "flex" pin on most HALs).
//!
//! # Timing
//!
//! Every operation busy-waits on the calling thread for its full duration,
//! so keep interrupts short while a transfer is running.

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
mod fmt;

pub mod drivers;
pub mod pin;

// Re-export driver types
pub use drivers::transceiver::Transceiver;
pub use pin::{Direction, FlexPin};

// Re-export core types used in the driver API
pub use ledlink_core::{
    DischargePolarity, DriveMode, MonotonicClock, SensorProfile, TransceiverError,
};
