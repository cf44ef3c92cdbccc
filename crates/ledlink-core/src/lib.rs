//! Ledlink Core - `no_std` types and timing for single-LED optical links
//!
//! An ordinary LED wired across two GPIO pins can emit light, and with its
//! junction reverse-biased and left floating it also behaves as a slow
//! photodiode. This crate holds everything about that scheme that does not
//! touch hardware:
//!
//! - [`types`]: drive modes and discharge polarity
//! - [`profile`]: the five timing constants selecting comms vs. ambient behavior
//! - [`timer`]: wraparound-safe microsecond timer over an injected clock
//! - [`error`]: error types for the driver and for profile configuration
//! - [`decode`]: optional consumer-side helpers for interpreting raw readings
//!
//! # Features
//!
//! - `std`: Enable standard library support (`StdClock`, `std::error::Error`)
//! - `defmt`: Enable `defmt` formatting for embedded logging
//!
//! # Example
//!
//! ```rust
//! use ledlink_core::profile::SensorProfile;
//! use ledlink_core::types::DriveMode;
//!
//! let profile = SensorProfile::COMMS;
//! assert_eq!(profile.bit_width(true), profile.mark_us);
//! assert_eq!(DriveMode::try_from(0u8), Ok(DriveMode::Emit));
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod decode;
pub mod error;
pub mod profile;
pub mod timer;
pub mod types;

// Re-export commonly used types at crate root
pub use decode::{AmbientEstimator, ByteAssembler, Symbol, ThresholdDecoder};
pub use error::{ProfileError, TransceiverError};
pub use profile::SensorProfile;
pub use timer::{busy_wait, MonotonicClock, Timer};
pub use types::{DischargePolarity, DriveMode};

#[cfg(feature = "std")]
pub use timer::StdClock;
