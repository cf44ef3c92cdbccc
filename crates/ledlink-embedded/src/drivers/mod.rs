//! Hardware drivers
//!
//! - [`transceiver`]: the two-pin LED transceiver

pub mod transceiver;

#[cfg(test)]
pub(crate) mod bench;
