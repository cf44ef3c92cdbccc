//! Simulated diode bench
//!
//! Models an LED junction as a charge reservoir: reverse bias fills it, and
//! once the cathode floats it drains by a fixed dark leakage plus a
//! photocurrent proportional to the light falling on it. The cathode input
//! reads high until the reservoir is empty.
//!
//! Light levels are in arbitrary units; with the constants below a level of
//! 100 drains a full junction in roughly 20 ms.

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, PinState};
use ledlink_core::{
    ByteAssembler, MonotonicClock, SensorProfile, StdClock, ThresholdDecoder, Timer,
    TransceiverError,
};
use ledlink_embedded::{Direction, FlexPin, Transceiver};
use tracing::{debug, warn};

/// Junction charge after reverse bias.
pub const FULL_CHARGE: u64 = 2_000_000;

/// Charge lost per microsecond in complete darkness.
pub const DARK_LEAK: u64 = 1;

/// Light a receiving diode sees while the facing transmitter emits.
pub const LINK_LIGHT: u32 = 8_000;

// ============================================================================
// Clock
// ============================================================================

/// Clock shared between the driver and the simulated pins.
#[derive(Clone, Debug)]
pub enum SimClock {
    /// Virtual microseconds, advanced by one on every read
    Virtual(Rc<Cell<u32>>),
    /// Host wall clock
    Wall(StdClock),
}

impl SimClock {
    /// Virtual clock whose next read returns `start + 1`.
    pub fn virtual_at(start: u32) -> Self {
        Self::Virtual(Rc::new(Cell::new(start)))
    }

    /// Wall clock starting now.
    pub fn wall() -> Self {
        Self::Wall(StdClock::new())
    }

    /// Current time without advancing a virtual clock.
    pub fn peek(&self) -> u32 {
        match self {
            Self::Virtual(now) => now.get(),
            Self::Wall(clock) => {
                let mut clock = *clock;
                clock.now_us()
            }
        }
    }
}

impl MonotonicClock for SimClock {
    fn now_us(&mut self) -> u32 {
        match self {
            Self::Virtual(now) => {
                let next = now.get().wrapping_add(1);
                now.set(next);
                next
            }
            Self::Wall(clock) => clock.now_us(),
        }
    }
}

// ============================================================================
// Light
// ============================================================================

/// Recorded emission of a diode as `(time, lit)` edges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LightTrace {
    edges: Vec<(u32, bool)>,
}

impl LightTrace {
    fn record(&mut self, time: u32, lit: bool) {
        match self.edges.last().copied() {
            // Intermediate configurations inside one transition collapse
            Some((t, _)) if t == time => {
                self.edges.pop();
            }
            Some((_, state)) if state == lit => return,
            _ => {}
        }
        if self.edges.last().map(|edge| edge.1) != Some(lit) {
            self.edges.push((time, lit));
        }
    }

    /// Whether the diode was emitting at `time`.
    pub fn lit_at(&self, time: u32) -> bool {
        let idx = self.edges.partition_point(|(t, _)| *t <= time);
        idx > 0 && self.edges[idx - 1].1
    }

    /// `(start, width)` of every completed emit pulse.
    pub fn pulses(&self) -> Vec<(u32, u32)> {
        self.edges
            .windows(2)
            .filter(|pair| pair[0].1 && !pair[1].1)
            .map(|pair| (pair[0].0, pair[1].0.wrapping_sub(pair[0].0)))
            .collect()
    }
}

/// Light falling on a simulated diode.
#[derive(Clone, Debug)]
pub enum Illumination {
    /// Steady light level
    Constant(u32),
    /// Another diode's recorded emission on top of an ambient level
    Replay {
        /// Emission of the facing diode
        trace: LightTrace,
        /// Background light level
        ambient: u32,
    },
}

impl Illumination {
    fn level_at(&self, time: u32) -> u32 {
        match self {
            Self::Constant(level) => *level,
            Self::Replay { trace, ambient } => {
                if trace.lit_at(time) {
                    ambient.saturating_add(LINK_LIGHT)
                } else {
                    *ambient
                }
            }
        }
    }
}

// ============================================================================
// Diode and pins
// ============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Line {
    Anode,
    Cathode,
}

#[derive(Debug)]
struct Junction {
    anode: (Direction, PinState),
    cathode: (Direction, PinState),
    illumination: Illumination,
    charge: u64,
    last_eval: u32,
    emitted: LightTrace,
}

impl Junction {
    fn line(&mut self, line: Line) -> &mut (Direction, PinState) {
        match line {
            Line::Anode => &mut self.anode,
            Line::Cathode => &mut self.cathode,
        }
    }

    fn is_lit(&self) -> bool {
        self.anode == (Direction::Output, PinState::High)
            && self.cathode == (Direction::Output, PinState::Low)
    }

    fn drain_until(&mut self, now: u32) {
        let steps = now.wrapping_sub(self.last_eval);
        match &self.illumination {
            Illumination::Constant(level) => {
                let loss = u64::from(steps) * (DARK_LEAK + u64::from(*level));
                self.charge = self.charge.saturating_sub(loss);
            }
            Illumination::Replay { .. } => {
                for step in 1..=steps {
                    if self.charge == 0 {
                        break;
                    }
                    let level = self.illumination.level_at(self.last_eval.wrapping_add(step));
                    self.charge = self.charge.saturating_sub(DARK_LEAK + u64::from(level));
                }
            }
        }
        self.last_eval = now;
    }
}

/// A simulated LED wired across two pins.
#[derive(Clone, Debug)]
pub struct SimDiode {
    junction: Rc<RefCell<Junction>>,
    clock: SimClock,
}

impl SimDiode {
    /// Diode with both pins floating, lit by `illumination`.
    pub fn new(clock: SimClock, illumination: Illumination) -> Self {
        let floating = (Direction::Input, PinState::Low);
        Self {
            junction: Rc::new(RefCell::new(Junction {
                anode: floating,
                cathode: floating,
                illumination,
                charge: 0,
                last_eval: clock.peek(),
                emitted: LightTrace::default(),
            })),
            clock,
        }
    }

    /// Pin on the anode side.
    pub fn anode(&self) -> SimPin {
        self.pin(Line::Anode)
    }

    /// Pin on the cathode side.
    pub fn cathode(&self) -> SimPin {
        self.pin(Line::Cathode)
    }

    /// Everything this diode has emitted so far.
    pub fn emitted(&self) -> LightTrace {
        self.junction.borrow().emitted.clone()
    }

    fn pin(&self, line: Line) -> SimPin {
        SimPin {
            junction: Rc::clone(&self.junction),
            clock: self.clock.clone(),
            line,
        }
    }
}

/// One GPIO line of a [`SimDiode`].
#[derive(Debug)]
pub struct SimPin {
    junction: Rc<RefCell<Junction>>,
    clock: SimClock,
    line: Line,
}

impl SimPin {
    fn update(&mut self, apply: impl FnOnce(&mut (Direction, PinState))) {
        let now = self.clock.peek();
        let mut junction = self.junction.borrow_mut();
        let was_floating = junction.cathode.0 == Direction::Input;
        apply(junction.line(self.line));

        if self.line == Line::Cathode && !was_floating && junction.cathode.0 == Direction::Input {
            junction.charge = FULL_CHARGE;
            junction.last_eval = now;
        }
        let lit = junction.is_lit();
        junction.emitted.record(now, lit);
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl FlexPin for SimPin {
    fn set_direction(&mut self, direction: Direction) -> Result<(), Infallible> {
        self.update(|line| line.0 = direction);
        Ok(())
    }

    fn set_level(&mut self, level: PinState) -> Result<(), Infallible> {
        self.update(|line| line.1 = level);
        Ok(())
    }

    fn is_high(&mut self) -> Result<bool, Infallible> {
        let now = self.clock.peek();
        let mut junction = self.junction.borrow_mut();
        let (direction, level) = *junction.line(self.line);
        if self.line == Line::Anode || direction == Direction::Output {
            return Ok(level == PinState::High);
        }
        junction.drain_until(now);
        Ok(junction.charge > 0)
    }
}

// ============================================================================
// Bench runs
// ============================================================================

/// Transceiver wired to a simulated diode.
pub type SimTransceiver = Transceiver<SimPin, SimPin, SimClock>;

/// Driver errors on the bench; the simulated pins cannot fail.
pub type SimError = TransceiverError<Infallible>;

/// Wire a transceiver to `diode`.
pub fn transceiver(diode: &SimDiode, profile: SensorProfile) -> Result<SimTransceiver, SimError> {
    Transceiver::new(diode.anode(), diode.cathode(), diode.clock.clone(), profile)
}

/// Transmit `payload` on a fresh diode and return its emission.
pub fn transmit(profile: SensorProfile, payload: &[u8]) -> Result<LightTrace, SimError> {
    let diode = SimDiode::new(SimClock::virtual_at(0), Illumination::Constant(0));
    let mut led = transceiver(&diode, profile)?;
    led.send_bytes(payload)?;
    Ok(diode.emitted())
}

/// Take `count` readings under a steady light level.
pub fn ambient_readings(
    profile: SensorProfile,
    light: u32,
    count: usize,
    clock: SimClock,
) -> Result<Vec<u32>, SimError> {
    let diode = SimDiode::new(clock, Illumination::Constant(light));
    let mut led = transceiver(&diode, profile)?;
    let mut readings = vec![0; count];
    led.read_into(&mut readings)?;
    Ok(readings)
}

/// Outcome of a simulated transmit/receive pair.
#[derive(Clone, Debug)]
pub struct Loopback {
    /// What the transmitter emitted
    pub sent: LightTrace,
    /// Raw receiver readings, one per bit
    pub readings: Vec<u32>,
    /// Bytes recovered by the decoder
    pub decoded: Vec<u8>,
    /// Readings that fell between the thresholds (decoded as 0)
    pub ambiguous: usize,
}

/// Send `payload` on one diode and read it back on a facing one.
///
/// The receiver starts on the transmitter's first slot boundary and waits
/// for every following boundary before reading again, so each reading covers
/// the start of one bit.
pub fn loopback(
    profile: SensorProfile,
    payload: &[u8],
    ambient: u32,
    decoder: ThresholdDecoder,
) -> Result<Loopback, SimError> {
    let sent = transmit(profile, payload)?;
    let mut result = Loopback {
        sent: sent.clone(),
        readings: Vec::with_capacity(payload.len() * 8),
        decoded: Vec::with_capacity(payload.len()),
        ambiguous: 0,
    };
    let pulses = sent.pulses();
    let Some(&(first_slot, _)) = pulses.first() else {
        return Ok(result);
    };
    if profile.read_duration_us() >= u64::from(profile.period_us) {
        warn!(
            "reading takes {}us but a bit lasts {}us; receiver will drift",
            profile.read_duration_us(),
            profile.period_us
        );
    }

    let mut clock = SimClock::virtual_at(first_slot);
    let diode = SimDiode::new(clock.clone(), Illumination::Replay { trace: sent, ambient });
    let mut rx = transceiver(&diode, profile)?;
    let mut slot = Timer::starting_at(first_slot);
    let mut assembler = ByteAssembler::new();

    for bit_index in 0..payload.len() * 8 {
        let reading = rx.read()?;
        let symbol = decoder.classify(reading);
        debug!(bit_index, reading, ?symbol, "received");

        result.readings.push(reading);
        let bit = symbol.bit().unwrap_or_else(|| {
            result.ambiguous += 1;
            false
        });
        if let Some(byte) = assembler.push(bit) {
            result.decoded.push(byte);
        }

        while !slot.has_elapsed(&mut clock, profile.period_us) {
            std::hint::spin_loop();
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_clock_shared_between_handles() {
        let mut a = SimClock::virtual_at(10);
        let b = a.clone();
        assert_eq!(a.now_us(), 11);
        assert_eq!(b.peek(), 11);
    }

    #[test]
    fn test_light_trace_collapses_transitions() {
        let mut trace = LightTrace::default();
        trace.record(0, false);
        trace.record(5, false);
        trace.record(5, true);
        trace.record(8, true);
        trace.record(12, false);
        assert_eq!(trace.edges, [(0, false), (5, true), (12, false)]);
        assert!(!trace.lit_at(4));
        assert!(trace.lit_at(5));
        assert!(trace.lit_at(11));
        assert!(!trace.lit_at(12));
        assert_eq!(trace.pulses(), [(5, 7)]);
    }

    #[test]
    fn test_transmit_records_pulse_widths() {
        let profile = SensorProfile::COMMS;
        let trace = transmit(profile, &[0x0F]).unwrap();
        let widths: Vec<u32> = trace.pulses().iter().map(|(_, w)| *w).collect();
        assert_eq!(widths, [750, 750, 750, 750, 250, 250, 250, 250]);
    }

    #[test]
    fn test_brighter_light_reads_shorter() {
        let profile = SensorProfile::LIGHT;
        let dim = ambient_readings(profile, 50, 1, SimClock::virtual_at(0)).unwrap()[0];
        let bright = ambient_readings(profile, 500, 1, SimClock::virtual_at(0)).unwrap()[0];
        assert!(bright < dim, "bright {bright} should be shorter than dim {dim}");
    }

    #[test]
    fn test_darkness_reads_full_window() {
        let profile = SensorProfile::LIGHT;
        let readings = ambient_readings(profile, 0, 3, SimClock::virtual_at(0)).unwrap();
        assert_eq!(readings, [profile.sample_us; 3]);
    }

    #[test]
    fn test_loopback_recovers_text() {
        let profile = SensorProfile::COMMS;
        let decoder = ThresholdDecoder::for_profile(&profile);
        let result = loopback(profile, b"Hi!", 20, decoder).unwrap();
        assert_eq!(result.decoded, b"Hi!");
        assert_eq!(result.readings.len(), 24);
        assert_eq!(result.ambiguous, 0);
    }

    #[test]
    fn test_saturated_ambient_reads_every_bit_bright() {
        let profile = SensorProfile::COMMS;
        let decoder = ThresholdDecoder::for_profile(&profile);
        let result = loopback(profile, b"A", u32::MAX, decoder).unwrap();
        assert!(result.readings.iter().all(|r| *r <= decoder.bright_max_us));
        assert_eq!(result.decoded, [0xFF]);
    }

    #[test]
    fn test_replay_level_saturates() {
        let mut trace = LightTrace::default();
        trace.record(0, true);
        trace.record(10, false);
        let light = Illumination::Replay { trace, ambient: u32::MAX - 1 };
        assert_eq!(light.level_at(5), u32::MAX);
        assert_eq!(light.level_at(10), u32::MAX - 1);
    }

    #[test]
    fn test_loopback_empty_payload() {
        let profile = SensorProfile::COMMS;
        let result = loopback(profile, &[], 0, ThresholdDecoder::for_profile(&profile)).unwrap();
        assert!(result.decoded.is_empty());
        assert!(result.readings.is_empty());
    }
}
