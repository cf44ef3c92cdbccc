//! Simulated test bench: a virtual microsecond clock and two recording pins
//! sharing one state, with a configurable discharge time and failure
//! injection.

use core::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::{Error, ErrorKind, ErrorType, PinState};
use ledlink_core::{DischargePolarity, DriveMode, MonotonicClock};

use crate::pin::{Direction, FlexPin};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct SimError;

impl Error for SimError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct PinSim {
    pub direction: Direction,
    pub level: PinState,
}

/// Pin configuration recorded after a pin operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub time: u32,
    pub anode: PinSim,
    pub cathode: PinSim,
}

impl Snapshot {
    /// The drive mode this configuration corresponds to, if any.
    pub fn mode(&self) -> Option<DriveMode> {
        use Direction::{Input, Output};
        use PinState::{High, Low};
        match (self.anode.direction, self.anode.level, self.cathode.direction, self.cathode.level) {
            (Output, High, Output, Low) => Some(DriveMode::Emit),
            (Output, Low, Output, High) => Some(DriveMode::ReverseBias),
            (Output, Low, Input, _) => Some(DriveMode::Discharge),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Line {
    Anode,
    Cathode,
}

struct State {
    now: u32,
    anode: PinSim,
    cathode: PinSim,
    ops: usize,
    history: Vec<Snapshot>,
    discharge_after: Option<u32>,
    polarity: DischargePolarity,
    input_since: u32,
    anode_highs: usize,
    fail_anode_high_at: Option<usize>,
    fail_op_at: Option<usize>,
}

impl State {
    fn pin(&mut self, line: Line) -> &mut PinSim {
        match line {
            Line::Anode => &mut self.anode,
            Line::Cathode => &mut self.cathode,
        }
    }

    fn record(&mut self) {
        self.history.push(Snapshot {
            time: self.now,
            anode: self.anode,
            cathode: self.cathode,
        });
    }

    fn begin_op(&mut self) -> Result<(), SimError> {
        self.ops += 1;
        if self.fail_op_at == Some(self.ops) {
            return Err(SimError);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub(crate) struct Bench {
    state: Rc<RefCell<State>>,
}

impl Bench {
    /// Bench starting at `now` with both pins floating inputs.
    pub fn new(now: u32) -> Self {
        let floating = PinSim {
            direction: Direction::Input,
            level: PinState::Low,
        };
        Self {
            state: Rc::new(RefCell::new(State {
                now,
                anode: floating,
                cathode: floating,
                ops: 0,
                history: Vec::new(),
                discharge_after: None,
                polarity: DischargePolarity::FallsLow,
                input_since: now,
                anode_highs: 0,
                fail_anode_high_at: None,
                fail_op_at: None,
            })),
        }
    }

    pub fn anode(&self) -> SimPin {
        SimPin { state: Rc::clone(&self.state), line: Line::Anode }
    }

    pub fn cathode(&self) -> SimPin {
        SimPin { state: Rc::clone(&self.state), line: Line::Cathode }
    }

    pub fn clock(&self) -> SimClock {
        SimClock { state: Rc::clone(&self.state) }
    }

    /// Last value returned by the clock.
    pub fn now(&self) -> u32 {
        self.state.borrow().now
    }

    /// Cathode input reaches its discharged level `after_us` after becoming an input.
    /// `None` means it never discharges.
    pub fn set_discharge_after(&self, after_us: Option<u32>) {
        self.state.borrow_mut().discharge_after = after_us;
    }

    pub fn set_polarity(&self, polarity: DischargePolarity) {
        self.state.borrow_mut().polarity = polarity;
    }

    /// Fail the `n`th time (1-based, counted from now) the anode is driven high.
    pub fn fail_on_anode_high(&self, n: usize) {
        let mut s = self.state.borrow_mut();
        s.anode_highs = 0;
        s.fail_anode_high_at = Some(n);
    }

    /// Fail the `n`th pin operation (1-based, counted from now).
    pub fn fail_on_op(&self, n: usize) {
        let mut s = self.state.borrow_mut();
        s.fail_op_at = Some(s.ops + n);
    }

    pub fn ops(&self) -> usize {
        self.state.borrow().ops
    }

    pub fn pins(&self) -> (PinSim, PinSim) {
        let s = self.state.borrow();
        (s.anode, s.cathode)
    }

    pub fn clear_history(&self) {
        self.state.borrow_mut().history.clear();
    }

    /// Mode transitions as `(time, mode)`, keeping only the final
    /// configuration at each instant and dropping repeats.
    pub fn mode_trace(&self) -> Vec<(u32, Option<DriveMode>)> {
        let s = self.state.borrow();
        let mut settled: Vec<Snapshot> = Vec::new();
        for snap in &s.history {
            match settled.last_mut() {
                Some(last) if last.time == snap.time => *last = *snap,
                _ => settled.push(*snap),
            }
        }
        let mut trace: Vec<(u32, Option<DriveMode>)> = Vec::new();
        for snap in settled {
            let mode = snap.mode();
            if trace.last().map(|(_, m)| *m) != Some(mode) {
                trace.push((snap.time, mode));
            }
        }
        trace
    }

    /// `(start, width)` of every emit pulse in the history.
    pub fn emit_pulses(&self) -> Vec<(u32, u32)> {
        let trace = self.mode_trace();
        let mut pulses = Vec::new();
        for (i, (start, mode)) in trace.iter().enumerate() {
            if *mode == Some(DriveMode::Emit) {
                let end = trace.get(i + 1).map_or(self.now(), |(t, _)| *t);
                pulses.push((*start, end.wrapping_sub(*start)));
            }
        }
        pulses
    }
}

pub(crate) struct SimClock {
    state: Rc<RefCell<State>>,
}

impl MonotonicClock for SimClock {
    /// Each read advances virtual time by one microsecond.
    fn now_us(&mut self) -> u32 {
        let mut s = self.state.borrow_mut();
        s.now = s.now.wrapping_add(1);
        s.now
    }
}

pub(crate) struct SimPin {
    state: Rc<RefCell<State>>,
    line: Line,
}

impl ErrorType for SimPin {
    type Error = SimError;
}

impl FlexPin for SimPin {
    fn set_direction(&mut self, direction: Direction) -> Result<(), SimError> {
        let mut s = self.state.borrow_mut();
        s.begin_op()?;
        let now = s.now;
        let pin = s.pin(self.line);
        let became_input = pin.direction != Direction::Input && direction == Direction::Input;
        pin.direction = direction;
        if self.line == Line::Cathode && became_input {
            s.input_since = now;
        }
        s.record();
        Ok(())
    }

    fn set_level(&mut self, level: PinState) -> Result<(), SimError> {
        let mut s = self.state.borrow_mut();
        s.begin_op()?;
        if self.line == Line::Anode && level == PinState::High {
            s.anode_highs += 1;
            if s.fail_anode_high_at == Some(s.anode_highs) {
                return Err(SimError);
            }
        }
        s.pin(self.line).level = level;
        s.record();
        Ok(())
    }

    fn is_high(&mut self) -> Result<bool, SimError> {
        let mut s = self.state.borrow_mut();
        s.begin_op()?;
        let pin = *s.pin(self.line);
        if pin.direction == Direction::Output {
            return Ok(pin.level == PinState::High);
        }
        let discharged = s
            .discharge_after
            .is_some_and(|after| s.now.wrapping_sub(s.input_since) >= after);
        Ok(match s.polarity {
            DischargePolarity::FallsLow => !discharged,
            DischargePolarity::RisesHigh => discharged,
        })
    }
}
