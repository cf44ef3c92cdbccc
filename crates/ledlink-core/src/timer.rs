//! Wraparound-safe microsecond timing
//!
//! Every timed operation in the driver reads a free-running microsecond
//! counter through [`MonotonicClock`]. The counter is 32 bits wide and wraps
//! after about 71 minutes; all differences use wrapping subtraction, so a
//! single measured interval is correct as long as it is shorter than the
//! wrap period.

/// Free-running microsecond counter.
pub trait MonotonicClock {
    /// Current counter value in microseconds. May wrap around.
    fn now_us(&mut self) -> u32;
}

impl<T: MonotonicClock + ?Sized> MonotonicClock for &mut T {
    #[inline]
    fn now_us(&mut self) -> u32 {
        (**self).now_us()
    }
}

/// Snapshot timer for a single timed operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timer {
    start: u32,
    prev: u32,
    current: u32,
}

impl Timer {
    /// Start a timer at the clock's current time.
    pub fn start<C: MonotonicClock + ?Sized>(clock: &mut C) -> Self {
        Self::starting_at(clock.now_us())
    }

    /// Start a timer at an explicit counter value.
    #[must_use]
    pub const fn starting_at(now: u32) -> Self {
        Self {
            start: now,
            prev: now,
            current: now,
        }
    }

    /// Counter value captured when the timer started.
    #[must_use]
    pub const fn start_us(&self) -> u32 {
        self.start
    }

    /// Sample the clock and return microseconds since start.
    pub fn elapsed<C: MonotonicClock + ?Sized>(&mut self, clock: &mut C) -> u32 {
        self.current = clock.now_us();
        self.current.wrapping_sub(self.start)
    }

    /// Microseconds between start and the most recent sample, without reading the clock.
    #[must_use]
    pub const fn last_elapsed(&self) -> u32 {
        self.current.wrapping_sub(self.start)
    }

    /// Whether `interval_us` has passed since the previous window boundary.
    ///
    /// The boundary only moves forward when this returns `true`, so repeated
    /// polling measures successive, non-overlapping windows.
    pub fn has_elapsed<C: MonotonicClock + ?Sized>(
        &mut self,
        clock: &mut C,
        interval_us: u32,
    ) -> bool {
        self.current = clock.now_us();
        if self.current.wrapping_sub(self.prev) >= interval_us {
            self.prev = self.current;
            true
        } else {
            false
        }
    }

    /// Move the start forward by `offset_us`, typically to the next period
    /// boundary, so later deadlines stay relative to a fixed schedule.
    pub fn rebase(&mut self, offset_us: u32) {
        self.start = self.start.wrapping_add(offset_us);
        self.prev = self.start;
    }

    /// Spin until at least `offset_us` has passed since start.
    pub fn wait_until<C: MonotonicClock + ?Sized>(&mut self, clock: &mut C, offset_us: u32) {
        while self.elapsed(clock) < offset_us {
            core::hint::spin_loop();
        }
    }
}

/// Spin on the clock for `duration_us` microseconds.
pub fn busy_wait<C: MonotonicClock + ?Sized>(clock: &mut C, duration_us: u32) {
    if duration_us == 0 {
        return;
    }
    let mut timer = Timer::start(clock);
    timer.wait_until(clock, duration_us);
}

// ============================================================================
// Host clock
// ============================================================================

/// Wall clock backed by [`std::time::Instant`], truncated to a wrapping `u32`.
#[cfg(feature = "std")]
#[derive(Copy, Clone, Debug)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Create a clock counting from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl MonotonicClock for StdClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now_us(&mut self) -> u32 {
        self.origin.elapsed().as_micros() as u32
    }
}
