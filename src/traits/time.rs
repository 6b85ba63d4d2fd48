//! Time abstraction for platform-agnostic timing operations.
//!
//! All timers in this crate (spool-up ramps, excitation phase, servo test
//! sweeps) are derived from a single injected [`TimeSource`] rather than a
//! hardware clock, so timing-dependent behavior can be tested on the host
//! with controllable time.

use core::cell::Cell;

/// Platform-agnostic time source for the control loop.
///
/// Implementations wrap whatever monotonic clock the platform provides.
/// [`MockTime`] is the host-test implementation with controllable time.
///
/// # Example
///
/// ```
/// use heli_motors::traits::{MockTime, TimeSource};
///
/// fn ramp_fraction<T: TimeSource>(time: &T, start_us: u64, ramp_time_us: u64) -> f32 {
///     let elapsed = time.elapsed_since(start_us);
///     (elapsed as f32 / ramp_time_us as f32).min(1.0)
/// }
///
/// let time = MockTime::new();
/// time.advance(500_000);
/// assert_eq!(ramp_fraction(&time, 0, 1_000_000), 0.5);
/// ```
pub trait TimeSource {
    /// Returns current time in milliseconds since system start.
    fn now_ms(&self) -> u64;

    /// Returns current time in microseconds since system start.
    fn now_us(&self) -> u64;

    /// Returns elapsed time in microseconds since a reference point.
    ///
    /// Uses saturating subtraction so a reference taken "in the future"
    /// (clock rollover, re-initialization) reads as zero rather than
    /// wrapping.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

/// Mock time source for testing with controllable time advancement.
#[derive(Clone, Default)]
pub struct MockTime {
    current_us: Cell<u64>,
}

impl MockTime {
    /// Creates a new `MockTime` starting at time 0.
    pub fn new() -> Self {
        Self {
            current_us: Cell::new(0),
        }
    }

    /// Creates a new `MockTime` starting at the specified time.
    pub fn with_initial(us: u64) -> Self {
        Self {
            current_us: Cell::new(us),
        }
    }

    /// Sets the current time to an absolute value.
    pub fn set(&self, us: u64) {
        self.current_us.set(us);
    }

    /// Advances the current time by the specified amount.
    pub fn advance(&self, us: u64) {
        self.current_us.set(self.current_us.get() + us);
    }
}

impl TimeSource for MockTime {
    fn now_ms(&self) -> u64 {
        self.current_us.get() / 1000
    }

    fn now_us(&self) -> u64 {
        self.current_us.get()
    }
}
