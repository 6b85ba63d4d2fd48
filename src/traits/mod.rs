//! Platform abstraction traits
//!
//! The control core never reads a hardware clock directly. Time is injected
//! through [`TimeSource`] so that ramp timers, excitation phase and the servo
//! test oscillator can be driven deterministically from host tests.

mod time;

pub use time::{MockTime, TimeSource};
