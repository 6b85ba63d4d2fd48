//! Servo test harness
//!
//! Out-of-flight sweep of the swashplate and tail outputs through a fixed
//! cyclic pattern, independent of flight inputs. Used for linkage setup and
//! pre-flight actuator checks.
//!
//! The sweep is mutually exclusive with normal mixing and can only be
//! entered while the rotor is shut down or at ground idle; moving the
//! swashplate through its full range with the rotor at speed would be a
//! control upset.

use crate::mixer::ControlDemand;
use core::f32::consts::TAU;
use libm::{cosf, sinf};

/// Test cycle time bounds, seconds
const MIN_CYCLE_TIME: f32 = 1.0;
const MAX_CYCLE_TIME: f32 = 60.0;

/// Default test cycle time, seconds
const DEFAULT_CYCLE_TIME: f32 = 6.0;

/// Errors from test harness entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestModeError {
    /// The rotor is not shut down or idling
    RotorNotStopped,
}

impl core::fmt::Display for TestModeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TestModeError::RotorNotStopped => {
                write!(f, "servo test refused: rotor is not stopped")
            }
        }
    }
}

/// Cyclic servo sweep generator
///
/// One cycle sweeps collective, then cyclic, then yaw, each through a full
/// oscillation. The cycle repeats until stopped.
#[derive(Debug, Clone)]
pub struct ServoTest {
    cycle_time_s: f32,
    elapsed_s: f32,
    active: bool,
}

impl Default for ServoTest {
    fn default() -> Self {
        Self::new(DEFAULT_CYCLE_TIME)
    }
}

impl ServoTest {
    pub fn new(cycle_time_s: f32) -> Self {
        Self {
            cycle_time_s: cycle_time_s.clamp(MIN_CYCLE_TIME, MAX_CYCLE_TIME),
            elapsed_s: 0.0,
            active: false,
        }
    }

    /// Enter the sweep.
    ///
    /// # Errors
    ///
    /// Refused with [`TestModeError::RotorNotStopped`] unless the caller
    /// confirms the rotor is shut down or idling.
    pub fn start(&mut self, rotor_stopped: bool) -> Result<(), TestModeError> {
        if !rotor_stopped {
            crate::log_warn!("servo test refused while rotor is turning");
            return Err(TestModeError::RotorNotStopped);
        }
        crate::log_info!("servo test started");
        self.elapsed_s = 0.0;
        self.active = true;
        Ok(())
    }

    /// Leave the sweep; the next tick mixes flight inputs again
    pub fn stop(&mut self) {
        if self.active {
            crate::log_info!("servo test stopped");
        }
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance the sweep and produce this tick's synthetic demand.
    ///
    /// Returns `None` while inactive, letting the caller fall through to
    /// normal mixing.
    pub fn update(&mut self, dt_s: f32) -> Option<ControlDemand> {
        if !self.active {
            return None;
        }

        self.elapsed_s = (self.elapsed_s + dt_s.max(0.0)) % self.cycle_time_s;
        let phase = self.elapsed_s / self.cycle_time_s;

        // Each third of the cycle runs one full oscillation on its axis
        let segment_angle = TAU * ((phase * 3.0) % 1.0);

        let mut demand = ControlDemand {
            collective: 0.5,
            ..ControlDemand::default()
        };

        if phase < 1.0 / 3.0 {
            demand.collective = 0.5 + 0.5 * sinf(segment_angle);
        } else if phase < 2.0 / 3.0 {
            demand.roll = 0.5 * sinf(segment_angle);
            demand.pitch = 0.5 * cosf(segment_angle);
        } else {
            demand.yaw = 0.5 * sinf(segment_angle);
        }

        Some(demand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_refused_while_rotor_turning() {
        let mut test = ServoTest::default();
        assert_eq!(test.start(false), Err(TestModeError::RotorNotStopped));
        assert!(!test.is_active());
    }

    #[test]
    fn entry_allowed_when_stopped() {
        let mut test = ServoTest::default();
        assert!(test.start(true).is_ok());
        assert!(test.is_active());
    }

    #[test]
    fn inactive_harness_produces_nothing() {
        let mut test = ServoTest::default();
        assert!(test.update(0.02).is_none());
    }

    #[test]
    fn sweep_stays_within_demand_ranges() {
        let mut test = ServoTest::new(6.0);
        test.start(true).unwrap();

        // Two full cycles at 50 Hz
        for _ in 0..600 {
            let demand = test.update(0.02).unwrap();
            assert!((-1.0..=1.0).contains(&demand.roll));
            assert!((-1.0..=1.0).contains(&demand.pitch));
            assert!((0.0..=1.0).contains(&demand.collective));
            assert!((-1.0..=1.0).contains(&demand.yaw));
        }
    }

    #[test]
    fn phases_drive_one_axis_at_a_time() {
        let mut test = ServoTest::new(6.0);
        test.start(true).unwrap();

        // Quarter into the collective segment: collective at max, the
        // other axes quiet
        let demand = test.update(0.5).unwrap();
        assert!((demand.collective - 1.0).abs() < 1e-3);
        assert_eq!(demand.roll, 0.0);
        assert_eq!(demand.yaw, 0.0);

        // Into the cyclic segment
        let mut test = ServoTest::new(6.0);
        test.start(true).unwrap();
        let demand = test.update(2.5).unwrap();
        assert!(demand.roll.abs() > 0.0 || demand.pitch.abs() > 0.0);
        assert!((demand.collective - 0.5).abs() < 1e-6);

        // Into the yaw segment, a quarter oscillation in
        let mut test = ServoTest::new(6.0);
        test.start(true).unwrap();
        let demand = test.update(4.5).unwrap();
        assert!((demand.yaw - 0.5).abs() < 1e-3);
        assert_eq!(demand.roll, 0.0);
    }

    #[test]
    fn sweep_wraps_at_cycle_end() {
        let mut test = ServoTest::new(2.0);
        test.start(true).unwrap();

        let first = test.update(0.25).unwrap();
        // One full cycle later the pattern repeats
        let wrapped = test.update(2.0).unwrap();
        assert!((first.collective - wrapped.collective).abs() < 1e-4);
    }

    #[test]
    fn stop_returns_to_normal_mixing() {
        let mut test = ServoTest::default();
        test.start(true).unwrap();
        assert!(test.update(0.02).is_some());

        test.stop();
        assert!(test.update(0.02).is_none());
    }

    #[test]
    fn cycle_time_clamped() {
        let test = ServoTest::new(0.0);
        assert_eq!(test.cycle_time_s, MIN_CYCLE_TIME);
        let test = ServoTest::new(500.0);
        assert_eq!(test.cycle_time_s, MAX_CYCLE_TIME);
    }
}
