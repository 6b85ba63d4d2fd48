//! Slow-start ramp
//!
//! Bounded-rate startup sequence protecting the drive train: a time-based
//! ramp fraction that grows from 0 to 1 over the configured ramp time, plus
//! a per-tick slew limit that bounds how far the throttle command may move
//! in a single tick. Identical-looking commands issued too fast are what
//! cause ESC current spikes; the slew limit caps them regardless of where
//! the ramp fraction is.
//!
//! Once the ramp time has elapsed the fraction pins at 1.0 and the ramp is
//! inert. The only thing that rewinds it is [`SlowStart::reset`], called by
//! the sequencer on re-entry into shut-down.

/// Slew amplitude bounds, fraction of full range per tick
const MIN_AMPLITUDE: f32 = 0.001;
const MAX_AMPLITUDE: f32 = 0.5;

/// Ramp time bounds, seconds
const MIN_RAMP_TIME: f32 = 0.5;
const MAX_RAMP_TIME: f32 = 60.0;

/// Slow-start ramp state
#[derive(Debug, Clone)]
pub struct SlowStart {
    /// Maximum output change per tick, fraction of full range
    amplitude: f32,
    /// Time from 0 to full ramp fraction, seconds
    ramp_time_s: f32,
    /// Ramp start timestamp; `None` until the first spool-up
    started_us: Option<u64>,
    /// Output emitted last tick, the slew reference
    last_output: f32,
}

impl SlowStart {
    pub fn new(amplitude: f32, ramp_time_s: f32) -> Self {
        Self {
            amplitude: amplitude.clamp(MIN_AMPLITUDE, MAX_AMPLITUDE),
            ramp_time_s: ramp_time_s.clamp(MIN_RAMP_TIME, MAX_RAMP_TIME),
            started_us: None,
            last_output: 0.0,
        }
    }

    /// Update amplitude and ramp time from configuration.
    ///
    /// Re-primes the parameters only; a ramp in progress keeps its start
    /// time and is never rewound by a configuration reload.
    pub fn configure(&mut self, amplitude: f32, ramp_time_s: f32) {
        self.amplitude = amplitude.clamp(MIN_AMPLITUDE, MAX_AMPLITUDE);
        self.ramp_time_s = ramp_time_s.clamp(MIN_RAMP_TIME, MAX_RAMP_TIME);
    }

    /// Start the ramp. No-op if the ramp is already running; a restart
    /// requires [`SlowStart::reset`] first.
    pub fn begin(&mut self, now_us: u64) {
        if self.started_us.is_none() {
            self.started_us = Some(now_us);
        }
    }

    /// Ramp fraction in [0,1]; 0 before the ramp has started
    pub fn fraction(&self, now_us: u64) -> f32 {
        match self.started_us {
            None => 0.0,
            Some(start) => {
                let elapsed_s = now_us.saturating_sub(start) as f32 / 1_000_000.0;
                (elapsed_s / self.ramp_time_s).min(1.0)
            }
        }
    }

    /// True once the ramp fraction has pinned at 1.0
    pub fn is_complete(&self, now_us: u64) -> bool {
        self.fraction(now_us) >= 1.0
    }

    /// Slew-limit `target` against last tick's output and record the result
    pub fn constrain(&mut self, target: f32) -> f32 {
        let step = (target - self.last_output).clamp(-self.amplitude, self.amplitude);
        self.last_output += step;
        self.last_output
    }

    /// Record an output without limiting it (states where the slew guard
    /// does not apply), keeping the slew reference continuous
    pub fn track(&mut self, value: f32) -> f32 {
        self.last_output = value;
        value
    }

    /// Output emitted last tick
    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    /// Rewind the ramp to unstarted and zero the slew reference
    pub fn reset(&mut self) {
        self.started_us = None;
        self.last_output = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_is_zero_before_begin() {
        let ramp = SlowStart::new(0.02, 10.0);
        assert_eq!(ramp.fraction(5_000_000), 0.0);
        assert!(!ramp.is_complete(5_000_000));
    }

    #[test]
    fn fraction_grows_linearly_and_pins() {
        let mut ramp = SlowStart::new(0.02, 10.0);
        ramp.begin(0);

        assert_eq!(ramp.fraction(0), 0.0);
        assert!((ramp.fraction(2_500_000) - 0.25).abs() < 1e-6);
        assert!((ramp.fraction(5_000_000) - 0.5).abs() < 1e-6);
        assert_eq!(ramp.fraction(10_000_000), 1.0);
        // Inert past the ramp time
        assert_eq!(ramp.fraction(60_000_000), 1.0);
        assert!(ramp.is_complete(10_000_000));
    }

    #[test]
    fn fraction_is_monotonic() {
        let mut ramp = SlowStart::new(0.02, 8.0);
        ramp.begin(1_000_000);

        let mut previous = 0.0;
        for t in (1_000_000..12_000_000).step_by(250_000) {
            let f = ramp.fraction(t);
            assert!(f >= previous);
            previous = f;
        }
    }

    #[test]
    fn begin_does_not_restart_running_ramp() {
        let mut ramp = SlowStart::new(0.02, 10.0);
        ramp.begin(0);
        ramp.begin(9_000_000);
        assert!((ramp.fraction(5_000_000) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn constrain_bounds_per_tick_delta() {
        let mut ramp = SlowStart::new(0.02, 10.0);

        // A full-range step request advances by at most the amplitude
        let out = ramp.constrain(1.0);
        assert!((out - 0.02).abs() < 1e-6);
        let out = ramp.constrain(1.0);
        assert!((out - 0.04).abs() < 1e-6);

        // Downward steps are bounded the same way
        let out = ramp.constrain(0.0);
        assert!((out - 0.02).abs() < 1e-6);
    }

    #[test]
    fn constrain_settles_on_small_targets() {
        let mut ramp = SlowStart::new(0.1, 10.0);
        let out = ramp.constrain(0.05);
        assert!((out - 0.05).abs() < 1e-6);
        let out = ramp.constrain(0.05);
        assert!((out - 0.05).abs() < 1e-6);
    }

    #[test]
    fn reset_rewinds_fraction_and_reference() {
        let mut ramp = SlowStart::new(0.02, 10.0);
        ramp.begin(0);
        ramp.constrain(1.0);

        ramp.reset();
        assert_eq!(ramp.fraction(20_000_000), 0.0);
        assert_eq!(ramp.last_output(), 0.0);

        // Restartable after reset
        ramp.begin(20_000_000);
        assert!((ramp.fraction(25_000_000) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn configure_does_not_rewind() {
        let mut ramp = SlowStart::new(0.02, 10.0);
        ramp.begin(0);

        ramp.configure(0.05, 20.0);
        // Start time kept, new duration applied
        assert!((ramp.fraction(10_000_000) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn parameters_clamped() {
        let ramp = SlowStart::new(9.0, 0.0);
        // Amplitude capped at half range, ramp time floored
        let mut ramp = ramp;
        ramp.begin(0);
        assert_eq!(ramp.fraction(500_000), 1.0);
        let out = ramp.constrain(1.0);
        assert!((out - 0.5).abs() < 1e-6);
    }
}
