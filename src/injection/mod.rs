//! Excitation and fault injection
//!
//! Optional perturbation layers superimposed on the mixer's outputs for
//! system identification and resilience testing. Both layers are purely
//! additive or multiplicative on a single channel, are gated on the rotor
//! being at flight speed (never during spool states, where a perturbation
//! could destabilize the startup), and clip after perturbing so no command
//! ever leaves its hardware-safe range.
//!
//! The excitation waveform is armed by configuration and activated by the
//! tick orchestrator when the rotor reaches flight speed. The fault model
//! is deterministic under a fixed seed, so a recorded test run can be
//! replayed exactly.

use crate::mixer::{ActuatorChannel, ActuatorFrame};
use crate::parameters::sysid::SysIdParams;
use core::f32::consts::TAU;
use libm::sinf;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Excitation waveform kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    /// Fixed-period sine
    #[default]
    Sine = 0,
    /// Linear frequency sweep
    Chirp = 1,
}

impl Waveform {
    /// Decode the configuration surface's integer code; unknown codes read
    /// as sine
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Waveform::Chirp,
            _ => Waveform::Sine,
        }
    }
}

/// Excitation signal generator
///
/// Produces a time-indexed offset for one actuator channel. Inert until
/// [`Excitation::activate`] stamps the start time.
#[derive(Debug, Clone)]
pub struct Excitation {
    enabled: bool,
    waveform: Waveform,
    amplitude: f32,
    period_s: f32,
    f_start_hz: f32,
    f_stop_hz: f32,
    sweep_time_s: f32,
    /// Hold at the terminal frequency after the sweep (else restart it)
    chirp_hold: bool,
    channel: ActuatorChannel,
    started_us: Option<u64>,
}

impl Excitation {
    pub fn new(params: &SysIdParams) -> Self {
        Self {
            enabled: params.excitation_enabled,
            waveform: params.waveform,
            amplitude: params.amplitude,
            period_s: params.period_s,
            f_start_hz: params.f_start_hz,
            f_stop_hz: params.f_stop_hz,
            sweep_time_s: params.sweep_time_s,
            chirp_hold: params.chirp_hold,
            channel: params.channel,
            started_us: None,
        }
    }

    /// Stamp the activation time. No-op when disabled or already running.
    pub fn activate(&mut self, now_us: u64) {
        if self.enabled && self.started_us.is_none() {
            crate::log_info!("excitation active");
            self.started_us = Some(now_us);
        }
    }

    /// Stop producing offsets until the next activation
    pub fn deactivate(&mut self) {
        self.started_us = None;
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.started_us.is_some()
    }

    fn elapsed_s(&self, now_us: u64) -> Option<f32> {
        self.started_us
            .map(|start| now_us.saturating_sub(start) as f32 / 1_000_000.0)
    }

    /// Instantaneous excitation frequency in Hz, `None` while inert
    pub fn frequency_hz(&self, now_us: u64) -> Option<f32> {
        if !self.enabled {
            return None;
        }
        let t = self.elapsed_s(now_us)?;
        let f = match self.waveform {
            Waveform::Sine => 1.0 / self.period_s,
            Waveform::Chirp => {
                let slope = (self.f_stop_hz - self.f_start_hz) / self.sweep_time_s;
                if t < self.sweep_time_s {
                    self.f_start_hz + slope * t
                } else if self.chirp_hold {
                    self.f_stop_hz
                } else {
                    self.f_start_hz + slope * (t % self.sweep_time_s)
                }
            }
        };
        Some(f)
    }

    /// Offset for the given timestamp; zero whenever disabled or inert
    pub fn offset(&self, now_us: u64) -> f32 {
        if !self.enabled {
            return 0.0;
        }
        let t = match self.elapsed_s(now_us) {
            Some(t) => t,
            None => return 0.0,
        };

        match self.waveform {
            Waveform::Sine => self.amplitude * sinf(TAU * t / self.period_s),
            Waveform::Chirp => self.amplitude * sinf(self.chirp_phase(t)),
        }
    }

    /// Phase of the linear sweep at elapsed time `t`.
    ///
    /// Integrating f(t) = f0 + (f1 - f0) * t / T gives
    /// phi(t) = 2*pi * (f0*t + (f1 - f0) * t^2 / (2*T)). Past the sweep the
    /// phase continues at the terminal frequency (hold) or the sweep runs
    /// again from its start (restart).
    fn chirp_phase(&self, t: f32) -> f32 {
        let sweep = self.sweep_time_s;
        let slope = self.f_stop_hz - self.f_start_hz;
        let ramp_phase =
            |t: f32| TAU * (self.f_start_hz * t + 0.5 * slope * t * t / sweep);

        if t < sweep {
            ramp_phase(t)
        } else if self.chirp_hold {
            ramp_phase(sweep) + TAU * self.f_stop_hz * (t - sweep)
        } else {
            ramp_phase(t % sweep)
        }
    }

    /// Add this tick's offset onto the target channel, clipping the result
    /// into the channel's valid range
    pub fn apply(&self, frame: &mut ActuatorFrame, now_us: u64) {
        let offset = self.offset(now_us);
        if offset == 0.0 {
            return;
        }
        let (min, max) = self.channel.range();
        let perturbed = (frame.value(self.channel) + offset).clamp(min, max);
        frame.set_value(self.channel, perturbed);
    }
}

/// Output degradation fault model
///
/// Each tick, with probability equal to the fault fraction, the target
/// channel is attenuated by (1 - fraction). At fraction 1.0 the channel is
/// pinned to zero authority every tick. The draw sequence is deterministic
/// under a fixed seed.
pub struct FaultInjector {
    enabled: bool,
    fraction: f32,
    channel: ActuatorChannel,
    rng: SmallRng,
}

impl FaultInjector {
    pub fn new(params: &SysIdParams) -> Self {
        Self {
            enabled: params.fault_enabled,
            fraction: params.fault_fraction.clamp(0.0, 1.0),
            channel: params.fault_channel,
            rng: SmallRng::seed_from_u64(params.fault_seed),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Degrade the target channel for this tick, clipping the result into
    /// the channel's valid range
    pub fn apply(&mut self, frame: &mut ActuatorFrame) {
        if !self.enabled || self.fraction <= 0.0 {
            return;
        }
        let draw: f32 = self.rng.gen();
        if draw < self.fraction {
            let (min, max) = self.channel.range();
            let degraded = frame.value(self.channel) * (1.0 - self.fraction);
            frame.set_value(self.channel, degraded.clamp(min, max));
        }
    }
}
