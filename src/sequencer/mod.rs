//! Rotor speed sequencing
//!
//! Finite-state sequencing of main rotor spool-up, hold and spool-down,
//! with the symmetric spool sequence for direct-drive tails. The actual
//! speed loop (governor, speed estimation) is the rotor speed controller
//! collaborator's job; this module decides what speed to ask for, gates the
//! state transitions, and bounds output motion through the slow-start ramp.
//!
//! Spool requests are advisory: they take effect at the next update, never
//! mid-computation, and the most recent request wins. A request that is not
//! legal from the current state is dropped.

pub mod slow_start;

pub use slow_start::SlowStart;

use crate::parameters::rsc::RscParams;

/// Desired speed below this reads as "reached zero" on the spool-down path
const SPOOLED_DOWN_EPSILON: f32 = 1e-3;

/// Rotor control state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotorControlState {
    /// Rotor stopped, ramp rewound
    #[default]
    ShutDown,
    /// Ground idle, rotor turning below flight speed
    Idle,
    /// Ramping toward the flight setpoint
    SpoolingUp,
    /// At flight speed, governor in control
    Active,
    /// Ramping toward zero
    SpoolingDown,
    /// Drive lost in flight, rotor windmilling
    Autorotate,
}

impl RotorControlState {
    /// Short name for logging and telemetry
    pub fn name(&self) -> &'static str {
        match self {
            RotorControlState::ShutDown => "shutdown",
            RotorControlState::Idle => "idle",
            RotorControlState::SpoolingUp => "spooling-up",
            RotorControlState::Active => "active",
            RotorControlState::SpoolingDown => "spooling-down",
            RotorControlState::Autorotate => "autorotate",
        }
    }
}

/// Advisory spool request, applied at the next update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpoolRequest {
    /// Go to ground idle
    Idle,
    /// Spool up to the flight setpoint
    SpoolUp,
    /// Spool down to stop
    SpoolDown,
}

/// One tick of feedback from the rotor speed controller
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RotorFeedback {
    /// Measured or estimated rotor speed, normalized [0,1]
    pub measured_speed: f32,
    /// Governor/throttle output, normalized [0,1]
    pub governor_output: f32,
    /// Speed above which flight is sustainable, normalized [0,1]
    pub critical_speed: f32,
}

impl RotorFeedback {
    fn sanitized(self) -> Self {
        Self {
            measured_speed: self.measured_speed.clamp(0.0, 1.0),
            governor_output: self.governor_output.clamp(0.0, 1.0),
            critical_speed: self.critical_speed.clamp(0.0, 1.0),
        }
    }
}

/// Rotor speed controller collaborator
///
/// Ramps and holds rotor speed; implementations wrap the governor or ESC
/// telemetry loop.
pub trait RotorSpeedControl {
    /// Advance the controller one tick toward `desired_speed`.
    ///
    /// Returns `None` when the controller cannot answer within the tick;
    /// the sequencer then continues on its last known good feedback.
    fn update(&mut self, desired_speed: f32) -> Option<RotorFeedback>;
}

/// Tail rotor drive mode, derived from the tail topology
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TailRscMode {
    /// No direct-drive tail motor
    #[default]
    None,
    /// Direct-drive tail at a configured target speed, spooled with the
    /// main rotor
    Setpoint(f32),
    /// Direct-drive tail slaved to the external governor reference
    ExtGovernor,
}

/// Per-tick rotor status snapshot consumed by the mixer and the injector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotorStatus {
    pub state: RotorControlState,
    /// Commanded rotor speed this tick, normalized [0,1]
    pub desired_speed: f32,
    /// Last known measured speed, normalized [0,1]
    pub measured_speed: f32,
    /// Slow-start ramp fraction [0,1]
    pub ramp_fraction: f32,
    /// Main rotor throttle command [0,1], ramp and slew applied
    pub main_output: f32,
    /// Direct-drive tail motor command [0,1]; zero without a tail motor
    pub tail_output: f32,
}

/// Rotor speed sequencer
pub struct RotorSequencer {
    state: RotorControlState,
    pending: Option<SpoolRequest>,
    /// Flight speed target, normalized [0,1]
    setpoint: f32,
    /// Commanded speed this tick, rate-limited toward its target
    desired: f32,
    ramp_time_s: f32,
    idle_output: f32,
    slow_start: SlowStart,
    tail_mode: TailRscMode,
    /// Last known good collaborator feedback
    feedback: RotorFeedback,
    drive_lost: bool,
    last_update_us: Option<u64>,
}

impl RotorSequencer {
    pub fn new(params: &RscParams) -> Self {
        Self {
            state: RotorControlState::ShutDown,
            pending: None,
            setpoint: params.setpoint.clamp(0.0, 1.0),
            desired: 0.0,
            ramp_time_s: params.ramp_time_s,
            idle_output: params.idle_output,
            slow_start: SlowStart::new(params.slew_amplitude, params.ramp_time_s),
            tail_mode: TailRscMode::None,
            feedback: RotorFeedback::default(),
            drive_lost: false,
            last_update_us: None,
        }
    }

    /// Re-prime ramp parameters from configuration.
    ///
    /// Never rewinds a ramp in progress; the only reset authority is
    /// re-entry into shut-down.
    pub fn configure(&mut self, params: &RscParams) {
        self.setpoint = params.setpoint.clamp(0.0, 1.0);
        self.ramp_time_s = params.ramp_time_s;
        self.idle_output = params.idle_output;
        self.slow_start
            .configure(params.slew_amplitude, params.ramp_time_s);
    }

    /// Set the tail drive mode (derived from the tail topology)
    pub fn set_tail_mode(&mut self, mode: TailRscMode) {
        self.tail_mode = mode;
    }

    /// File an advisory spool request; the most recent request wins
    pub fn request(&mut self, request: SpoolRequest) {
        self.pending = Some(request);
    }

    /// Loss-of-drive pass-through from the vehicle (not computed here)
    pub fn set_drive_lost(&mut self, lost: bool) {
        self.drive_lost = lost;
    }

    /// Override the flight speed setpoint, normalized [0,1]
    pub fn set_desired_rotor_speed(&mut self, setpoint: f32) {
        self.setpoint = setpoint.clamp(0.0, 1.0);
    }

    pub fn state(&self) -> RotorControlState {
        self.state
    }

    /// Commanded rotor speed this tick
    pub fn desired_speed(&self) -> f32 {
        self.desired
    }

    /// Last known measured rotor speed
    pub fn measured_speed(&self) -> f32 {
        self.feedback.measured_speed
    }

    /// Last known governor output
    pub fn governor_output(&self) -> f32 {
        self.feedback.governor_output
    }

    /// Throttle command emitted last tick
    pub fn control_output(&self) -> f32 {
        self.slow_start.last_output()
    }

    /// True while the rotor is stopped or at ground idle; the servo test
    /// harness gates on this
    pub fn is_spooled_down(&self) -> bool {
        matches!(
            self.state,
            RotorControlState::ShutDown | RotorControlState::Idle
        )
    }

    /// True if the measured speed clears the critical threshold.
    ///
    /// Pure predicate for the caller's flight-mode eligibility decisions.
    pub fn rotor_speed_above_critical(&self) -> bool {
        self.feedback.measured_speed > self.feedback.critical_speed
    }

    /// Advance the sequencer one tick.
    ///
    /// Must run before the mixer and injector consume the returned status
    /// within the same tick.
    pub fn update(&mut self, now_us: u64, rsc: &mut dyn RotorSpeedControl) -> RotorStatus {
        let dt_s = match self.last_update_us {
            Some(last) => now_us.saturating_sub(last) as f32 / 1_000_000.0,
            None => 0.0,
        };
        self.last_update_us = Some(now_us);

        if let Some(request) = self.pending.take() {
            self.apply_request(request, now_us);
        }

        // Autorotation is a pass-through flag: enter on loss of drive in
        // flight, return to active when drive is restored
        if self.drive_lost && self.state == RotorControlState::Active {
            crate::log_warn!("drive lost, entering autorotation");
            self.state = RotorControlState::Autorotate;
        } else if !self.drive_lost && self.state == RotorControlState::Autorotate {
            crate::log_info!("drive restored, leaving autorotation");
            self.state = RotorControlState::Active;
        }

        // Move the commanded speed toward the state target, full scale per
        // ramp time
        let target = match self.state {
            RotorControlState::ShutDown
            | RotorControlState::SpoolingDown
            | RotorControlState::Autorotate => 0.0,
            RotorControlState::Idle => self.idle_output,
            RotorControlState::SpoolingUp | RotorControlState::Active => {
                self.setpoint * self.slow_start.fraction(now_us)
            }
        };
        let max_step = if dt_s > 0.0 {
            dt_s / self.ramp_time_s
        } else {
            0.0
        };
        self.desired += (target - self.desired).clamp(-max_step, max_step);
        self.desired = self.desired.clamp(0.0, 1.0);

        match rsc.update(self.desired) {
            Some(feedback) => self.feedback = feedback.sanitized(),
            None => {
                crate::log_warn!("rotor speed controller missed a tick, holding last feedback");
            }
        }

        // Condition-gated transitions
        match self.state {
            RotorControlState::SpoolingUp
                if self.slow_start.is_complete(now_us) && self.rotor_speed_above_critical() =>
            {
                crate::log_info!("rotor spooled up, governor active");
                self.state = RotorControlState::Active;
            }
            RotorControlState::SpoolingDown if self.desired <= SPOOLED_DOWN_EPSILON => {
                crate::log_info!("rotor spooled down");
                self.enter_shutdown();
            }
            _ => {}
        }

        let governor = self.feedback.governor_output;
        let main_output = match self.state {
            RotorControlState::ShutDown | RotorControlState::Autorotate => {
                self.slow_start.track(0.0)
            }
            RotorControlState::Idle => self.slow_start.track(self.idle_output),
            // The slew guard applies while spooling up; elsewhere the
            // governor moves freely
            RotorControlState::SpoolingUp => self.slow_start.constrain(governor),
            RotorControlState::Active | RotorControlState::SpoolingDown => {
                self.slow_start.track(governor)
            }
        };

        // Symmetric tail spool: the tail tracks the main rotor's progress
        // toward its setpoint
        let spool_ratio = if self.setpoint > 0.0 {
            (self.desired / self.setpoint).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let tail_output = match self.state {
            RotorControlState::ShutDown | RotorControlState::Autorotate => 0.0,
            _ => match self.tail_mode {
                TailRscMode::None => 0.0,
                TailRscMode::Setpoint(target_speed) => target_speed * spool_ratio,
                TailRscMode::ExtGovernor => governor,
            },
        };

        RotorStatus {
            state: self.state,
            desired_speed: self.desired,
            measured_speed: self.feedback.measured_speed,
            ramp_fraction: self.slow_start.fraction(now_us),
            main_output,
            tail_output,
        }
    }

    fn apply_request(&mut self, request: SpoolRequest, now_us: u64) {
        use RotorControlState::*;

        match (self.state, request) {
            (ShutDown, SpoolRequest::Idle) => {
                self.state = Idle;
            }
            (ShutDown | Idle, SpoolRequest::SpoolUp) => {
                self.slow_start.begin(now_us);
                crate::log_info!("spool-up requested, ramping");
                self.state = SpoolingUp;
            }
            (SpoolingDown, SpoolRequest::SpoolUp) => {
                // Resume without rewinding: the ramp stays wherever the
                // interrupted spool-up left it
                self.slow_start.begin(now_us);
                self.state = SpoolingUp;
            }
            (Idle | SpoolingUp | Active | Autorotate, SpoolRequest::SpoolDown) => {
                crate::log_info!("spool-down requested");
                self.state = SpoolingDown;
            }
            (ShutDown, SpoolRequest::SpoolDown) => {
                // Idempotent re-entry still resets the ramp
                self.enter_shutdown();
            }
            (state, request) => {
                let name = match request {
                    SpoolRequest::Idle => "idle",
                    SpoolRequest::SpoolUp => "spool-up",
                    SpoolRequest::SpoolDown => "spool-down",
                };
                crate::log_debug!("ignoring {} request in state {}", name, state.name());
            }
        }
    }

    fn enter_shutdown(&mut self) {
        self.state = RotorControlState::ShutDown;
        self.desired = 0.0;
        self.slow_start.reset();
    }
}
