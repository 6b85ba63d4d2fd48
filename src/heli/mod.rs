//! Single-rotor motor control aggregate
//!
//! Owns the tick pipeline and the state it runs on: cached mixing scalars,
//! the rotor speed sequencer, the identification harness and the output
//! pipeline. The external scheduler calls [`HeliMotors::tick`] at the
//! control-loop rate; collaborators (swashplate solver, rotor speed
//! controller, actuator transport, telemetry) are passed in per tick.
//!
//! Tick ordering is fixed: sequencer update precedes mixing and injection,
//! scalar recalculation happens outside the tick (on arming transitions and
//! configuration reloads), and the transport is written exactly once.
//!
//! Boot is an explicit lifecycle step: until [`HeliMotors::initialise`] is
//! called, a tick emits a neutral frame and nothing else.

use crate::injection::{Excitation, FaultInjector};
use crate::mixer::{
    ActuatorChannel, ActuatorFrame, ControlDemand, HeliMixer, MixerScalars, SwashplateSolver,
    TailDrive,
};
use crate::output::{ActuatorTransport, OutputPipeline, ServoTest, TelemetrySink, TestModeError};
use crate::parameters::heli::TailType;
use crate::parameters::{HeliParams, ParameterError, ParameterStore, RscParams, SysIdParams};
use crate::sequencer::{
    RotorControlState, RotorSequencer, RotorSpeedControl, SpoolRequest, TailRscMode,
};
use crate::traits::TimeSource;

/// Boot lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Ready,
}

/// Pre-arm configuration check failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreArmFailure {
    /// Frame/mixer configuration out of range
    MixerConfig,
    /// Rotor speed sequencing configuration out of range
    RotorConfig,
    /// Identification harness configuration out of range
    SysIdConfig,
}

impl core::fmt::Display for PreArmFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PreArmFailure::MixerConfig => write!(f, "mixer configuration out of range"),
            PreArmFailure::RotorConfig => write!(f, "rotor configuration out of range"),
            PreArmFailure::SysIdConfig => write!(f, "sysid configuration out of range"),
        }
    }
}

/// Motor and actuator control for a single main-rotor helicopter
pub struct HeliMotors<T: TimeSource> {
    time: T,
    lifecycle: Lifecycle,
    heli_params: HeliParams,
    rsc_params: RscParams,
    sysid_params: SysIdParams,
    armed: bool,
    mixer: HeliMixer,
    sequencer: RotorSequencer,
    excitation: Excitation,
    fault: FaultInjector,
    pipeline: OutputPipeline,
    servo_test: ServoTest,
    last_tick_us: Option<u64>,
}

impl<T: TimeSource> HeliMotors<T> {
    pub fn new(
        time: T,
        heli_params: HeliParams,
        rsc_params: RscParams,
        sysid_params: SysIdParams,
    ) -> Self {
        let scalars = MixerScalars::recalculate(&heli_params);
        let mut sequencer = RotorSequencer::new(&rsc_params);
        sequencer.set_tail_mode(Self::tail_mode_for(&scalars.tail_drive));

        Self {
            time,
            lifecycle: Lifecycle::Uninitialized,
            heli_params,
            rsc_params,
            sysid_params,
            armed: false,
            mixer: HeliMixer::new(scalars),
            sequencer,
            excitation: Excitation::new(&sysid_params),
            fault: FaultInjector::new(&sysid_params),
            pipeline: OutputPipeline::new(),
            servo_test: ServoTest::default(),
            last_tick_us: None,
        }
    }

    /// Build from the parameter store, registering defaults first so a
    /// fresh store boots on safe values.
    pub fn from_store(time: T, store: &mut ParameterStore) -> Result<Self, ParameterError> {
        HeliParams::register_defaults(store)?;
        RscParams::register_defaults(store)?;
        SysIdParams::register_defaults(store)?;

        Ok(Self::new(
            time,
            HeliParams::from_store(store),
            RscParams::from_store(store),
            SysIdParams::from_store(store),
        ))
    }

    /// One-shot boot transition. Idempotent; until called, ticks emit
    /// neutral frames.
    pub fn initialise(&mut self) {
        if self.lifecycle == Lifecycle::Ready {
            return;
        }
        crate::log_info!("heli motor control ready");
        self.lifecycle = Lifecycle::Ready;
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    /// Reload configuration from the store.
    ///
    /// Re-primes scalars and ramp parameters. A spool ramp in progress is
    /// never rewound; the identification harness restarts from the new
    /// settings.
    pub fn reload_configuration(&mut self, store: &ParameterStore) {
        self.heli_params = HeliParams::from_store(store);
        self.rsc_params = RscParams::from_store(store);
        self.sysid_params = SysIdParams::from_store(store);

        self.refresh_scalars();
        self.sequencer.configure(&self.rsc_params);
        self.excitation = Excitation::new(&self.sysid_params);
        self.fault = FaultInjector::new(&self.sysid_params);
    }

    /// Update the armed state, recalculating the armed-dependent scalars
    pub fn set_armed(&mut self, armed: bool) {
        if self.armed == armed {
            return;
        }
        self.armed = armed;
        crate::log_info!("armed state changed");
        self.refresh_scalars();
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    fn refresh_scalars(&mut self) {
        let scalars = MixerScalars::recalculate_armed(&self.heli_params, self.armed);
        self.sequencer
            .set_tail_mode(Self::tail_mode_for(&scalars.tail_drive));
        self.mixer.set_scalars(scalars);
    }

    fn tail_mode_for(tail_drive: &TailDrive) -> TailRscMode {
        match tail_drive {
            TailDrive::VarPitch { target_speed } => TailRscMode::Setpoint(*target_speed),
            TailDrive::VarPitchExtGov => TailRscMode::ExtGovernor,
            // Fixed pitch is yaw-driven in the mixer; servo tails have no
            // motor at all
            _ => TailRscMode::None,
        }
    }

    /// File an advisory spool request, applied at the next tick
    pub fn request(&mut self, request: SpoolRequest) {
        self.sequencer.request(request);
    }

    /// Loss-of-drive pass-through from the vehicle
    pub fn set_drive_lost(&mut self, lost: bool) {
        self.sequencer.set_drive_lost(lost);
    }

    /// Select the acro external-gyro gain
    pub fn set_acro_tail(&mut self, acro: bool) {
        self.mixer.set_acro_tail(acro);
    }

    /// Override the flight rotor speed setpoint, normalized [0,1]
    pub fn set_desired_rotor_speed(&mut self, setpoint: f32) {
        self.sequencer.set_desired_rotor_speed(setpoint);
    }

    /// Set the external gyro gain at runtime. Values outside 0-1000 are
    /// ignored.
    pub fn ext_gyro_gain(&mut self, gain: f32) {
        if (0.0..=1000.0).contains(&gain) {
            self.heli_params.ext_gyro_gain = gain;
            self.refresh_scalars();
        }
    }

    pub fn rotor_state(&self) -> RotorControlState {
        self.sequencer.state()
    }

    /// Commanded rotor speed this tick
    pub fn desired_rotor_speed(&self) -> f32 {
        self.sequencer.desired_speed()
    }

    /// Last known measured rotor speed
    pub fn rotor_speed(&self) -> f32 {
        self.sequencer.measured_speed()
    }

    /// Last known governor output
    pub fn governor_output(&self) -> f32 {
        self.sequencer.governor_output()
    }

    /// Throttle command emitted last tick
    pub fn control_output(&self) -> f32 {
        self.sequencer.control_output()
    }

    /// True if the measured rotor speed clears the critical threshold
    pub fn rotor_speed_above_critical(&self) -> bool {
        self.sequencer.rotor_speed_above_critical()
    }

    /// True if the frame has a mechanical flybar
    pub fn has_flybar(&self) -> bool {
        self.heli_params.flybar
    }

    /// Yaw passthrough is only meaningful with an external gyro holding
    /// the tail
    pub fn supports_yaw_passthrough(&self) -> bool {
        self.heli_params.tail_type == TailType::ServoExtGyro
    }

    /// Bitmask of the outputs this core claims, for conflict detection
    /// with other subsystems
    pub fn motor_mask(&self) -> u32 {
        let mut mask = ActuatorChannel::Throttle.mask_bit();

        let servo_count = self.mixer.scalars().swash_servo_count;
        for channel in [
            ActuatorChannel::Swash1,
            ActuatorChannel::Swash2,
            ActuatorChannel::Swash3,
        ]
        .iter()
        .take(servo_count as usize)
        {
            mask |= channel.mask_bit();
        }

        if self.heli_params.tail_type.has_tail_servo() {
            mask |= ActuatorChannel::TailServo.mask_bit();
        }
        // External gyro and tail motor share the auxiliary output
        if self.heli_params.tail_type.has_tail_motor()
            || self.heli_params.tail_type == TailType::ServoExtGyro
        {
            mask |= ActuatorChannel::TailMotor.mask_bit();
        }

        mask
    }

    /// Pre-arm configuration validation
    pub fn parameter_check(&self) -> Result<(), PreArmFailure> {
        if !self.heli_params.is_valid() {
            return Err(PreArmFailure::MixerConfig);
        }
        if !self.rsc_params.is_valid() {
            return Err(PreArmFailure::RotorConfig);
        }
        if !self.sysid_params.is_valid() {
            return Err(PreArmFailure::SysIdConfig);
        }
        Ok(())
    }

    /// Enter the servo test sweep. Refused unless the rotor is shut down
    /// or idling.
    pub fn start_servo_test(&mut self) -> Result<(), TestModeError> {
        self.servo_test.start(self.sequencer.is_spooled_down())
    }

    /// Leave the servo test sweep
    pub fn stop_servo_test(&mut self) {
        self.servo_test.stop();
    }

    pub fn servo_test_active(&self) -> bool {
        self.servo_test.is_active()
    }

    /// Drive a single output channel for bench testing, all other channels
    /// neutral. Same out-of-flight guard as the sweep.
    pub fn output_test_channel(
        &mut self,
        channel: ActuatorChannel,
        value: f32,
        transport: &mut dyn ActuatorTransport,
    ) -> Result<(), TestModeError> {
        if !self.sequencer.is_spooled_down() {
            return Err(TestModeError::RotorNotStopped);
        }

        let mut frame = self.neutral_frame();
        let (min, max) = channel.range();
        frame.set_value(channel, value.clamp(min, max));
        OutputPipeline::clip(&mut frame);
        if transport.write(&frame).is_err() {
            crate::log_warn!("test channel write dropped");
        }
        Ok(())
    }

    fn neutral_frame(&self) -> ActuatorFrame {
        let mut frame = ActuatorFrame::neutral();
        for _ in 0..self.mixer.scalars().swash_servo_count {
            frame.swash.push(0.0).ok();
        }
        frame
    }

    /// Run one control tick.
    ///
    /// Always produces a defined frame: before initialisation it is the
    /// neutral frame, and degraded collaborators fall back to last known
    /// good values inside the stages that own them.
    pub fn tick(
        &mut self,
        demand: &ControlDemand,
        solver: &mut dyn SwashplateSolver,
        rsc: &mut dyn RotorSpeedControl,
        transport: &mut dyn ActuatorTransport,
        telemetry: &mut dyn TelemetrySink,
    ) -> ActuatorFrame {
        if self.lifecycle == Lifecycle::Uninitialized {
            let mut frame = self.neutral_frame();
            self.pipeline
                .emit(&mut frame, self.sequencer.state(), transport, telemetry);
            return frame;
        }

        let now_us = self.time.now_us();
        let dt_s = match self.last_tick_us {
            Some(last) => now_us.saturating_sub(last) as f32 / 1_000_000.0,
            None => 0.0,
        };
        self.last_tick_us = Some(now_us);

        // Sequencer state update precedes mixer and injector consumption
        let status = self.sequencer.update(now_us, rsc);

        // The sweep only exists out of flight; spooling up force-exits it
        if self.servo_test.is_active() && !self.sequencer.is_spooled_down() {
            crate::log_warn!("rotor spooling, leaving servo test");
            self.servo_test.stop();
        }

        // Servo test override is mutually exclusive with flight mixing
        let tick_demand = match self.servo_test.update(dt_s) {
            Some(sweep) => sweep,
            None => *demand,
        };
        let mut frame = self.mixer.mix(solver, &tick_demand, &status);

        // Perturbation layers run only at flight speed, never during
        // spool states
        if status.state == RotorControlState::Active {
            self.excitation.activate(now_us);
            self.excitation.apply(&mut frame, now_us);
            self.fault.apply(&mut frame);
        } else {
            self.excitation.deactivate();
        }

        self.pipeline
            .emit(&mut frame, status.state, transport, telemetry);
        frame
    }

    /// Shared time source, also used by tests to drive the clock
    pub fn time(&self) -> &T {
        &self.time
    }
}
