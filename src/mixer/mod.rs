//! Swashplate and tail mixing
//!
//! Per-tick geometric mixing of roll/pitch/collective into swashplate servo
//! commands and yaw (plus collective-yaw feed-forward) into the tail
//! actuator commands, branching on the resolved tail drive topology.
//!
//! The swashplate trigonometry itself lives behind [`SwashplateSolver`];
//! this module assembles the solver's inputs and routes its outputs, it
//! does not solve linkage geometry. If the solver fails to answer within a
//! tick the last good servo positions are reused, so the actuators always
//! receive a defined command.
//!
//! Saturation is non-fatal: a yaw demand beyond the actuator range is
//! clamped, emitted, and flagged for telemetry.

pub mod scalars;

pub use scalars::{MixerScalars, Rotation, TailDrive};

pub use crate::parameters::heli::MAX_SWASH_SERVOS;
use crate::sequencer::RotorStatus;
use bitflags::bitflags;
use heapless::Vec;

bitflags! {
    /// Which outputs were clamped while producing a frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SaturationFlags: u8 {
        /// Yaw mix exceeded the tail actuator range
        const YAW = 0b0000_0001;
        /// A swashplate servo exceeded its range
        const SWASH = 0b0000_0010;
        /// Throttle output exceeded its range
        const THROTTLE = 0b0000_0100;
    }
}

/// Actuator output channels
///
/// The integer codes select injection targets on the configuration
/// surface. The physical channel claims (for conflict detection with other
/// subsystems) are exposed through [`ActuatorChannel::mask_bit`]: swash
/// servos on outputs 1-3, the tail servo on output 4, the gyro/tail motor
/// on output 7 and the throttle on output 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorChannel {
    Swash1 = 0,
    Swash2 = 1,
    Swash3 = 2,
    TailServo = 3,
    TailMotor = 4,
    Throttle = 5,
}

impl ActuatorChannel {
    /// Decode the configuration surface's integer code.
    ///
    /// Unknown codes degrade to the tail servo, the usual identification
    /// target.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ActuatorChannel::Swash1,
            1 => ActuatorChannel::Swash2,
            2 => ActuatorChannel::Swash3,
            4 => ActuatorChannel::TailMotor,
            5 => ActuatorChannel::Throttle,
            _ => ActuatorChannel::TailServo,
        }
    }

    /// Valid command range for this channel
    pub fn range(&self) -> (f32, f32) {
        match self {
            // Throttle is unidirectional; everything else swings about
            // neutral
            ActuatorChannel::Throttle => (0.0, 1.0),
            _ => (-1.0, 1.0),
        }
    }

    /// Physical output claim as a bit in the motor mask
    pub fn mask_bit(&self) -> u32 {
        match self {
            ActuatorChannel::Swash1 => 1 << 0,
            ActuatorChannel::Swash2 => 1 << 1,
            ActuatorChannel::Swash3 => 1 << 2,
            ActuatorChannel::TailServo => 1 << 3,
            ActuatorChannel::TailMotor => 1 << 6,
            ActuatorChannel::Throttle => 1 << 7,
        }
    }
}

/// Normalized flight-control demand for one tick
///
/// Roll, pitch and yaw are in [-1,1]. Collective is in [0,1]; the blade
/// pitch range it maps onto (which may be asymmetric about zero pitch) is
/// the swashplate solver's concern.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlDemand {
    pub roll: f32,
    pub pitch: f32,
    pub collective: f32,
    pub yaw: f32,
}

impl ControlDemand {
    /// Clamp all axes into their valid ranges
    pub fn clamped(&self) -> Self {
        Self {
            roll: self.roll.clamp(-1.0, 1.0),
            pitch: self.pitch.clamp(-1.0, 1.0),
            collective: self.collective.clamp(0.0, 1.0),
            yaw: self.yaw.clamp(-1.0, 1.0),
        }
    }
}

/// Per-tick actuator output bundle
///
/// Produced fresh every tick. Channels the active topology does not drive
/// stay at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorFrame {
    /// Swashplate servo commands, one per configured servo
    pub swash: Vec<f32, MAX_SWASH_SERVOS>,
    /// Tail blade-pitch servo command [-1,1]
    pub tail_servo: f32,
    /// Tail motor speed command [-1,1] about neutral
    pub tail_motor: f32,
    /// External gyro gain output [0,1]
    pub ext_gyro: f32,
    /// Main rotor throttle command [0,1]
    pub throttle: f32,
    /// Outputs clamped while producing this frame
    pub saturation: SaturationFlags,
}

impl ActuatorFrame {
    /// An all-neutral frame (zero deflection, zero throttle)
    pub fn neutral() -> Self {
        Self {
            swash: Vec::new(),
            tail_servo: 0.0,
            tail_motor: 0.0,
            ext_gyro: 0.0,
            throttle: 0.0,
            saturation: SaturationFlags::empty(),
        }
    }

    /// Read a channel value; unpopulated swash slots read as zero
    pub fn value(&self, channel: ActuatorChannel) -> f32 {
        match channel {
            ActuatorChannel::Swash1 => self.swash.first().copied().unwrap_or(0.0),
            ActuatorChannel::Swash2 => self.swash.get(1).copied().unwrap_or(0.0),
            ActuatorChannel::Swash3 => self.swash.get(2).copied().unwrap_or(0.0),
            ActuatorChannel::TailServo => self.tail_servo,
            ActuatorChannel::TailMotor => self.tail_motor,
            ActuatorChannel::Throttle => self.throttle,
        }
    }

    /// Write a channel value; writes to unpopulated swash slots are ignored
    pub fn set_value(&mut self, channel: ActuatorChannel, value: f32) {
        match channel {
            ActuatorChannel::Swash1 => {
                if let Some(s) = self.swash.get_mut(0) {
                    *s = value;
                }
            }
            ActuatorChannel::Swash2 => {
                if let Some(s) = self.swash.get_mut(1) {
                    *s = value;
                }
            }
            ActuatorChannel::Swash3 => {
                if let Some(s) = self.swash.get_mut(2) {
                    *s = value;
                }
            }
            ActuatorChannel::TailServo => self.tail_servo = value,
            ActuatorChannel::TailMotor => self.tail_motor = value,
            ActuatorChannel::Throttle => self.throttle = value,
        }
    }
}

/// Swashplate geometric solver
///
/// Converts roll/pitch/collective into up to three linkage positions. The
/// implementation owns the plate geometry (servo angles, phase, blade
/// pitch range).
pub trait SwashplateSolver {
    /// Solve servo positions for the given cyclic and collective demand.
    ///
    /// Returns `None` when the solver cannot answer within the tick; the
    /// mixer then substitutes the last known good positions.
    fn solve(
        &mut self,
        roll: f32,
        pitch: f32,
        collective: f32,
    ) -> Option<Vec<f32, MAX_SWASH_SERVOS>>;
}

/// Swashplate/tail mixer
///
/// Stateless aside from the cached scalars and the last good swashplate
/// solution kept for solver dropouts.
pub struct HeliMixer {
    scalars: MixerScalars,
    acro_tail: bool,
    last_swash: Vec<f32, MAX_SWASH_SERVOS>,
}

impl HeliMixer {
    pub fn new(scalars: MixerScalars) -> Self {
        let mut last_swash = Vec::new();
        for _ in 0..scalars.swash_servo_count {
            last_swash.push(0.0).ok();
        }
        Self {
            scalars,
            acro_tail: false,
            last_swash,
        }
    }

    /// Replace the cached scalars (armed transition or config reload)
    pub fn set_scalars(&mut self, scalars: MixerScalars) {
        self.scalars = scalars;
    }

    pub fn scalars(&self) -> &MixerScalars {
        &self.scalars
    }

    /// Select the acro external-gyro gain
    pub fn set_acro_tail(&mut self, acro: bool) {
        self.acro_tail = acro;
    }

    /// Mix one tick of control demand into an actuator frame.
    ///
    /// The rotor status must be this tick's sequencer output; the throttle
    /// and direct-drive tail commands are lifted from it unchanged.
    pub fn mix(
        &mut self,
        solver: &mut dyn SwashplateSolver,
        demand: &ControlDemand,
        rotor: &RotorStatus,
    ) -> ActuatorFrame {
        let demand = demand.clamped();
        let mut frame = ActuatorFrame::neutral();

        // Swashplate: the solver owns the geometry, we own input assembly
        // and dropout substitution
        match solver.solve(demand.roll, demand.pitch, demand.collective) {
            Some(mut servos) => {
                servos.truncate(self.scalars.swash_servo_count as usize);
                self.last_swash = servos.clone();
                frame.swash = servos;
            }
            None => {
                crate::log_warn!("swashplate solver missed a tick, reusing last output");
                frame.swash = self.last_swash.clone();
            }
        }

        // Yaw with collective feed-forward; the gain is zero while disarmed
        let yaw_raw = demand.yaw + demand.collective * self.scalars.collective_yaw_gain;
        let yaw_out = yaw_raw.clamp(-1.0, 1.0);
        if yaw_out != yaw_raw {
            frame.saturation |= SaturationFlags::YAW;
        }

        match self.scalars.tail_drive {
            TailDrive::Servo => {
                frame.tail_servo = yaw_out;
            }
            TailDrive::ServoExtGyro { gain, gain_acro } => {
                frame.tail_servo = yaw_out;
                frame.ext_gyro = if self.acro_tail { gain_acro } else { gain };
            }
            TailDrive::VarPitch { .. } | TailDrive::VarPitchExtGov => {
                // Motor speed is the sequencer's business; only blade pitch
                // follows yaw here
                frame.tail_servo = yaw_out;
                frame.tail_motor = rotor.tail_output;
            }
            TailDrive::FixedPitch { direction } => {
                frame.tail_motor = match direction {
                    Rotation::Clockwise => yaw_out,
                    Rotation::CounterClockwise => -yaw_out,
                };
            }
        }

        frame.throttle = rotor.main_output.clamp(0.0, 1.0);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::heli::{HeliParams, TailType};
    use crate::sequencer::RotorControlState;

    /// Solver stub: servo i returns collective plus a small per-servo
    /// cyclic term, which keeps outputs distinguishable in assertions
    struct MockSwash {
        fail: bool,
    }

    impl MockSwash {
        fn new() -> Self {
            Self { fail: false }
        }
    }

    impl SwashplateSolver for MockSwash {
        fn solve(
            &mut self,
            roll: f32,
            pitch: f32,
            collective: f32,
        ) -> Option<Vec<f32, MAX_SWASH_SERVOS>> {
            if self.fail {
                return None;
            }
            let mut out = Vec::new();
            out.push(collective + 0.1 * roll).ok();
            out.push(collective + 0.1 * pitch).ok();
            out.push(collective - 0.1 * (roll + pitch)).ok();
            Some(out)
        }
    }

    fn active_status() -> RotorStatus {
        RotorStatus {
            state: RotorControlState::Active,
            desired_speed: 0.7,
            measured_speed: 0.7,
            ramp_fraction: 1.0,
            main_output: 0.7,
            tail_output: 0.5,
        }
    }

    fn mixer_for(tail_type: TailType, armed: bool) -> HeliMixer {
        let mut params = HeliParams::default();
        params.tail_type = tail_type;
        params.ext_gyro_gain = 350.0;
        params.ext_gyro_gain_acro = 500.0;
        HeliMixer::new(MixerScalars::recalculate_armed(&params, armed))
    }

    fn demand(roll: f32, pitch: f32, collective: f32, yaw: f32) -> ControlDemand {
        ControlDemand {
            roll,
            pitch,
            collective,
            yaw,
        }
    }

    #[test]
    fn neutral_demand_neutral_tail() {
        let mut mixer = mixer_for(TailType::Servo, true);
        let mut solver = MockSwash::new();
        let frame = mixer.mix(&mut solver, &demand(0.0, 0.0, 0.5, 0.0), &active_status());

        // Solver neutral output passes through untouched
        assert_eq!(frame.swash.len(), 3);
        for s in frame.swash.iter() {
            assert!((s - 0.5).abs() < 1e-6);
        }
        assert_eq!(frame.tail_servo, 0.0);
        assert_eq!(frame.saturation, SaturationFlags::empty());
    }

    #[test]
    fn servo_topology_claims_no_motor_channels() {
        let mut mixer = mixer_for(TailType::Servo, true);
        let mut solver = MockSwash::new();
        let frame = mixer.mix(&mut solver, &demand(0.1, -0.2, 0.5, 0.3), &active_status());

        assert_eq!(frame.tail_servo, 0.3);
        assert_eq!(frame.tail_motor, 0.0);
        assert_eq!(frame.ext_gyro, 0.0);
    }

    #[test]
    fn ext_gyro_gain_pair_selection() {
        let mut mixer = mixer_for(TailType::ServoExtGyro, true);
        let mut solver = MockSwash::new();

        let frame = mixer.mix(&mut solver, &demand(0.0, 0.0, 0.5, 0.25), &active_status());
        assert_eq!(frame.tail_servo, 0.25);
        assert!((frame.ext_gyro - 0.35).abs() < 1e-6);

        mixer.set_acro_tail(true);
        let frame = mixer.mix(&mut solver, &demand(0.0, 0.0, 0.5, 0.25), &active_status());
        assert!((frame.ext_gyro - 0.5).abs() < 1e-6);
    }

    #[test]
    fn var_pitch_tail_motor_follows_sequencer() {
        let mut mixer = mixer_for(TailType::DirectDriveVarPitch, true);
        let mut solver = MockSwash::new();
        let mut status = active_status();
        status.tail_output = 0.42;

        let frame = mixer.mix(&mut solver, &demand(0.0, 0.0, 0.5, 0.2), &status);
        assert_eq!(frame.tail_servo, 0.2);
        assert!((frame.tail_motor - 0.42).abs() < 1e-6);
    }

    #[test]
    fn fixed_pitch_sign_flips_with_rotation() {
        let mut solver = MockSwash::new();

        let mut cw = mixer_for(TailType::DirectDriveFixedPitchCw, true);
        let frame = cw.mix(&mut solver, &demand(0.0, 0.0, 0.5, 0.5), &active_status());
        assert_eq!(frame.tail_motor, 0.5);
        assert_eq!(frame.tail_servo, 0.0);

        let mut ccw = mixer_for(TailType::DirectDriveFixedPitchCcw, true);
        let frame = ccw.mix(&mut solver, &demand(0.0, 0.0, 0.5, 0.5), &active_status());
        assert_eq!(frame.tail_motor, -0.5);
        assert_eq!(frame.tail_servo, 0.0);
    }

    #[test]
    fn feed_forward_zero_whenever_disarmed() {
        let mut params = HeliParams::default();
        params.collective_yaw_gain = 5.0;
        let mut mixer = HeliMixer::new(MixerScalars::recalculate_armed(&params, false));
        let mut solver = MockSwash::new();

        for collective in [0.0, 0.25, 0.5, 1.0] {
            let frame = mixer.mix(
                &mut solver,
                &demand(0.0, 0.0, collective, 0.0),
                &active_status(),
            );
            assert_eq!(frame.tail_servo, 0.0);
        }
    }

    #[test]
    fn feed_forward_applied_when_armed() {
        let mut params = HeliParams::default();
        params.collective_yaw_gain = 0.4;
        let mut mixer = HeliMixer::new(MixerScalars::recalculate_armed(&params, true));
        let mut solver = MockSwash::new();

        let frame = mixer.mix(&mut solver, &demand(0.0, 0.0, 0.5, 0.1), &active_status());
        assert!((frame.tail_servo - 0.3).abs() < 1e-6);
    }

    #[test]
    fn saturated_yaw_is_clamped_flagged_and_emitted() {
        let mut params = HeliParams::default();
        params.collective_yaw_gain = 4.0;
        let mut mixer = HeliMixer::new(MixerScalars::recalculate_armed(&params, true));
        let mut solver = MockSwash::new();

        let frame = mixer.mix(&mut solver, &demand(0.0, 0.0, 1.0, 0.5), &active_status());
        assert_eq!(frame.tail_servo, 1.0);
        assert!(frame.saturation.contains(SaturationFlags::YAW));
    }

    #[test]
    fn solver_dropout_reuses_last_good_output() {
        let mut mixer = mixer_for(TailType::Servo, true);
        let mut solver = MockSwash::new();

        let good = mixer.mix(&mut solver, &demand(0.2, 0.0, 0.6, 0.0), &active_status());

        solver.fail = true;
        let degraded = mixer.mix(&mut solver, &demand(-0.9, 0.4, 0.1, 0.0), &active_status());
        assert_eq!(degraded.swash, good.swash);
    }

    #[test]
    fn frame_channel_accessors() {
        let mut frame = ActuatorFrame::neutral();
        frame.swash.push(0.1).ok();
        frame.swash.push(0.2).ok();

        frame.set_value(ActuatorChannel::TailServo, -0.5);
        frame.set_value(ActuatorChannel::Swash2, 0.9);
        // Slot 3 is unpopulated, the write must not materialize it
        frame.set_value(ActuatorChannel::Swash3, 0.7);

        assert_eq!(frame.value(ActuatorChannel::TailServo), -0.5);
        assert_eq!(frame.value(ActuatorChannel::Swash2), 0.9);
        assert_eq!(frame.value(ActuatorChannel::Swash3), 0.0);
    }

    #[test]
    fn channel_ranges_and_mask_bits() {
        assert_eq!(ActuatorChannel::Throttle.range(), (0.0, 1.0));
        assert_eq!(ActuatorChannel::TailServo.range(), (-1.0, 1.0));
        assert_eq!(ActuatorChannel::Swash1.mask_bit(), 1);
        assert_eq!(ActuatorChannel::TailMotor.mask_bit(), 1 << 6);
        assert_eq!(ActuatorChannel::Throttle.mask_bit(), 1 << 7);
    }
}
