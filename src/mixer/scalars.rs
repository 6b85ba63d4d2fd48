//! Mixing scalar calculation
//!
//! Derives the static and armed-state-dependent coefficients the mixer
//! consumes from the raw configuration. Recalculation happens on
//! configuration load and on every armed transition; the per-tick mix only
//! reads the cached result.
//!
//! Invalid configuration degrades to a safe value (zero feed-forward,
//! servo-only tail) instead of failing: the control loop must keep running
//! on whatever it was given.

use crate::parameters::heli::{HeliParams, TailType, COLYAW_RANGE, MAX_SWASH_SERVOS};

/// Tail rotor rotation direction for fixed-pitch direct drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

/// Resolved tail drive, carrying only the fields its variant uses
///
/// This is the topology after configuration decoding: gains and speeds are
/// normalized, fallbacks applied, and fields that do not apply to the
/// active topology do not exist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TailDrive {
    /// Blade-pitch servo driven by the yaw mix
    Servo,
    /// Blade-pitch servo plus an external gyro gain output.
    ///
    /// Gains are normalized to [0,1]. An unset acro gain falls back to the
    /// normal gain at resolve time, so the mixer never re-checks.
    ServoExtGyro { gain: f32, gain_acro: f32 },
    /// Direct-drive tail motor at a fixed target speed, plus a
    /// variable-pitch servo driven by the yaw mix
    VarPitch { target_speed: f32 },
    /// Direct-drive fixed-pitch tail motor; the yaw mix drives motor speed
    FixedPitch { direction: Rotation },
    /// Direct-drive variable-pitch tail slaved to an external governor
    /// reference supplied by the rotor speed controller
    VarPitchExtGov,
}

impl TailDrive {
    fn resolve(params: &HeliParams) -> Self {
        match params.tail_type {
            TailType::Servo => TailDrive::Servo,
            TailType::ServoExtGyro => {
                let gain = params.ext_gyro_gain.clamp(0.0, 1000.0) / 1000.0;
                let gain_acro = if params.ext_gyro_gain_acro > 0.0 {
                    params.ext_gyro_gain_acro.clamp(0.0, 1000.0) / 1000.0
                } else {
                    gain
                };
                TailDrive::ServoExtGyro { gain, gain_acro }
            }
            TailType::DirectDriveVarPitch => TailDrive::VarPitch {
                target_speed: params.tail_speed.clamp(0.0, 1000.0) / 1000.0,
            },
            TailType::DirectDriveFixedPitchCw => TailDrive::FixedPitch {
                direction: Rotation::Clockwise,
            },
            TailType::DirectDriveFixedPitchCcw => TailDrive::FixedPitch {
                direction: Rotation::CounterClockwise,
            },
            TailType::DirectDriveVarPitchExtGov => TailDrive::VarPitchExtGov,
        }
    }
}

/// Cached mixing coefficients
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixerScalars {
    /// Resolved tail drive topology
    pub tail_drive: TailDrive,
    /// Collective-to-yaw feed-forward gain; exactly zero while disarmed
    pub collective_yaw_gain: f32,
    /// Mechanical flybar present
    pub flybar: bool,
    /// Number of swashplate servos in use (1-3)
    pub swash_servo_count: u8,
}

impl MixerScalars {
    /// Recalculate all scalars from configuration (boot or explicit reload).
    ///
    /// Equivalent to [`MixerScalars::recalculate_armed`] with
    /// `armed = false`: the feed-forward term stays zero until the vehicle
    /// arms, to avoid yaw drift during ground handling.
    pub fn recalculate(params: &HeliParams) -> Self {
        Self::recalculate_armed(params, false)
    }

    /// Recalculate scalars that depend on the armed state.
    ///
    /// Out-of-range configuration is clamped into valid bounds; this never
    /// fails.
    pub fn recalculate_armed(params: &HeliParams, armed: bool) -> Self {
        let collective_yaw_gain = if armed {
            params.collective_yaw_gain.clamp(-COLYAW_RANGE, COLYAW_RANGE)
        } else {
            0.0
        };

        Self {
            tail_drive: TailDrive::resolve(params),
            collective_yaw_gain,
            flybar: params.flybar,
            swash_servo_count: params.swash_servo_count.clamp(1, MAX_SWASH_SERVOS as u8),
        }
    }
}
