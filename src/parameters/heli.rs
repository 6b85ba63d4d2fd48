//! Heli Mixer Parameter Definitions
//!
//! Defines the single-rotor frame parameters consumed by the scalar
//! calculator and mixer.
//!
//! # Parameters
//!
//! - `H_TAIL_TYPE` - Tail drive topology (0-5)
//! - `H_GYR_GAIN` - External gyro gain, normal flight (0-1000)
//! - `H_GYR_GAIN_ACRO` - External gyro gain in acro (0-1000, 0 = use normal)
//! - `H_COL_YAW` - Collective-to-yaw feed-forward gain (signed)
//! - `H_FLYBAR_MODE` - Mechanical flybar present
//! - `H_TAIL_SPEED` - Direct-drive variable-pitch tail motor speed (0-1000)
//! - `H_SW_COUNT` - Number of swashplate servos (1-3)

use super::error::ParameterError;
use super::storage::{ParamFlags, ParamValue, ParameterStore};

/// Default external gyro gain
const DEFAULT_EXT_GYRO_GAIN: i32 = 350;

/// Default direct-drive variable-pitch tail speed
const DEFAULT_TAIL_SPEED: i32 = 50;

/// Collective-yaw feed-forward gain magnitude limit
pub const COLYAW_RANGE: f32 = 10.0;

/// Maximum number of swashplate servos
pub const MAX_SWASH_SERVOS: usize = 3;

/// Tail drive topology
///
/// Exactly one topology is active; the integer codes are the wire values
/// used by the configuration surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TailType {
    /// Blade-pitch servo driven by the yaw mix
    #[default]
    Servo = 0,
    /// Blade-pitch servo plus an external gyro gain output
    ServoExtGyro = 1,
    /// Direct-drive tail motor with a variable-pitch servo
    DirectDriveVarPitch = 2,
    /// Direct-drive fixed-pitch tail motor, clockwise rotation
    DirectDriveFixedPitchCw = 3,
    /// Direct-drive fixed-pitch tail motor, counter-clockwise rotation
    DirectDriveFixedPitchCcw = 4,
    /// Direct-drive variable-pitch tail slaved to an external governor
    DirectDriveVarPitchExtGov = 5,
}

impl TailType {
    /// Decode the configuration surface's integer code.
    ///
    /// Unknown codes degrade to [`TailType::Servo`], the topology with the
    /// smallest actuator claim.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => TailType::ServoExtGyro,
            2 => TailType::DirectDriveVarPitch,
            3 => TailType::DirectDriveFixedPitchCw,
            4 => TailType::DirectDriveFixedPitchCcw,
            5 => TailType::DirectDriveVarPitchExtGov,
            _ => TailType::Servo,
        }
    }

    /// True for topologies with a direct-drive tail motor
    pub fn has_tail_motor(&self) -> bool {
        matches!(
            self,
            TailType::DirectDriveVarPitch
                | TailType::DirectDriveFixedPitchCw
                | TailType::DirectDriveFixedPitchCcw
                | TailType::DirectDriveVarPitchExtGov
        )
    }

    /// True for topologies with a tail blade-pitch servo
    pub fn has_tail_servo(&self) -> bool {
        !matches!(
            self,
            TailType::DirectDriveFixedPitchCw | TailType::DirectDriveFixedPitchCcw
        )
    }
}

/// Heli mixer parameters loaded from the parameter store
#[derive(Debug, Clone, Copy)]
pub struct HeliParams {
    /// Tail drive topology
    pub tail_type: TailType,
    /// External gyro gain, normal flight (0-1000)
    pub ext_gyro_gain: f32,
    /// External gyro gain in acro; 0 falls back to the normal gain
    pub ext_gyro_gain_acro: f32,
    /// Collective-to-yaw feed-forward gain, signed
    pub collective_yaw_gain: f32,
    /// Mechanical flybar present
    pub flybar: bool,
    /// Direct-drive variable-pitch tail motor speed (0-1000)
    pub tail_speed: f32,
    /// Number of swashplate servos (1-3)
    pub swash_servo_count: u8,
}

impl Default for HeliParams {
    fn default() -> Self {
        Self {
            tail_type: TailType::Servo,
            ext_gyro_gain: DEFAULT_EXT_GYRO_GAIN as f32,
            ext_gyro_gain_acro: 0.0,
            collective_yaw_gain: 0.0,
            flybar: false,
            tail_speed: DEFAULT_TAIL_SPEED as f32,
            swash_servo_count: MAX_SWASH_SERVOS as u8,
        }
    }
}

impl HeliParams {
    /// Register heli parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        store.register("H_TAIL_TYPE", ParamValue::Int(0), ParamFlags::empty())?;
        store.register(
            "H_GYR_GAIN",
            ParamValue::Int(DEFAULT_EXT_GYRO_GAIN),
            ParamFlags::empty(),
        )?;
        store.register("H_GYR_GAIN_ACRO", ParamValue::Int(0), ParamFlags::empty())?;
        store.register("H_COL_YAW", ParamValue::Float(0.0), ParamFlags::empty())?;
        store.register("H_FLYBAR_MODE", ParamValue::Bool(false), ParamFlags::empty())?;
        store.register(
            "H_TAIL_SPEED",
            ParamValue::Int(DEFAULT_TAIL_SPEED),
            ParamFlags::empty(),
        )?;
        store.register(
            "H_SW_COUNT",
            ParamValue::Int(MAX_SWASH_SERVOS as i32),
            ParamFlags::empty(),
        )?;
        Ok(())
    }

    /// Load heli parameters from the parameter store
    ///
    /// Out-of-range values are clamped into their valid bounds; a missing
    /// parameter reads as its default. Loading never fails.
    pub fn from_store(store: &ParameterStore) -> Self {
        let defaults = Self::default();

        let tail_type = store
            .get("H_TAIL_TYPE")
            .map(|v| TailType::from_code(v.as_i32()))
            .unwrap_or(defaults.tail_type);

        let ext_gyro_gain = store
            .get("H_GYR_GAIN")
            .map(|v| v.as_f32().clamp(0.0, 1000.0))
            .unwrap_or(defaults.ext_gyro_gain);

        let ext_gyro_gain_acro = store
            .get("H_GYR_GAIN_ACRO")
            .map(|v| v.as_f32().clamp(0.0, 1000.0))
            .unwrap_or(defaults.ext_gyro_gain_acro);

        let collective_yaw_gain = store
            .get("H_COL_YAW")
            .map(|v| v.as_f32().clamp(-COLYAW_RANGE, COLYAW_RANGE))
            .unwrap_or(defaults.collective_yaw_gain);

        let flybar = store
            .get("H_FLYBAR_MODE")
            .map(|v| v.as_bool())
            .unwrap_or(defaults.flybar);

        let tail_speed = store
            .get("H_TAIL_SPEED")
            .map(|v| v.as_f32().clamp(0.0, 1000.0))
            .unwrap_or(defaults.tail_speed);

        let swash_servo_count = store
            .get("H_SW_COUNT")
            .map(|v| v.as_i32().clamp(1, MAX_SWASH_SERVOS as i32) as u8)
            .unwrap_or(defaults.swash_servo_count);

        Self {
            tail_type,
            ext_gyro_gain,
            ext_gyro_gain_acro,
            collective_yaw_gain,
            flybar,
            tail_speed,
            swash_servo_count,
        }
    }

    /// Validate heli parameters
    pub fn is_valid(&self) -> bool {
        if !(0.0..=1000.0).contains(&self.ext_gyro_gain) {
            return false;
        }
        if !(0.0..=1000.0).contains(&self.ext_gyro_gain_acro) {
            return false;
        }
        if self.collective_yaw_gain.abs() > COLYAW_RANGE {
            return false;
        }
        if !(0.0..=1000.0).contains(&self.tail_speed) {
            return false;
        }
        if self.swash_servo_count == 0 || self.swash_servo_count > MAX_SWASH_SERVOS as u8 {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(HeliParams::default().is_valid());
    }

    #[test]
    fn tail_type_codes_round_trip() {
        assert_eq!(TailType::from_code(0), TailType::Servo);
        assert_eq!(TailType::from_code(1), TailType::ServoExtGyro);
        assert_eq!(TailType::from_code(2), TailType::DirectDriveVarPitch);
        assert_eq!(TailType::from_code(3), TailType::DirectDriveFixedPitchCw);
        assert_eq!(TailType::from_code(4), TailType::DirectDriveFixedPitchCcw);
        assert_eq!(TailType::from_code(5), TailType::DirectDriveVarPitchExtGov);
    }

    #[test]
    fn unknown_tail_type_degrades_to_servo() {
        assert_eq!(TailType::from_code(-1), TailType::Servo);
        assert_eq!(TailType::from_code(99), TailType::Servo);
    }

    #[test]
    fn tail_type_channel_claims() {
        assert!(TailType::Servo.has_tail_servo());
        assert!(!TailType::Servo.has_tail_motor());
        assert!(TailType::DirectDriveVarPitch.has_tail_servo());
        assert!(TailType::DirectDriveVarPitch.has_tail_motor());
        assert!(!TailType::DirectDriveFixedPitchCw.has_tail_servo());
        assert!(TailType::DirectDriveFixedPitchCcw.has_tail_motor());
    }

    #[test]
    fn from_store_clamps_out_of_range() {
        let mut store = ParameterStore::new();
        HeliParams::register_defaults(&mut store).unwrap();
        store.set("H_GYR_GAIN", ParamValue::Int(4000)).unwrap();
        store.set("H_COL_YAW", ParamValue::Float(-55.0)).unwrap();
        store.set("H_SW_COUNT", ParamValue::Int(7)).unwrap();

        let params = HeliParams::from_store(&store);
        assert_eq!(params.ext_gyro_gain, 1000.0);
        assert_eq!(params.collective_yaw_gain, -COLYAW_RANGE);
        assert_eq!(params.swash_servo_count, 3);
        assert!(params.is_valid());
    }

    #[test]
    fn from_store_reads_configured_topology() {
        let mut store = ParameterStore::new();
        HeliParams::register_defaults(&mut store).unwrap();
        store.set("H_TAIL_TYPE", ParamValue::Int(4)).unwrap();
        store.set("H_TAIL_SPEED", ParamValue::Int(600)).unwrap();

        let params = HeliParams::from_store(&store);
        assert_eq!(params.tail_type, TailType::DirectDriveFixedPitchCcw);
        assert_eq!(params.tail_speed, 600.0);
    }

    #[test]
    fn empty_store_yields_defaults() {
        let store = ParameterStore::new();
        let params = HeliParams::from_store(&store);
        assert_eq!(params.tail_type, TailType::Servo);
        assert_eq!(params.ext_gyro_gain, 350.0);
        assert_eq!(params.swash_servo_count, 3);
    }
}
