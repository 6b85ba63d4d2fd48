//! Rotor Speed Sequencer Parameter Definitions
//!
//! # Parameters
//!
//! - `H_RSC_SETPOINT` - Desired rotor speed in flight (0-1000)
//! - `H_RSC_RAMP_TIME` - Spool ramp duration, seconds
//! - `H_RSC_IDLE` - Ground idle output (0-1000)
//! - `H_RSC_SLEW_AMP` - Slow-start slew amplitude, percent of full range
//!   per tick
//!
//! The critical speed threshold is not configured here; it is reported each
//! tick by the rotor speed controller collaborator together with the
//! measured speed.

use super::error::ParameterError;
use super::storage::{ParamFlags, ParamValue, ParameterStore};

/// Default rotor speed setpoint (of 1000)
const DEFAULT_SETPOINT: i32 = 700;

/// Default spool ramp time in seconds
const DEFAULT_RAMP_TIME: f32 = 10.0;

/// Ramp time bounds in seconds
const MIN_RAMP_TIME: f32 = 0.5;
const MAX_RAMP_TIME: f32 = 60.0;

/// Slow-start slew amplitude bounds, percent per tick
const MIN_SLEW_AMP: f32 = 0.1;
const MAX_SLEW_AMP: f32 = 50.0;

/// Default slow-start slew amplitude, percent per tick
const DEFAULT_SLEW_AMP: f32 = 2.0;

/// Rotor speed sequencer parameters loaded from the parameter store
///
/// Speeds are normalized to [0,1] on load; the store keeps the
/// configuration surface's 0-1000 representation.
#[derive(Debug, Clone, Copy)]
pub struct RscParams {
    /// Desired rotor speed in flight, normalized [0,1]
    pub setpoint: f32,
    /// Spool ramp duration in seconds
    pub ramp_time_s: f32,
    /// Ground idle output, normalized [0,1]
    pub idle_output: f32,
    /// Slow-start slew amplitude, fraction of full range per tick
    pub slew_amplitude: f32,
}

impl Default for RscParams {
    fn default() -> Self {
        Self {
            setpoint: DEFAULT_SETPOINT as f32 / 1000.0,
            ramp_time_s: DEFAULT_RAMP_TIME,
            idle_output: 0.0,
            slew_amplitude: DEFAULT_SLEW_AMP / 100.0,
        }
    }
}

impl RscParams {
    /// Register sequencer parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        store.register(
            "H_RSC_SETPOINT",
            ParamValue::Int(DEFAULT_SETPOINT),
            ParamFlags::empty(),
        )?;
        store.register(
            "H_RSC_RAMP_TIME",
            ParamValue::Float(DEFAULT_RAMP_TIME),
            ParamFlags::empty(),
        )?;
        store.register("H_RSC_IDLE", ParamValue::Int(0), ParamFlags::empty())?;
        store.register(
            "H_RSC_SLEW_AMP",
            ParamValue::Float(DEFAULT_SLEW_AMP),
            ParamFlags::empty(),
        )?;
        Ok(())
    }

    /// Load sequencer parameters from the parameter store, clamping into
    /// valid bounds
    pub fn from_store(store: &ParameterStore) -> Self {
        let defaults = Self::default();

        let setpoint = store
            .get("H_RSC_SETPOINT")
            .map(|v| v.as_f32().clamp(0.0, 1000.0) / 1000.0)
            .unwrap_or(defaults.setpoint);

        let ramp_time_s = store
            .get("H_RSC_RAMP_TIME")
            .map(|v| v.as_f32().clamp(MIN_RAMP_TIME, MAX_RAMP_TIME))
            .unwrap_or(defaults.ramp_time_s);

        let idle_output = store
            .get("H_RSC_IDLE")
            .map(|v| v.as_f32().clamp(0.0, 1000.0) / 1000.0)
            .unwrap_or(defaults.idle_output);

        let slew_amplitude = store
            .get("H_RSC_SLEW_AMP")
            .map(|v| v.as_f32().clamp(MIN_SLEW_AMP, MAX_SLEW_AMP) / 100.0)
            .unwrap_or(defaults.slew_amplitude);

        Self {
            setpoint,
            ramp_time_s,
            idle_output,
            slew_amplitude,
        }
    }

    /// Validate sequencer parameters
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.setpoint)
            && (MIN_RAMP_TIME..=MAX_RAMP_TIME).contains(&self.ramp_time_s)
            && (0.0..=1.0).contains(&self.idle_output)
            && (MIN_SLEW_AMP / 100.0..=MAX_SLEW_AMP / 100.0).contains(&self.slew_amplitude)
    }
}
