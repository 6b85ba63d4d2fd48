//! System Identification Parameter Definitions
//!
//! Excitation and fault-injection settings for the identification harness.
//!
//! # Parameters
//!
//! - `SID_ENABLE` - Enable excitation injection
//! - `SID_WAVEFORM` - Waveform (0 = sine, 1 = chirp)
//! - `SID_AMPLITUDE` - Excitation amplitude, normalized output units
//! - `SID_PERIOD` - Sine period, seconds
//! - `SID_F_START` / `SID_F_STOP` - Chirp sweep frequencies, Hz
//! - `SID_T_SWEEP` - Chirp sweep duration, seconds
//! - `SID_CHIRP_HOLD` - Hold at the terminal frequency (else restart)
//! - `SID_CHANNEL` - Excitation output channel (0-5)
//! - `FAULT_ENABLE` - Enable output degradation (volatile)
//! - `FAULT_PCT` - Fault fraction, 0-1 (volatile)
//! - `FAULT_CHANNEL` - Degraded output channel (0-5, volatile)
//! - `FAULT_SEED` - Random seed for reproducible fault runs (volatile)
//!
//! The fault parameters are registered volatile: the fault model is a test
//! fixture and must never survive a reset.

use super::error::ParameterError;
use super::storage::{ParamFlags, ParamValue, ParameterStore};
use crate::injection::Waveform;
use crate::mixer::ActuatorChannel;

/// Default excitation amplitude, normalized output units
const DEFAULT_AMPLITUDE: f32 = 0.05;

/// Excitation amplitude bound; larger offsets are a flight-safety risk
const MAX_AMPLITUDE: f32 = 0.5;

/// Sine period bounds, seconds
const MIN_PERIOD: f32 = 0.05;
const MAX_PERIOD: f32 = 60.0;

/// Chirp frequency bounds, Hz
const MIN_FREQ: f32 = 0.01;
const MAX_FREQ: f32 = 100.0;

/// Chirp sweep duration bounds, seconds
const MIN_SWEEP: f32 = 1.0;
const MAX_SWEEP: f32 = 120.0;

/// System identification parameters loaded from the parameter store
#[derive(Debug, Clone, Copy)]
pub struct SysIdParams {
    /// Excitation injection enabled
    pub excitation_enabled: bool,
    /// Excitation waveform
    pub waveform: Waveform,
    /// Excitation amplitude, normalized output units
    pub amplitude: f32,
    /// Sine period, seconds
    pub period_s: f32,
    /// Chirp start frequency, Hz
    pub f_start_hz: f32,
    /// Chirp terminal frequency, Hz
    pub f_stop_hz: f32,
    /// Chirp sweep duration, seconds
    pub sweep_time_s: f32,
    /// Hold at the terminal frequency when the sweep elapses (else restart)
    pub chirp_hold: bool,
    /// Excitation output channel
    pub channel: ActuatorChannel,
    /// Fault injection enabled
    pub fault_enabled: bool,
    /// Fault fraction [0,1]
    pub fault_fraction: f32,
    /// Degraded output channel
    pub fault_channel: ActuatorChannel,
    /// Random seed for reproducible fault runs
    pub fault_seed: u64,
}

impl Default for SysIdParams {
    fn default() -> Self {
        Self {
            excitation_enabled: false,
            waveform: Waveform::Sine,
            amplitude: DEFAULT_AMPLITUDE,
            period_s: 1.0,
            f_start_hz: 0.5,
            f_stop_hz: 10.0,
            sweep_time_s: 20.0,
            chirp_hold: true,
            channel: ActuatorChannel::TailServo,
            fault_enabled: false,
            fault_fraction: 0.0,
            fault_channel: ActuatorChannel::TailServo,
            fault_seed: 1,
        }
    }
}

impl SysIdParams {
    /// Register system identification parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        store.register("SID_ENABLE", ParamValue::Bool(false), ParamFlags::empty())?;
        store.register("SID_WAVEFORM", ParamValue::Int(0), ParamFlags::empty())?;
        store.register(
            "SID_AMPLITUDE",
            ParamValue::Float(DEFAULT_AMPLITUDE),
            ParamFlags::empty(),
        )?;
        store.register("SID_PERIOD", ParamValue::Float(1.0), ParamFlags::empty())?;
        store.register("SID_F_START", ParamValue::Float(0.5), ParamFlags::empty())?;
        store.register("SID_F_STOP", ParamValue::Float(10.0), ParamFlags::empty())?;
        store.register("SID_T_SWEEP", ParamValue::Float(20.0), ParamFlags::empty())?;
        store.register("SID_CHIRP_HOLD", ParamValue::Bool(true), ParamFlags::empty())?;
        store.register(
            "SID_CHANNEL",
            ParamValue::Int(ActuatorChannel::TailServo as i32),
            ParamFlags::empty(),
        )?;
        store.register("FAULT_ENABLE", ParamValue::Bool(false), ParamFlags::VOLATILE)?;
        store.register("FAULT_PCT", ParamValue::Float(0.0), ParamFlags::VOLATILE)?;
        store.register(
            "FAULT_CHANNEL",
            ParamValue::Int(ActuatorChannel::TailServo as i32),
            ParamFlags::VOLATILE,
        )?;
        store.register("FAULT_SEED", ParamValue::Int(1), ParamFlags::VOLATILE)?;
        Ok(())
    }

    /// Load system identification parameters from the parameter store,
    /// clamping into valid bounds
    pub fn from_store(store: &ParameterStore) -> Self {
        let defaults = Self::default();

        let excitation_enabled = store
            .get("SID_ENABLE")
            .map(|v| v.as_bool())
            .unwrap_or(defaults.excitation_enabled);

        let waveform = store
            .get("SID_WAVEFORM")
            .map(|v| Waveform::from_code(v.as_i32()))
            .unwrap_or(defaults.waveform);

        let amplitude = store
            .get("SID_AMPLITUDE")
            .map(|v| v.as_f32().clamp(0.0, MAX_AMPLITUDE))
            .unwrap_or(defaults.amplitude);

        let period_s = store
            .get("SID_PERIOD")
            .map(|v| v.as_f32().clamp(MIN_PERIOD, MAX_PERIOD))
            .unwrap_or(defaults.period_s);

        let f_start_hz = store
            .get("SID_F_START")
            .map(|v| v.as_f32().clamp(MIN_FREQ, MAX_FREQ))
            .unwrap_or(defaults.f_start_hz);

        // A terminal frequency below the start frequency reads as a flat
        // sweep rather than an error
        let f_stop_hz = store
            .get("SID_F_STOP")
            .map(|v| v.as_f32().clamp(MIN_FREQ, MAX_FREQ).max(f_start_hz))
            .unwrap_or(defaults.f_stop_hz);

        let sweep_time_s = store
            .get("SID_T_SWEEP")
            .map(|v| v.as_f32().clamp(MIN_SWEEP, MAX_SWEEP))
            .unwrap_or(defaults.sweep_time_s);

        let chirp_hold = store
            .get("SID_CHIRP_HOLD")
            .map(|v| v.as_bool())
            .unwrap_or(defaults.chirp_hold);

        let channel = store
            .get("SID_CHANNEL")
            .map(|v| ActuatorChannel::from_code(v.as_i32()))
            .unwrap_or(defaults.channel);

        let fault_enabled = store
            .get("FAULT_ENABLE")
            .map(|v| v.as_bool())
            .unwrap_or(defaults.fault_enabled);

        let fault_fraction = store
            .get("FAULT_PCT")
            .map(|v| v.as_f32().clamp(0.0, 1.0))
            .unwrap_or(defaults.fault_fraction);

        let fault_channel = store
            .get("FAULT_CHANNEL")
            .map(|v| ActuatorChannel::from_code(v.as_i32()))
            .unwrap_or(defaults.fault_channel);

        let fault_seed = store
            .get("FAULT_SEED")
            .map(|v| v.as_i32() as u64)
            .unwrap_or(defaults.fault_seed);

        Self {
            excitation_enabled,
            waveform,
            amplitude,
            period_s,
            f_start_hz,
            f_stop_hz,
            sweep_time_s,
            chirp_hold,
            channel,
            fault_enabled,
            fault_fraction,
            fault_channel,
            fault_seed,
        }
    }

    /// Validate system identification parameters
    pub fn is_valid(&self) -> bool {
        (0.0..=MAX_AMPLITUDE).contains(&self.amplitude)
            && (MIN_PERIOD..=MAX_PERIOD).contains(&self.period_s)
            && self.f_start_hz <= self.f_stop_hz
            && (MIN_SWEEP..=MAX_SWEEP).contains(&self.sweep_time_s)
            && (0.0..=1.0).contains(&self.fault_fraction)
    }
}
