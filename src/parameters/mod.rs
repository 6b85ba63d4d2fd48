//! Parameter management
//!
//! This module carries the contract of the externally-owned configuration
//! persistence layer: a bounded in-memory [`ParameterStore`] plus per-subsystem
//! parameter blocks that load from it with range clamping.
//!
//! Persistence itself (flash blocks, ground-station protocol) is the owning
//! system's concern. This core only registers its defaults and reads values
//! back; an out-of-range value is clamped into its valid bounds, never
//! treated as fatal.
//!
//! # Parameter blocks
//!
//! - [`HeliParams`]: tail drive topology, gyro gains, collective-yaw
//!   feed-forward, flybar flag, swashplate servo count
//! - [`RscParams`]: rotor speed setpoint, spool ramp, critical speed,
//!   slow-start slew amplitude
//! - [`SysIdParams`]: excitation waveform and fault injection settings

pub mod error;
pub mod heli;
pub mod rsc;
pub mod storage;
pub mod sysid;

pub use error::ParameterError;
pub use heli::{HeliParams, TailType};
pub use rsc::RscParams;
pub use storage::{ParamFlags, ParamValue, ParameterStore, MAX_PARAMS, PARAM_NAME_LEN};
pub use sysid::SysIdParams;
