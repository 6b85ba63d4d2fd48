//! Output pipeline
//!
//! Final stage of the tick: clip every channel into its hardware-safe
//! range, hand the frame to the actuator transport, and report saturation
//! and rotor state to telemetry.
//!
//! The transport gets exactly one write per tick and no retries; a dropped
//! write self-corrects on the next tick because every frame is complete.
//! Telemetry is best-effort and must never block the tick.

pub mod servo_test;

pub use servo_test::{ServoTest, TestModeError};

use crate::mixer::{ActuatorFrame, SaturationFlags};
use crate::sequencer::RotorControlState;

/// Errors from the actuator transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Transport busy, frame not accepted this tick
    Busy,
    /// Output hardware fault
    HardwareFault,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransportError::Busy => write!(f, "actuator transport busy"),
            TransportError::HardwareFault => write!(f, "actuator hardware fault"),
        }
    }
}

/// Actuator transport collaborator
///
/// Carries one complete frame per tick to the servo/ESC outputs.
pub trait ActuatorTransport {
    fn write(&mut self, frame: &ActuatorFrame) -> Result<(), TransportError>;
}

/// Telemetry sink collaborator
pub trait TelemetrySink {
    /// Best-effort report; implementations must not block
    fn report(&mut self, saturation: SaturationFlags, state: RotorControlState);
}

/// Final clipping and transport stage
#[derive(Debug, Default)]
pub struct OutputPipeline;

impl OutputPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Clamp every channel into its hardware-safe range, flagging anything
    /// that had to move.
    ///
    /// The mixer and injector already clip what they touch; this is the
    /// last line before hardware and it assumes nothing about upstream.
    pub fn clip(frame: &mut ActuatorFrame) {
        for servo in frame.swash.iter_mut() {
            let clipped = servo.clamp(-1.0, 1.0);
            if clipped != *servo {
                frame.saturation |= SaturationFlags::SWASH;
                *servo = clipped;
            }
        }

        frame.tail_servo = frame.tail_servo.clamp(-1.0, 1.0);
        frame.tail_motor = frame.tail_motor.clamp(-1.0, 1.0);
        frame.ext_gyro = frame.ext_gyro.clamp(0.0, 1.0);

        let throttle = frame.throttle.clamp(0.0, 1.0);
        if throttle != frame.throttle {
            frame.saturation |= SaturationFlags::THROTTLE;
            frame.throttle = throttle;
        }
    }

    /// Clip and emit one frame.
    ///
    /// The transport write is not retried: a dropped output tick is
    /// acceptable and the next tick's frame supersedes it.
    pub fn emit(
        &mut self,
        frame: &mut ActuatorFrame,
        state: RotorControlState,
        transport: &mut dyn ActuatorTransport,
        telemetry: &mut dyn TelemetrySink,
    ) {
        Self::clip(frame);

        if transport.write(frame).is_err() {
            crate::log_warn!("actuator write dropped, next tick supersedes");
        }

        telemetry.report(frame.saturation, state);
    }
}
