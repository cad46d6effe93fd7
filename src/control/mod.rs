//! Control loop module for actuator-demos.
//!
//! One loop type per demo. Each is built from a validated parameter set,
//! then driven tick by tick against an opened [`DeviceSession`] (or a
//! [`DevicePair`] for the two-device demos).

mod current;
mod dual_position;
mod high_speed;
mod impedance;
mod leader_follower;
mod open;
mod position;
mod read_only;
mod state;
mod tick;
mod two_position;

pub use current::CurrentControl;
pub use dual_position::{DualPosition, DUAL_POSITION_GAINS};
pub use high_speed::{ControllerType, HighSpeed, WINDOWS_MAX_CMD_FREQ};
pub use impedance::{ImpedanceControl, ImpedanceState};
pub use leader_follower::{
    follower_target, LeaderFollower, DEFAULT_FOLLOWER_GAINS, DEFAULT_LEADER_GAINS,
};
pub use open::OpenControl;
pub use position::PositionControl;
pub use read_only::ReadOnly;
pub use state::LoopState;
pub use tick::{
    LoopContext, LoopSummary, SessionOutcome, TickOutcome, TickPeriod, Ticker,
    DEFAULT_MAX_CONSECUTIVE_ERRORS,
};
pub use two_position::{TargetPair, TwoPositionControl};

use embedded_hal::delay::DelayNs;

use crate::device::{DeviceHandle, DevicePair, DeviceSession};
use crate::error::Result;
use crate::telemetry::TelemetryRecorder;

/// A loop run once per configured port.
pub trait ControlLoop {
    /// Whether the operator confirms before each port is opened.
    fn confirms_each_port(&self) -> bool {
        true
    }

    /// Drive `session` until the loop ends.
    ///
    /// Setup failures abort with an error; the caller still owns the
    /// session and closes it.
    fn run<H: DeviceHandle, D: DelayNs>(
        &mut self,
        session: &mut DeviceSession<H>,
        ctx: &mut LoopContext<'_, D>,
        recorder: &mut TelemetryRecorder,
    ) -> Result<LoopSummary>;
}

/// A loop driving exactly two devices in lock-step.
pub trait PairedLoop {
    /// Drive both devices until the loop ends.
    fn run<H: DeviceHandle, D: DelayNs>(
        &mut self,
        pair: &mut DevicePair<H>,
        ctx: &mut LoopContext<'_, D>,
        leader: &mut TelemetryRecorder,
        follower: &mut TelemetryRecorder,
    ) -> Result<LoopSummary>;
}
