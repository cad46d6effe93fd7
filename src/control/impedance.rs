//! Impedance control with a stiffness schedule.
//!
//! The target alternates between two stored positions. At every transition
//! the stiffness is raised by a fixed step and the gains are re-applied
//! before the other target is commanded. The distance between the target
//! being left and the measured position is kept as the tracking delta.

use embedded_hal::delay::DelayNs;
use tracing::{debug, info};

use crate::demo::Demo;
use crate::device::{ControlMode, DeviceHandle, DeviceSession};
use crate::error::Result;
use crate::params::{GainSet, ParamType, ParameterSchema, ParameterSet};
use crate::telemetry::TelemetryRecorder;

use super::tick::{LoopContext, LoopSummary, SessionOutcome, TickPeriod};
use super::two_position::{transition_steps, TargetPair};
use super::ControlLoop;

const PERIOD: TickPeriod = TickPeriod::from_millis(20);
const SETTLE_MS: u32 = 400;

/// Mutable part of the impedance loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpedanceState {
    /// Gains currently applied.
    pub gains: GainSet,
    /// Stored targets.
    pub targets: TargetPair,
    /// Distance between the last target left and the measured position.
    pub delta: f64,
    /// Transitions performed.
    pub transitions: u32,
}

impl ImpedanceState {
    /// Start at `initial` with targets `initial` and `initial + delta`.
    pub fn new(initial: f64, delta: f64, gains: GainSet) -> Self {
        Self {
            gains,
            targets: TargetPair::new(initial, delta),
            delta,
            transitions: 0,
        }
    }

    /// Active target.
    #[inline]
    pub fn target(&self) -> f64 {
        self.targets.target()
    }

    /// Perform one transition given the position just measured.
    ///
    /// Returns the new target.
    pub fn transition(&mut self, measured: f64, stiffness_step: i32) -> f64 {
        self.gains = self.gains.with_stiffness_step(stiffness_step);
        self.delta = libm::fabs(self.targets.target() - measured);
        self.transitions += 1;
        self.targets.toggle()
    }
}

/// Impedance loop parameters and the state of the last run.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpedanceControl {
    /// Initial gains.
    pub gains: GainSet,
    /// Ticks to run.
    pub loop_count: u32,
    /// Ticks between transitions.
    pub transition_steps: u32,
    /// Initial distance between the targets (ticks).
    pub delta: f64,
    /// Stiffness added at every transition.
    pub stiffness_step: i32,
    last_state: Option<ImpedanceState>,
}

impl ImpedanceControl {
    /// State at the end of the last run.
    pub fn last_state(&self) -> Option<&ImpedanceState> {
        self.last_state.as_ref()
    }
}

impl Demo for ImpedanceControl {
    const NAME: &'static str = "impedance_control";
    const SCHEMA: ParameterSchema = ParameterSchema::new(&[
        ("ports", ParamType::Sequence),
        ("baud_rate", ParamType::Integer),
        ("run_time", ParamType::Integer),
        ("gains", ParamType::Mapping),
        ("transition_time", ParamType::Float),
        ("delta", ParamType::Integer),
        ("b_increments", ParamType::Integer),
    ]);

    fn from_parameters(params: &ParameterSet) -> Result<Self> {
        let run_time = params.positive_integer("run_time")?;
        let step = params.integer("b_increments")?;
        Ok(Self {
            gains: params.gains("gains")?,
            loop_count: PERIOD.ticks_in(run_time as f64),
            transition_steps: transition_steps(PERIOD, params)?,
            delta: params.integer("delta")? as f64,
            stiffness_step: i32::try_from(step)
                .map_err(|_| crate::params::value::invalid("b_increments", "out of range"))?,
            last_state: None,
        })
    }
}

impl ControlLoop for ImpedanceControl {
    fn run<H: DeviceHandle, D: DelayNs>(
        &mut self,
        session: &mut DeviceSession<H>,
        ctx: &mut LoopContext<'_, D>,
        recorder: &mut TelemetryRecorder,
    ) -> Result<LoopSummary> {
        let initial = f64::from(session.setup_read()?.motor_angle);
        let mut state = ImpedanceState::new(initial, self.delta, self.gains);
        session.setup_command(ControlMode::Impedance, state.target())?;
        session.setup_gains(&state.gains)?;
        ctx.pause_ms(SETTLE_MS);

        let mut ticker = ctx.ticker(PERIOD);
        let mut measured = initial;
        for i in 0..self.loop_count {
            if ticker.should_stop() {
                break;
            }
            let sample = ticker.sample(session)?;
            if let Some(s) = sample {
                measured = f64::from(s.motor_angle);
            }

            if i % self.transition_steps == 0 {
                let target = state.transition(measured, self.stiffness_step);
                ticker.apply_gains(session, &state.gains)?;
                ticker.command(session, ControlMode::Impedance, target)?;
                info!(
                    port = session.port(),
                    target,
                    stiffness = state.gains.stiffness,
                    delta = state.delta,
                    "impedance transition"
                );
            }

            ticker.wait();
            if let Some(s) = sample {
                debug!(port = session.port(), target = state.target(), measured, "impedance");
                recorder.record(s.time, state.target(), measured);
            }
        }

        self.last_state = Some(state);
        ticker.command(session, ControlMode::Voltage, 0.0)?;
        Ok(ticker.finish(SessionOutcome::Completed))
    }
}
