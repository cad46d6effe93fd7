//! Alternation between two fixed positions.

use embedded_hal::delay::DelayNs;
use tracing::{debug, info};

use crate::demo::Demo;
use crate::device::{ControlMode, DeviceHandle, DeviceSession};
use crate::error::Result;
use crate::params::value::invalid;
use crate::params::{GainSet, ParamType, ParameterSchema, ParameterSet};
use crate::telemetry::TelemetryRecorder;

use super::tick::{LoopContext, LoopSummary, SessionOutcome, TickPeriod};
use super::ControlLoop;

const PERIOD: TickPeriod = TickPeriod::from_millis(100);

/// Two stored targets and which one is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPair {
    positions: [f64; 2],
    index: usize,
}

impl TargetPair {
    /// Targets `initial` and `initial + delta`, starting at `initial`.
    pub fn new(initial: f64, delta: f64) -> Self {
        Self {
            positions: [initial, initial + delta],
            index: 0,
        }
    }

    /// Active target.
    #[inline]
    pub fn target(&self) -> f64 {
        self.positions[self.index]
    }

    /// Both stored targets.
    #[inline]
    pub fn positions(&self) -> [f64; 2] {
        self.positions
    }

    /// Switch to the other target and return it.
    pub fn toggle(&mut self) -> f64 {
        self.index ^= 1;
        self.target()
    }
}

/// Ticks between transitions for a transition time in seconds.
pub(crate) fn transition_steps(period: TickPeriod, params: &ParameterSet) -> Result<u32> {
    let steps = period.ticks_in(params.float("transition_time")?);
    if steps == 0 {
        return Err(invalid("transition_time", "shorter than one tick"));
    }
    Ok(steps)
}

/// Position control that switches target every `transition_steps` ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoPositionControl {
    /// Gains applied once before the loop.
    pub gains: GainSet,
    /// Ticks to run.
    pub loop_count: u32,
    /// Ticks between target switches.
    pub transition_steps: u32,
    /// Distance between the two targets (ticks).
    pub delta: f64,
}

impl Demo for TwoPositionControl {
    const NAME: &'static str = "two_position_control";
    const SCHEMA: ParameterSchema = ParameterSchema::new(&[
        ("ports", ParamType::Sequence),
        ("baud_rate", ParamType::Integer),
        ("run_time", ParamType::Integer),
        ("delta", ParamType::Integer),
        ("transition_time", ParamType::Float),
        ("gains", ParamType::Mapping),
    ]);

    fn from_parameters(params: &ParameterSet) -> Result<Self> {
        let run_time = params.positive_integer("run_time")?;
        Ok(Self {
            gains: params.gains("gains")?,
            loop_count: PERIOD.ticks_in(run_time as f64),
            transition_steps: transition_steps(PERIOD, params)?,
            delta: params.integer("delta")? as f64,
        })
    }
}

impl ControlLoop for TwoPositionControl {
    fn run<H: DeviceHandle, D: DelayNs>(
        &mut self,
        session: &mut DeviceSession<H>,
        ctx: &mut LoopContext<'_, D>,
        recorder: &mut TelemetryRecorder,
    ) -> Result<LoopSummary> {
        let initial = f64::from(session.setup_read()?.motor_angle);
        let mut targets = TargetPair::new(initial, self.delta);
        session.setup_gains(&self.gains)?;
        session.setup_command(ControlMode::Position, targets.target())?;

        let mut ticker = ctx.ticker(PERIOD);
        for i in 0..self.loop_count {
            if ticker.should_stop() {
                break;
            }
            ticker.wait();
            let sample = ticker.sample(session)?;
            if i % self.transition_steps == 0 {
                let next = targets.toggle();
                info!(port = session.port(), target = next, "switching target");
                ticker.command(session, ControlMode::Position, next)?;
            }
            if let Some(sample) = sample {
                let measured = f64::from(sample.motor_angle);
                debug!(port = session.port(), target = targets.target(), measured, "position");
                recorder.record(sample.time, targets.target(), measured);
            }
        }

        ticker.command(session, ControlMode::Voltage, 0.0)?;
        Ok(ticker.finish(SessionOutcome::Completed))
    }
}
