//! Position hold at the angle found when the loop starts.

use embedded_hal::delay::DelayNs;
use tracing::{debug, info};

use crate::demo::Demo;
use crate::device::{ControlMode, DeviceHandle, DeviceSession};
use crate::error::Result;
use crate::params::{GainSet, ParamType, ParameterSchema, ParameterSet};
use crate::telemetry::TelemetryRecorder;

use super::tick::{LoopContext, LoopSummary, SessionOutcome, TickPeriod};
use super::ControlLoop;

const PERIOD: TickPeriod = TickPeriod::from_millis(100);
const SETTLE_MS: u32 = 500;

/// Holds the captured position and reports the drift from it.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionControl {
    /// Gains applied once before the loop.
    pub gains: GainSet,
    /// Ticks to run.
    pub loop_count: u32,
}

impl Demo for PositionControl {
    const NAME: &'static str = "position_control";
    const SCHEMA: ParameterSchema = ParameterSchema::new(&[
        ("ports", ParamType::Sequence),
        ("baud_rate", ParamType::Integer),
        ("run_time", ParamType::Integer),
        ("gains", ParamType::Mapping),
    ]);

    fn from_parameters(params: &ParameterSet) -> Result<Self> {
        let run_time = params.positive_integer("run_time")?;
        Ok(Self {
            gains: params.gains("gains")?,
            loop_count: PERIOD.ticks_in(run_time as f64),
        })
    }
}

impl ControlLoop for PositionControl {
    fn run<H: DeviceHandle, D: DelayNs>(
        &mut self,
        session: &mut DeviceSession<H>,
        ctx: &mut LoopContext<'_, D>,
        recorder: &mut TelemetryRecorder,
    ) -> Result<LoopSummary> {
        let target = f64::from(session.setup_read()?.motor_angle);
        session.setup_gains(&self.gains)?;
        session.setup_command(ControlMode::Position, target)?;
        info!(port = session.port(), target, "holding position");

        let mut ticker = ctx.ticker(PERIOD);
        for _ in 0..self.loop_count {
            if ticker.should_stop() {
                break;
            }
            ticker.wait();
            if let Some(sample) = ticker.sample(session)? {
                let measured = f64::from(sample.motor_angle);
                debug!(
                    port = session.port(),
                    target,
                    measured,
                    difference = measured - target,
                    "position"
                );
                recorder.record(sample.time, target, measured);
            }
        }

        ticker.command(session, ControlMode::None, 0.0)?;
        ticker.pause_ms(SETTLE_MS);
        Ok(ticker.finish(SessionOutcome::Completed))
    }
}
