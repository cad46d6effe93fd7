//! Two devices holding their initial positions side by side.

use embedded_hal::delay::DelayNs;
use tracing::{debug, info};

use crate::demo::Demo;
use crate::device::{ControlMode, DeviceHandle, DevicePair, DeviceSession};
use crate::error::Result;
use crate::params::{GainSet, ParamType, ParameterSchema, ParameterSet};
use crate::telemetry::TelemetryRecorder;

use super::tick::{LoopContext, LoopSummary, SessionOutcome, TickPeriod, Ticker};
use super::PairedLoop;

const PERIOD: TickPeriod = TickPeriod::from_millis(100);

/// Gains applied to both devices.
pub const DUAL_POSITION_GAINS: GainSet = GainSet::new(50, 3, 0, 0, 0, 0);

/// Position hold on two devices, read in the same tick.
#[derive(Debug, Clone, PartialEq)]
pub struct DualPosition {
    /// Ticks to run.
    pub loop_count: u32,
    /// Gains applied to both devices.
    pub gains: GainSet,
}

impl Demo for DualPosition {
    const NAME: &'static str = "two_devices_position_control";
    const SCHEMA: ParameterSchema = ParameterSchema::new(&[
        ("ports", ParamType::Sequence),
        ("baud_rate", ParamType::Integer),
        ("run_time", ParamType::Integer),
    ]);

    fn from_parameters(params: &ParameterSet) -> Result<Self> {
        let run_time = params.positive_integer("run_time")?;
        Ok(Self {
            loop_count: PERIOD.ticks_in(run_time as f64),
            gains: params.optional_gains("gains")?.unwrap_or(DUAL_POSITION_GAINS),
        })
    }
}

impl PairedLoop for DualPosition {
    fn run<H: DeviceHandle, D: DelayNs>(
        &mut self,
        pair: &mut DevicePair<H>,
        ctx: &mut LoopContext<'_, D>,
        first_log: &mut TelemetryRecorder,
        second_log: &mut TelemetryRecorder,
    ) -> Result<LoopSummary> {
        for session in [&mut pair.leader, &mut pair.follower] {
            session.setup_gains(&self.gains)?;
            let target = f64::from(session.initial_position());
            session.setup_command(ControlMode::Position, target)?;
            info!(port = session.port(), target, "holding position");
        }

        let mut ticker = ctx.ticker(PERIOD);
        for _ in 0..self.loop_count {
            if ticker.should_stop() {
                break;
            }
            ticker.wait();
            hold_tick(&mut ticker, &mut pair.leader, first_log)?;
            hold_tick(&mut ticker, &mut pair.follower, second_log)?;
        }

        Ok(ticker.finish(SessionOutcome::Completed))
    }
}

fn hold_tick<H: DeviceHandle, D: DelayNs>(
    ticker: &mut Ticker<'_, D>,
    session: &mut DeviceSession<H>,
    recorder: &mut TelemetryRecorder,
) -> Result<()> {
    if let Some(sample) = ticker.sample(session)? {
        let target = f64::from(session.initial_position());
        let measured = f64::from(sample.motor_angle);
        debug!(port = session.port(), target, measured, "position");
        recorder.record(sample.time, target, measured);
    }
    Ok(())
}
