//! Current control: hold a current, then ramp it back to zero.

use embedded_hal::delay::DelayNs;
use tracing::{debug, info};

use crate::demo::Demo;
use crate::device::{ControlMode, DeviceHandle, DeviceSession};
use crate::error::Result;
use crate::params::{GainSet, ParamType, ParameterSchema, ParameterSet};
use crate::signal::ramp_down_currents;
use crate::telemetry::TelemetryRecorder;

use super::tick::{LoopContext, LoopSummary, SessionOutcome, TickPeriod, Ticker};
use super::ControlLoop;

const PERIOD: TickPeriod = TickPeriod::from_millis(100);
const SETTLE_MS: u32 = 500;

/// Holds `hold_current` for the run time, then steps it down to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentControl {
    /// Gains applied once before the loop.
    pub gains: GainSet,
    /// Ticks at the held current.
    pub loop_count: u32,
    /// Held current (mA).
    pub hold_current: f64,
    /// Extra ticks used to reach zero.
    pub ramp_down_steps: u32,
}

impl Demo for CurrentControl {
    const NAME: &'static str = "current_control";
    const SCHEMA: ParameterSchema = ParameterSchema::new(&[
        ("ports", ParamType::Sequence),
        ("baud_rate", ParamType::Integer),
        ("run_time", ParamType::Integer),
        ("gains", ParamType::Mapping),
        ("hold_current", ParamType::Integer),
        ("ramp_down_steps", ParamType::Integer),
    ]);

    fn from_parameters(params: &ParameterSet) -> Result<Self> {
        let run_time = params.positive_integer("run_time")?;
        Ok(Self {
            gains: params.gains("gains")?,
            loop_count: PERIOD.ticks_in(run_time as f64),
            hold_current: params.integer("hold_current")? as f64,
            ramp_down_steps: params.positive_count("ramp_down_steps")?,
        })
    }
}

impl ControlLoop for CurrentControl {
    fn run<H: DeviceHandle, D: DelayNs>(
        &mut self,
        session: &mut DeviceSession<H>,
        ctx: &mut LoopContext<'_, D>,
        recorder: &mut TelemetryRecorder,
    ) -> Result<LoopSummary> {
        session.setup_gains(&self.gains)?;
        ctx.pause_ms(SETTLE_MS);

        let mut ticker = ctx.ticker(PERIOD);
        info!(port = session.port(), current = self.hold_current, "holding current");
        for _ in 0..self.loop_count {
            if ticker.should_stop() {
                break;
            }
            current_tick(&mut ticker, session, recorder, self.hold_current)?;
        }

        if !ticker.should_stop() {
            session.begin_ramp_down();
            info!(port = session.port(), steps = self.ramp_down_steps, "ramping down");
            for target in ramp_down_currents(self.hold_current, self.ramp_down_steps) {
                if ticker.should_stop() {
                    break;
                }
                current_tick(&mut ticker, session, recorder, target)?;
            }
        }

        ticker.command(session, ControlMode::None, 0.0)?;
        ticker.pause_ms(SETTLE_MS);
        Ok(ticker.finish(SessionOutcome::Completed))
    }
}

fn current_tick<H: DeviceHandle, D: DelayNs>(
    ticker: &mut Ticker<'_, D>,
    session: &mut DeviceSession<H>,
    recorder: &mut TelemetryRecorder,
    requested: f64,
) -> Result<()> {
    ticker.command(session, ControlMode::Current, requested)?;
    ticker.wait();
    if let Some(sample) = ticker.sample(session)? {
        let measured = f64::from(sample.motor_current);
        debug!(
            port = session.port(),
            requested,
            measured,
            error = measured - requested,
            "current"
        );
        recorder.record(sample.time, requested, measured);
    }
    Ok(())
}
