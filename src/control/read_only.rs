//! Periodic readout without commands.

use embedded_hal::delay::DelayNs;
use tracing::debug;

use crate::demo::Demo;
use crate::device::{DeviceHandle, DeviceSession};
use crate::error::Result;
use crate::params::{ParamType, ParameterSchema, ParameterSet};
use crate::telemetry::TelemetryRecorder;

use super::tick::{LoopContext, LoopSummary, SessionOutcome, TickPeriod};
use super::ControlLoop;

const PERIOD: TickPeriod = TickPeriod::from_millis(100);

/// Reads the device every tick and reports the motor angle.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOnly {
    /// Ticks to run.
    pub loop_count: u32,
}

impl Demo for ReadOnly {
    const NAME: &'static str = "read_only";
    const SCHEMA: ParameterSchema = ParameterSchema::new(&[
        ("ports", ParamType::Sequence),
        ("baud_rate", ParamType::Integer),
        ("run_time", ParamType::Integer),
    ]);

    fn from_parameters(params: &ParameterSet) -> Result<Self> {
        let run_time = params.positive_integer("run_time")?;
        Ok(Self {
            loop_count: PERIOD.ticks_in(run_time as f64),
        })
    }
}

impl ControlLoop for ReadOnly {
    fn run<H: DeviceHandle, D: DelayNs>(
        &mut self,
        session: &mut DeviceSession<H>,
        ctx: &mut LoopContext<'_, D>,
        recorder: &mut TelemetryRecorder,
    ) -> Result<LoopSummary> {
        let mut ticker = ctx.ticker(PERIOD);
        for i in 0..self.loop_count {
            if ticker.should_stop() {
                break;
            }
            ticker.wait();
            if let Some(sample) = ticker.sample(session)? {
                debug!(
                    port = session.port(),
                    tick = i,
                    angle = sample.motor_angle,
                    current = sample.motor_current,
                    voltage = sample.motor_voltage,
                    "read"
                );
                // nothing is requested, the angle is logged against itself
                let angle = f64::from(sample.motor_angle);
                recorder.record(sample.time, angle, angle);
            }
        }
        Ok(ticker.finish(SessionOutcome::Completed))
    }
}
