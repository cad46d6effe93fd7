//! Open-loop voltage ramps.

use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use tracing::{debug, info};

use crate::demo::Demo;
use crate::device::{ControlMode, DeviceHandle, DeviceSession};
use crate::error::Result;
use crate::params::{ParamType, ParameterSchema, ParameterSet};
use crate::signal::ramp_voltages;
use crate::telemetry::TelemetryRecorder;

use super::tick::{LoopContext, LoopSummary, SessionOutcome, TickPeriod, Ticker};
use super::ControlLoop;

const PERIOD: TickPeriod = TickPeriod::from_millis(100);
const SETTLE_MS: u32 = 500;
const RELEASE_MS: u32 = 100;

/// Ramps the voltage down and back up `cycles` times. No feedback.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenControl {
    /// Ramp repetitions.
    pub cycles: u32,
    /// Voltage plan for one half cycle (mV).
    pub voltages: Vec<f64>,
}

impl Demo for OpenControl {
    const NAME: &'static str = "open_control";
    const SCHEMA: ParameterSchema = ParameterSchema::new(&[
        ("ports", ParamType::Sequence),
        ("baud_rate", ParamType::Integer),
        ("run_time", ParamType::Integer),
        ("n_cycles", ParamType::Integer),
        ("max_voltage", ParamType::Integer),
    ]);

    fn from_parameters(params: &ParameterSet) -> Result<Self> {
        let run_time = params.positive_integer("run_time")?;
        let cycles = params.positive_count("n_cycles")?;
        let max_voltage = params.integer("max_voltage")?;
        Ok(Self {
            cycles,
            voltages: ramp_voltages(run_time as f64, i64::from(cycles), max_voltage as f64)?,
        })
    }
}

impl ControlLoop for OpenControl {
    fn run<H: DeviceHandle, D: DelayNs>(
        &mut self,
        session: &mut DeviceSession<H>,
        ctx: &mut LoopContext<'_, D>,
        recorder: &mut TelemetryRecorder,
    ) -> Result<LoopSummary> {
        session.setup_command(ControlMode::Voltage, 0.0)?;
        ctx.pause_ms(SETTLE_MS);

        let mut ticker = ctx.ticker(PERIOD);
        'cycles: for cycle in 0..self.cycles {
            info!(port = session.port(), cycle, "ramping voltage up");
            for &voltage in self.voltages.iter() {
                if ticker.should_stop() {
                    break 'cycles;
                }
                voltage_tick(&mut ticker, session, recorder, voltage)?;
            }
            info!(port = session.port(), cycle, "ramping voltage down");
            for &voltage in self.voltages.iter().rev() {
                if ticker.should_stop() {
                    break 'cycles;
                }
                voltage_tick(&mut ticker, session, recorder, voltage)?;
            }
            recorder.mark_cycle(ticker.elapsed());
        }

        ticker.command(session, ControlMode::None, 0.0)?;
        ticker.pause_ms(RELEASE_MS);
        Ok(ticker.finish(SessionOutcome::Completed))
    }
}

fn voltage_tick<H: DeviceHandle, D: DelayNs>(
    ticker: &mut Ticker<'_, D>,
    session: &mut DeviceSession<H>,
    recorder: &mut TelemetryRecorder,
    requested: f64,
) -> Result<()> {
    ticker.wait();
    ticker.command(session, ControlMode::Voltage, requested)?;
    if let Some(sample) = ticker.sample(session)? {
        let measured = f64::from(sample.motor_voltage);
        debug!(
            port = session.port(),
            requested,
            measured,
            angle = sample.motor_angle,
            "voltage"
        );
        recorder.record(sample.time, requested, measured);
    }
    Ok(())
}
