//! High-rate streaming of a precomputed command table.

use alloc::vec::Vec;
use core::str::FromStr;

use embedded_hal::delay::DelayNs;
use tracing::{debug, info, warn};

use crate::demo::Demo;
use crate::device::{ControlMode, DeviceHandle, DeviceSession};
use crate::error::{bounded, Error, Result, UnsupportedError};
use crate::params::value::invalid;
use crate::params::{GainSet, ParamType, ParameterSchema, ParameterSet};
use crate::signal::{generate, SignalKind};
use crate::telemetry::{Sample, TelemetryRecorder};

use super::tick::{LoopContext, LoopSummary, SessionOutcome, TickPeriod};
use super::ControlLoop;

/// Highest command frequency honored on Windows hosts.
pub const WINDOWS_MAX_CMD_FREQ: u32 = 100;

const OFFSET_SETTLE_MS: u32 = 100;
const RELEASE_MS: u32 = 100;

/// Controller the command table is streamed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerType {
    /// Table values are positions relative to the starting angle.
    Position,
    /// Table values are currents.
    Current,
}

impl ControllerType {
    /// Device mode used for commands.
    pub fn mode(self) -> ControlMode {
        match self {
            ControllerType::Position => ControlMode::Position,
            ControllerType::Current => ControlMode::Current,
        }
    }

    /// Measured value comparable to a table entry.
    pub fn measure(self, sample: &Sample, offset: f64) -> f64 {
        match self {
            ControllerType::Position => f64::from(sample.motor_angle) - offset,
            ControllerType::Current => f64::from(sample.motor_current),
        }
    }
}

impl FromStr for ControllerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "position" => Ok(ControllerType::Position),
            "current" => Ok(ControllerType::Current),
            other => Err(UnsupportedError::Controller(bounded(other)).into()),
        }
    }
}

/// Streams a sine or line table `n_loops` times at `cmd_freq`.
#[derive(Debug, Clone, PartialEq)]
pub struct HighSpeed {
    /// Controller receiving the table.
    pub controller: ControllerType,
    /// Shape of the table.
    pub signal: SignalKind,
    /// Command table, one entry per tick.
    pub samples: Vec<f64>,
    /// Table repetitions.
    pub n_loops: u32,
    /// Tick period (`1 / cmd_freq`).
    pub period: TickPeriod,
    /// Read-only ticks after each sine repetition.
    pub cycle_delay_ticks: u32,
    /// Gains applied before streaming, if given.
    pub gains: Option<GainSet>,
}

impl Demo for HighSpeed {
    const NAME: &'static str = "high_speed";
    const SCHEMA: ParameterSchema = ParameterSchema::new(&[
        ("ports", ParamType::Sequence),
        ("baud_rate", ParamType::Integer),
        ("controller_type", ParamType::String),
        ("signal_type", ParamType::String),
        ("signal_amplitude", ParamType::Integer),
        ("signal_freq", ParamType::Integer),
        ("cmd_freq", ParamType::Integer),
        ("request_jitter", ParamType::Boolean),
        ("jitter", ParamType::Integer),
        ("n_loops", ParamType::Integer),
    ]);

    fn from_parameters(params: &ParameterSet) -> Result<Self> {
        let controller: ControllerType = params.string("controller_type")?.parse()?;
        let signal_type = params.string("signal_type")?;
        let signal: SignalKind = signal_type.parse()?;
        let cmd_freq = cap_frequency(params.positive_count("cmd_freq")?, cfg!(windows));
        let period = TickPeriod::from_hz(cmd_freq);

        let samples = generate(
            signal_type,
            params.integer("signal_amplitude")? as f64,
            params.integer("signal_freq")? as f64,
            f64::from(cmd_freq),
            params.boolean("request_jitter")?,
            params.integer("jitter")? as f64,
        )?;
        if samples.is_empty() {
            return Err(invalid("cmd_freq", "lower than the signal frequency"));
        }
        debug!(table = ?samples, "command table");

        let cycle_delay = params.optional_float("cycle_delay")?.unwrap_or(0.0);
        if cycle_delay.is_nan() || cycle_delay < 0.0 {
            return Err(invalid("cycle_delay", "must not be negative"));
        }

        Ok(Self {
            controller,
            signal,
            samples,
            n_loops: params.positive_count("n_loops")?,
            period,
            cycle_delay_ticks: period.ticks_in(cycle_delay),
            gains: params.optional_gains("gains")?,
        })
    }
}

/// Command frequency after the host cap.
pub(crate) fn cap_frequency(cmd_freq: u32, windows: bool) -> u32 {
    if windows && cmd_freq > WINDOWS_MAX_CMD_FREQ {
        warn!(
            requested = cmd_freq,
            cap = WINDOWS_MAX_CMD_FREQ,
            "capping the command frequency on Windows"
        );
        WINDOWS_MAX_CMD_FREQ
    } else {
        cmd_freq
    }
}

impl ControlLoop for HighSpeed {
    fn run<H: DeviceHandle, D: DelayNs>(
        &mut self,
        session: &mut DeviceSession<H>,
        ctx: &mut LoopContext<'_, D>,
        recorder: &mut TelemetryRecorder,
    ) -> Result<LoopSummary> {
        if let Some(gains) = self.gains {
            session.setup_gains(&gains)?;
        }
        let offset = match self.controller {
            ControllerType::Position => {
                ctx.pause_ms(OFFSET_SETTLE_MS);
                f64::from(session.setup_read()?.motor_angle)
            }
            ControllerType::Current => 0.0,
        };
        let mode = self.controller.mode();

        let mut ticker = ctx.ticker(self.period);
        let mut last_request = 0.0;
        'reps: for rep in 0..self.n_loops {
            info!(port = session.port(), rep, of = self.n_loops, "streaming table");
            for &request in self.samples.iter() {
                if ticker.should_stop() {
                    break 'reps;
                }
                ticker.wait();
                let sample = ticker.sample(session)?;
                ticker.command(session, mode, request + offset)?;
                last_request = request;
                if let Some(s) = sample {
                    recorder.record(s.time, request, self.controller.measure(&s, offset));
                }
            }

            if self.signal == SignalKind::Sine {
                for _ in 0..self.cycle_delay_ticks {
                    if ticker.should_stop() {
                        break 'reps;
                    }
                    ticker.wait();
                    if let Some(s) = ticker.sample(session)? {
                        recorder.record(s.time, last_request, self.controller.measure(&s, offset));
                    }
                }
            }
            recorder.mark_cycle(ticker.elapsed());
        }

        ticker.command(session, ControlMode::None, 0.0)?;
        ticker.pause_ms(RELEASE_MS);
        Ok(ticker.finish(SessionOutcome::Completed))
    }
}
