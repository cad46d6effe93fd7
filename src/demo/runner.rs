//! Demo sequencing: validate, acquire, run, release.

use alloc::vec::Vec;
use core::sync::atomic::AtomicBool;

use embedded_hal::delay::DelayNs;
use tracing::info;

use crate::control::{
    ControlLoop, CurrentControl, DualPosition, HighSpeed, ImpedanceControl, LeaderFollower,
    LoopContext, OpenControl, PairedLoop, PositionControl, ReadOnly, TwoPositionControl,
    DEFAULT_MAX_CONSECUTIVE_ERRORS,
};
use crate::device::{DeviceOpener, DevicePair, DeviceSession};
use crate::error::{PortName, Result, ValidationError};
use crate::params::value::invalid;
use crate::params::ParameterSet;
use crate::telemetry::TelemetryRecorder;

use super::bootloader::Bootloader;
use super::find_poles::FindPoles;
use super::operator::Operator;
use super::report::{DemoReport, SessionReport};
use super::{Demo, DemoKind};

/// Settle time between neutral and close when releasing a device pair.
const PAIR_RELEASE_MS: u32 = 500;

/// Device parameters shared by every demo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceParams {
    /// Ports in the order they are driven.
    pub ports: Vec<PortName>,
    /// Baud rate for every port.
    pub baud_rate: u32,
    /// Consecutive failure budget per session.
    pub max_consecutive_errors: u32,
}

impl DeviceParams {
    /// Extract from a validated parameter set.
    ///
    /// `max_consecutive_errors` is optional and defaults to
    /// [`DEFAULT_MAX_CONSECUTIVE_ERRORS`].
    pub fn from_parameters(params: &ParameterSet) -> Result<Self> {
        let max_consecutive_errors = match params.optional_integer("max_consecutive_errors")? {
            None => DEFAULT_MAX_CONSECUTIVE_ERRORS,
            Some(v) => u32::try_from(v)
                .map_err(|_| invalid("max_consecutive_errors", "must not be negative"))?,
        };
        Ok(Self {
            ports: params.ports()?,
            baud_rate: params.baud_rate()?,
            max_consecutive_errors,
        })
    }

    /// Require exactly `expected` ports.
    pub fn require_count(&self, expected: usize) -> Result<()> {
        if self.ports.len() != expected {
            return Err(ValidationError::WrongDeviceCount {
                expected,
                found: self.ports.len(),
            }
            .into());
        }
        Ok(())
    }
}

/// Runs demos against the devices of one opener.
pub struct DemoRunner<'a, O: DeviceOpener, D: DelayNs> {
    opener: &'a mut O,
    delay: &'a mut D,
    operator: &'a mut dyn Operator,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a, O: DeviceOpener, D: DelayNs> DemoRunner<'a, O, D> {
    /// Create a runner.
    pub fn new(opener: &'a mut O, delay: &'a mut D, operator: &'a mut dyn Operator) -> Self {
        Self {
            opener,
            delay,
            operator,
            interrupt: None,
        }
    }

    /// Stop at the next tick once `flag` is set.
    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Run the demo named by `kind`.
    pub fn run(&mut self, kind: DemoKind, params: ParameterSet) -> Result<DemoReport> {
        match kind {
            DemoKind::ReadOnly => self.run_each_port::<ReadOnly>(params),
            DemoKind::CurrentControl => self.run_each_port::<CurrentControl>(params),
            DemoKind::OpenControl => self.run_each_port::<OpenControl>(params),
            DemoKind::PositionControl => self.run_each_port::<PositionControl>(params),
            DemoKind::ImpedanceControl => self.run_each_port::<ImpedanceControl>(params),
            DemoKind::TwoPositionControl => self.run_each_port::<TwoPositionControl>(params),
            DemoKind::HighSpeed => self.run_each_port::<HighSpeed>(params),
            DemoKind::Bootloader => self.run_each_port::<Bootloader>(params),
            DemoKind::FindPoles => self.run_each_port::<FindPoles>(params),
            DemoKind::LeaderFollower => self.run_pair::<LeaderFollower>(params),
            DemoKind::TwoDevicesPositionControl => self.run_pair::<DualPosition>(params),
        }
    }

    /// Run a single-device demo on every configured port, one after another.
    ///
    /// Nothing is opened unless the parameters validate. Each session is
    /// closed before the next port is opened, and on every error path.
    pub fn run_each_port<T: Demo + ControlLoop>(
        &mut self,
        params: ParameterSet,
    ) -> Result<DemoReport> {
        let params = T::SCHEMA.validate(params)?;
        let devices = DeviceParams::from_parameters(&params)?;
        let mut demo = T::from_parameters(&params)?;
        info!(demo = T::NAME, ports = devices.ports.len(), "starting demo");

        let mut ctx = LoopContext::new(&mut *self.delay)
            .with_max_consecutive_errors(devices.max_consecutive_errors);
        if let Some(flag) = self.interrupt {
            ctx = ctx.with_interrupt(flag);
        }

        let mut report = DemoReport::new(T::NAME);
        let mut recorder = TelemetryRecorder::new();
        for port in devices.ports.iter() {
            if ctx.interrupted() {
                info!(demo = T::NAME, "interrupted, remaining ports skipped");
                break;
            }
            if demo.confirms_each_port() && !self.operator.confirm(port) {
                info!(port = port.as_str(), "skipped by operator");
                continue;
            }

            let mut session = DeviceSession::open(&mut *self.opener, port, devices.baud_rate)?;
            recorder.reset();
            let summary = demo.run(&mut session, &mut ctx, &mut recorder)?;
            session.close()?;

            info!(
                port = port.as_str(),
                ticks = summary.ticks,
                skipped = summary.skipped,
                outcome = ?summary.outcome,
                "session finished"
            );
            report.sessions.push(SessionReport {
                port: port.clone(),
                final_state: session.state(),
                summary,
                telemetry: recorder.export(),
            });
        }
        Ok(report)
    }

    /// Run a two-device demo on exactly two ports.
    ///
    /// A port count other than two is rejected before anything is opened.
    /// Both devices are neutralized and closed leader first on every exit
    /// path.
    pub fn run_pair<T: Demo + PairedLoop>(&mut self, params: ParameterSet) -> Result<DemoReport> {
        let params = T::SCHEMA.validate(params)?;
        let devices = DeviceParams::from_parameters(&params)?;
        devices.require_count(2)?;
        let mut demo = T::from_parameters(&params)?;
        info!(
            demo = T::NAME,
            leader = devices.ports[0].as_str(),
            follower = devices.ports[1].as_str(),
            "starting demo"
        );

        let mut ctx = LoopContext::new(&mut *self.delay)
            .with_max_consecutive_errors(devices.max_consecutive_errors);
        if let Some(flag) = self.interrupt {
            ctx = ctx.with_interrupt(flag);
        }

        let leader = DeviceSession::open(&mut *self.opener, &devices.ports[0], devices.baud_rate)?;
        let follower =
            DeviceSession::open(&mut *self.opener, &devices.ports[1], devices.baud_rate)?;
        let mut pair = DevicePair::new(leader, follower);

        let mut leader_log = TelemetryRecorder::new();
        let mut follower_log = TelemetryRecorder::new();
        let summary = demo.run(&mut pair, &mut ctx, &mut leader_log, &mut follower_log)?;
        pair.release(|| ctx.pause_ms(PAIR_RELEASE_MS))?;

        info!(
            demo = T::NAME,
            ticks = summary.ticks,
            skipped = summary.skipped,
            outcome = ?summary.outcome,
            "pair finished"
        );
        let mut report = DemoReport::new(T::NAME);
        report.sessions.push(SessionReport {
            port: devices.ports[0].clone(),
            final_state: pair.leader.state(),
            summary,
            telemetry: leader_log.export(),
        });
        report.sessions.push(SessionReport {
            port: devices.ports[1].clone(),
            final_state: pair.follower.state(),
            summary,
            telemetry: follower_log.export(),
        });
        Ok(report)
    }
}
