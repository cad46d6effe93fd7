//! Motor pole finding.

use embedded_hal::delay::DelayNs;
use tracing::info;

use crate::control::{ControlLoop, LoopContext, LoopSummary, SessionOutcome};
use crate::device::{DeviceHandle, DeviceSession};
use crate::error::{Result, TransportError};
use crate::params::{ParamType, ParameterSchema, ParameterSet};
use crate::telemetry::TelemetryRecorder;

use super::Demo;

/// Runs the pole-finding routine on every port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindPoles;

impl Demo for FindPoles {
    const NAME: &'static str = "find_poles";
    const SCHEMA: ParameterSchema = ParameterSchema::new(&[
        ("ports", ParamType::Sequence),
        ("baud_rate", ParamType::Integer),
    ]);

    fn from_parameters(_params: &ParameterSet) -> Result<Self> {
        Ok(FindPoles)
    }
}

impl ControlLoop for FindPoles {
    fn run<H: DeviceHandle, D: DelayNs>(
        &mut self,
        session: &mut DeviceSession<H>,
        _ctx: &mut LoopContext<'_, D>,
        _recorder: &mut TelemetryRecorder,
    ) -> Result<LoopSummary> {
        info!(port = session.port(), "finding poles");
        session
            .find_poles()
            .map_err(|cause| TransportError::Setup {
                port: crate::error::bounded(session.port()),
                cause,
            })?;
        info!(port = session.port(), "poles found");
        Ok(LoopSummary {
            ticks: 0,
            skipped: 0,
            outcome: SessionOutcome::PolesFound,
        })
    }
}
