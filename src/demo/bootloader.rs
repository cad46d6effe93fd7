//! Bootloader activation with a bounded countdown.

use embedded_hal::delay::DelayNs;
use tracing::{info, warn};

use crate::control::{ControlLoop, LoopContext, LoopSummary, SessionOutcome};
use crate::device::{BootloaderTarget, DeviceHandle, DeviceSession};
use crate::error::Result;
use crate::params::{ParamType, ParameterSchema, ParameterSet};
use crate::telemetry::TelemetryRecorder;

use super::Demo;

/// Activation is re-sent whenever the remaining seconds are a multiple of this.
const RESEND_EVERY_SECS: u32 = 5;
const WAIT_STEP_MS: u32 = 1000;

/// Activates a microcontroller's bootloader on every port.
#[derive(Debug, Clone, PartialEq)]
pub struct Bootloader {
    /// Microcontroller to activate.
    pub target: BootloaderTarget,
    /// Seconds to wait for activation.
    pub timeout_secs: u32,
}

impl Demo for Bootloader {
    const NAME: &'static str = "bootloader";
    const SCHEMA: ParameterSchema = ParameterSchema::new(&[
        ("ports", ParamType::Sequence),
        ("baud_rate", ParamType::Integer),
        ("target", ParamType::String),
        ("timeout", ParamType::Integer),
    ]);

    fn from_parameters(params: &ParameterSet) -> Result<Self> {
        Ok(Self {
            target: params.string("target")?.parse()?,
            timeout_secs: params.positive_count("timeout")?,
        })
    }
}

impl ControlLoop for Bootloader {
    fn confirms_each_port(&self) -> bool {
        false
    }

    fn run<H: DeviceHandle, D: DelayNs>(
        &mut self,
        session: &mut DeviceSession<H>,
        ctx: &mut LoopContext<'_, D>,
        _recorder: &mut TelemetryRecorder,
    ) -> Result<LoopSummary> {
        info!(port = session.port(), target = self.target.name(), "activating bootloader");

        let mut remaining = self.timeout_secs;
        let mut active = false;
        let mut ticks = 0;
        let mut failures = 0u32;
        while remaining > 0 && !active {
            if ctx.interrupted() {
                info!(port = session.port(), "bootloader wait interrupted");
                return Ok(LoopSummary {
                    ticks,
                    skipped: failures,
                    outcome: SessionOutcome::Interrupted,
                });
            }
            if remaining % RESEND_EVERY_SECS == 0 {
                info!(port = session.port(), "sending signal to target device");
                if let Err(e) = session.activate_bootloader(self.target.id()) {
                    warn!(port = session.port(), error = %e, "activation request failed");
                    failures += 1;
                }
            }
            info!(port = session.port(), remaining, "waiting for response from target");
            ctx.pause_ms(WAIT_STEP_MS);
            remaining -= 1;
            ticks += 1;
            match session.is_bootloader_active() {
                Ok(state) => active = state,
                Err(e) => {
                    warn!(port = session.port(), error = %e, "status poll failed");
                    failures += 1;
                }
            }
        }

        let outcome = if active {
            info!(port = session.port(), target = self.target.name(), "bootloader activated");
            SessionOutcome::BootloaderActivated
        } else {
            warn!(port = session.port(), target = self.target.name(), "bootloader not active");
            SessionOutcome::BootloaderTimedOut
        };
        Ok(LoopSummary {
            ticks,
            skipped: failures,
            outcome,
        })
    }
}
