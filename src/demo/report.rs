//! Results handed to the reporting side.

use alloc::vec::Vec;

use crate::control::{LoopState, LoopSummary, SessionOutcome};
use crate::error::PortName;
use crate::telemetry::TelemetryLog;

/// What happened on one port.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// Port the session ran on.
    pub port: PortName,
    /// Lifecycle state after the demo.
    pub final_state: LoopState,
    /// Loop counters and outcome.
    pub summary: LoopSummary,
    /// Everything recorded during the session.
    pub telemetry: TelemetryLog,
}

/// Result of one demo run, sessions in the order they ran.
#[derive(Debug, Clone, PartialEq)]
pub struct DemoReport {
    /// Demo name.
    pub demo: &'static str,
    /// One entry per session that ran.
    pub sessions: Vec<SessionReport>,
}

impl DemoReport {
    /// Empty report for `demo`.
    pub fn new(demo: &'static str) -> Self {
        Self {
            demo,
            sessions: Vec::new(),
        }
    }

    /// Report for `port`, if it ran.
    pub fn session(&self, port: &str) -> Option<&SessionReport> {
        self.sessions.iter().find(|s| s.port.as_str() == port)
    }

    /// Check that every session that ran ended closed.
    pub fn all_closed(&self) -> bool {
        self.sessions.iter().all(|s| s.final_state.is_closed())
    }

    /// Check whether any session was stopped by the interrupt flag.
    pub fn interrupted(&self) -> bool {
        self.sessions
            .iter()
            .any(|s| s.summary.outcome == SessionOutcome::Interrupted)
    }
}
