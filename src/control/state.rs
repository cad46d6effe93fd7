//! Control loop lifecycle.

use core::fmt;

/// Lifecycle state of one device session.
///
/// `Idle -> Running` when the session is acquired, `Running -> RampingDown`
/// when a loop begins its ramp-down phase, and any state `-> Closed` on
/// close. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// No session held yet.
    #[default]
    Idle,
    /// Ticking with the device open.
    Running,
    /// Stepping the command back toward neutral.
    RampingDown,
    /// Device closed.
    Closed,
}

impl LoopState {
    /// State name for display/debugging.
    pub fn name(self) -> &'static str {
        match self {
            LoopState::Idle => "Idle",
            LoopState::Running => "Running",
            LoopState::RampingDown => "RampingDown",
            LoopState::Closed => "Closed",
        }
    }

    /// Check whether moving to `next` is allowed.
    pub fn can_transition_to(self, next: LoopState) -> bool {
        matches!(
            (self, next),
            (LoopState::Idle, LoopState::Running)
                | (LoopState::Running, LoopState::RampingDown)
                | (LoopState::Idle, LoopState::Closed)
                | (LoopState::Running, LoopState::Closed)
                | (LoopState::RampingDown, LoopState::Closed)
        )
    }

    /// Check for the terminal state.
    #[inline]
    pub fn is_closed(self) -> bool {
        self == LoopState::Closed
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
