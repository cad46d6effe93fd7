//! Tick pacing, per-tick outcomes and the consecutive-error budget.
//!
//! A failed device call inside the tick loop skips that tick instead of
//! aborting the run. Each session counts consecutive read failures and
//! consecutive write failures separately; once either count exceeds the
//! budget the loop aborts with [`TransportError::Persistent`] and the
//! session is still closed.

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::delay::DelayNs;
use tracing::{info, warn};

use crate::device::{CallKind, ControlMode, DeviceHandle, DeviceSession};
use crate::error::{bounded, DeviceError, Result, TransportError};
use crate::params::GainSet;
use crate::telemetry::Sample;

/// Consecutive per-session failures tolerated before a loop aborts.
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// Fixed loop period with microsecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPeriod {
    micros: u32,
}

impl TickPeriod {
    /// Period of `ms` milliseconds.
    pub const fn from_millis(ms: u32) -> Self {
        Self {
            micros: ms.saturating_mul(1000),
        }
    }

    /// Period of `us` microseconds.
    pub const fn from_micros(us: u32) -> Self {
        Self { micros: us }
    }

    /// Period of a loop running at `hz` (at least 1 Hz).
    pub fn from_hz(hz: u32) -> Self {
        Self {
            micros: 1_000_000 / hz.max(1),
        }
    }

    /// Period in microseconds.
    #[inline]
    pub fn as_micros(self) -> u32 {
        self.micros
    }

    /// Period in seconds.
    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        f64::from(self.micros) / 1_000_000.0
    }

    /// Whole ticks that fit in `secs`.
    pub fn ticks_in(self, secs: f64) -> u32 {
        if secs.is_nan() || secs <= 0.0 || self.micros == 0 {
            return 0;
        }
        // 1e-9 absorbs representation error such as 0.3 / 0.1
        libm::floor(secs * 1_000_000.0 / f64::from(self.micros) + 1e-9) as u32
    }
}

/// Result of one tick's device read.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The read succeeded.
    Sampled(Sample),
    /// The read failed and the tick is skipped.
    Skipped(DeviceError),
}

impl TickOutcome {
    /// The sample, if any.
    pub fn sample(&self) -> Option<Sample> {
        match self {
            TickOutcome::Sampled(s) => Some(*s),
            TickOutcome::Skipped(_) => None,
        }
    }
}

impl From<core::result::Result<Sample, DeviceError>> for TickOutcome {
    fn from(result: core::result::Result<Sample, DeviceError>) -> Self {
        match result {
            Ok(sample) => TickOutcome::Sampled(sample),
            Err(e) => TickOutcome::Skipped(e),
        }
    }
}

/// How a session's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Ran every tick.
    Completed,
    /// Stopped early by the interrupt flag.
    Interrupted,
    /// The requested bootloader came up.
    BootloaderActivated,
    /// The bootloader did not come up in time.
    BootloaderTimedOut,
    /// Pole finding finished.
    PolesFound,
}

/// Counters reported by a finished loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    /// Ticks waited.
    pub ticks: u64,
    /// Device calls that failed and were skipped.
    pub skipped: u32,
    /// How the run ended.
    pub outcome: SessionOutcome,
}

/// Shared resources of the control loops in one demo run.
pub struct LoopContext<'a, D: DelayNs> {
    delay: &'a mut D,
    interrupt: Option<&'a AtomicBool>,
    max_consecutive_errors: u32,
}

impl<'a, D: DelayNs> LoopContext<'a, D> {
    /// Create a context pacing loops with `delay`.
    pub fn new(delay: &'a mut D) -> Self {
        Self {
            delay,
            interrupt: None,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
        }
    }

    /// Stop loops at the next tick once `flag` is set.
    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Override the consecutive failure budget.
    pub fn with_max_consecutive_errors(mut self, max: u32) -> Self {
        self.max_consecutive_errors = max;
        self
    }

    /// Consecutive failure budget.
    #[inline]
    pub fn max_consecutive_errors(&self) -> u32 {
        self.max_consecutive_errors
    }

    /// Check the interrupt flag.
    pub fn interrupted(&self) -> bool {
        self.interrupt
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Sleep outside of any tick loop.
    pub fn pause_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// Start a tick loop with the given period.
    pub fn ticker(&mut self, period: TickPeriod) -> Ticker<'_, D> {
        Ticker {
            delay: &mut *self.delay,
            interrupt: self.interrupt,
            max_consecutive_errors: self.max_consecutive_errors,
            period,
            ticks: 0,
            skipped: 0,
            interrupted: false,
        }
    }
}

/// Paces one loop and applies the error budget to its device calls.
///
/// Timestamps are logical: `ticks * period`, independent of how long the
/// device calls take.
pub struct Ticker<'c, D: DelayNs> {
    delay: &'c mut D,
    interrupt: Option<&'c AtomicBool>,
    max_consecutive_errors: u32,
    period: TickPeriod,
    ticks: u64,
    skipped: u32,
    interrupted: bool,
}

impl<'c, D: DelayNs> Ticker<'c, D> {
    /// Loop period.
    #[inline]
    pub fn period(&self) -> TickPeriod {
        self.period
    }

    /// Ticks waited so far.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Device calls skipped so far.
    #[inline]
    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    /// Logical seconds since the loop started.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.ticks as f64 * self.period.as_secs_f64()
    }

    /// Sleep one period and advance the clock.
    pub fn wait(&mut self) {
        self.delay.delay_us(self.period.as_micros());
        self.ticks += 1;
    }

    /// Sleep without advancing the clock.
    pub fn pause_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    /// Check the interrupt flag. Once set, the loop reports `Interrupted`.
    pub fn should_stop(&mut self) -> bool {
        if !self.interrupted {
            if let Some(flag) = self.interrupt {
                if flag.load(Ordering::Relaxed) {
                    info!(ticks = self.ticks, "interrupt received, stopping loop");
                    self.interrupted = true;
                }
            }
        }
        self.interrupted
    }

    /// Read one sample stamped with the current logical time.
    ///
    /// Returns `Ok(None)` when the read failed within budget.
    pub fn sample<H: DeviceHandle>(
        &mut self,
        session: &mut DeviceSession<H>,
    ) -> Result<Option<Sample>> {
        let outcome = TickOutcome::from(session.sample(self.elapsed()));
        self.observe(session, outcome)
    }

    /// Apply the error budget to a tick outcome.
    pub fn observe<H: DeviceHandle>(
        &mut self,
        session: &mut DeviceSession<H>,
        outcome: TickOutcome,
    ) -> Result<Option<Sample>> {
        match outcome {
            TickOutcome::Sampled(sample) => {
                session.note_success(CallKind::Read);
                Ok(Some(sample))
            }
            TickOutcome::Skipped(cause) => {
                self.skip(session, CallKind::Read, cause)?;
                Ok(None)
            }
        }
    }

    /// Send a command. Returns whether it went through.
    pub fn command<H: DeviceHandle>(
        &mut self,
        session: &mut DeviceSession<H>,
        mode: ControlMode,
        value: f64,
    ) -> Result<bool> {
        let result = session.command(mode, value);
        Ok(self.absorb(session, result)?.is_some())
    }

    /// Apply gains. Returns whether they went through.
    pub fn apply_gains<H: DeviceHandle>(
        &mut self,
        session: &mut DeviceSession<H>,
        gains: &GainSet,
    ) -> Result<bool> {
        let result = session.set_gains(gains);
        Ok(self.absorb(session, result)?.is_some())
    }

    fn absorb<H: DeviceHandle, T>(
        &mut self,
        session: &mut DeviceSession<H>,
        result: core::result::Result<T, DeviceError>,
    ) -> Result<Option<T>> {
        match result {
            Ok(value) => {
                session.note_success(CallKind::Write);
                Ok(Some(value))
            }
            Err(cause) => {
                self.skip(session, CallKind::Write, cause)?;
                Ok(None)
            }
        }
    }

    fn skip<H: DeviceHandle>(
        &mut self,
        session: &mut DeviceSession<H>,
        kind: CallKind,
        cause: DeviceError,
    ) -> Result<()> {
        let failures = session.note_failure(kind);
        self.skipped = self.skipped.saturating_add(1);
        warn!(
            port = session.port(),
            error = %cause,
            call = ?kind,
            consecutive = failures,
            "device call failed, skipping"
        );
        if failures > self.max_consecutive_errors {
            return Err(TransportError::Persistent {
                port: bounded(session.port()),
                failures,
                cause,
            }
            .into());
        }
        Ok(())
    }

    /// Summarize the loop, reporting `outcome` unless it was interrupted.
    pub fn finish(&self, outcome: SessionOutcome) -> LoopSummary {
        LoopSummary {
            ticks: self.ticks,
            skipped: self.skipped,
            outcome: if self.interrupted {
                SessionOutcome::Interrupted
            } else {
                outcome
            },
        }
    }
}
