//! Append-only telemetry recorder.

use alloc::vec::Vec;

/// One device reading taken during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Motor encoder angle (ticks).
    pub motor_angle: i32,
    /// Motor current (mA).
    pub motor_current: i32,
    /// Motor voltage (mV).
    pub motor_voltage: i32,
    /// Seconds since the loop started.
    pub time: f64,
}

/// Exported telemetry of one session.
///
/// `times`, `requests` and `measurements` are aligned index by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryLog {
    /// Tick timestamps in seconds.
    pub times: Vec<f64>,
    /// Requested value per tick.
    pub requests: Vec<f64>,
    /// Measured value per tick.
    pub measurements: Vec<f64>,
    /// Timestamps at which a command cycle ended.
    pub cycle_marks: Vec<f64>,
}

impl TelemetryLog {
    /// Number of recorded ticks.
    #[inline]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Check if nothing was recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Iterate over `(time, requested, measured)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.times
            .iter()
            .zip(self.requests.iter())
            .zip(self.measurements.iter())
            .map(|((t, r), m)| (*t, *r, *m))
    }

    /// Mean of `|measured - requested|`, or `None` if empty.
    pub fn mean_abs_error(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let total: f64 = self.iter().map(|(_, r, m)| libm::fabs(m - r)).sum();
        Some(total / self.len() as f64)
    }
}

/// Accumulates one session's telemetry.
#[derive(Debug, Clone, Default)]
pub struct TelemetryRecorder {
    log: TelemetryLog,
}

impl TelemetryRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one tick.
    #[inline]
    pub fn record(&mut self, time: f64, requested: f64, measured: f64) {
        self.log.times.push(time);
        self.log.requests.push(requested);
        self.log.measurements.push(measured);
    }

    /// Mark the end of a command cycle.
    pub fn mark_cycle(&mut self, time: f64) {
        self.log.cycle_marks.push(time);
    }

    /// Clear every series. Called once per session.
    pub fn reset(&mut self) {
        self.log = TelemetryLog::default();
    }

    /// Number of recorded ticks.
    #[inline]
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Check if nothing was recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Copy of everything recorded so far.
    pub fn export(&self) -> TelemetryLog {
        self.log.clone()
    }
}
