//! Linear ramps.

use alloc::vec::Vec;

use crate::error::Result;
use crate::params::value::invalid;

/// Tick length the voltage ramp is laid out on, in seconds.
pub const RAMP_TICK_SECS: f64 = 0.1;

/// Voltage steps for one half of an open-control cycle.
///
/// `cycle_time = run_time / cycle_count` and each half cycle holds
/// `floor((cycle_time / 2) / 0.1)` steps running from 0 toward
/// `-max_voltage`, excluding the endpoint.
///
/// # Errors
///
/// Returns `InvalidParameter` if `cycle_count` is not positive or the
/// resulting step count is zero.
pub fn ramp_voltages(run_time: f64, cycle_count: i64, max_voltage: f64) -> Result<Vec<f64>> {
    if cycle_count <= 0 {
        return Err(invalid("n_cycles", "must be greater than zero"));
    }

    let cycle_time = run_time / cycle_count as f64;
    let step_count = libm::floor((cycle_time / 2.0) / RAMP_TICK_SECS);
    if step_count.is_nan() || step_count < 1.0 {
        return Err(invalid("run_time", "too short for the requested number of cycles"));
    }
    let step_count = step_count as u32;

    Ok((0..step_count)
        .map(|i| -(max_voltage * f64::from(i)) / f64::from(step_count))
        .collect())
}

/// Targets for the ramp-down that follows a held current.
///
/// Step `i` (0-based) commands `hold_current * (steps - 1 - i) / steps`, so the
/// last target is exactly zero.
pub fn ramp_down_currents(hold_current: f64, steps: u32) -> Vec<f64> {
    (0..steps)
        .map(|i| hold_current * f64::from(steps - 1 - i) / f64::from(steps))
        .collect()
}
