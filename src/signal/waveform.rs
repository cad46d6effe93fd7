//! Sampled waveforms with optional seeded jitter.

use alloc::vec::Vec;
use core::f64::consts::PI;
use core::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{bounded, Error, Result, UnsupportedError};
use crate::params::value::invalid;

/// Seed of the jitter source used by [`generate`].
pub const JITTER_SEED: u64 = 42;

/// Shape of a generated command table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// One sine period per `sample_freq / signal_freq` samples.
    Sine,
    /// Same sampling with the frequency pinned to 1.
    Line,
}

impl SignalKind {
    /// Parameter-file name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            SignalKind::Sine => "sine",
            SignalKind::Line => "line",
        }
    }

    /// Frequency actually used for a requested one.
    #[inline]
    pub fn effective_frequency(self, requested: f64) -> f64 {
        match self {
            SignalKind::Sine => requested,
            SignalKind::Line => 1.0,
        }
    }
}

impl FromStr for SignalKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sine" => Ok(SignalKind::Sine),
            "line" => Ok(SignalKind::Line),
            other => Err(UnsupportedError::Signal(bounded(other)).into()),
        }
    }
}

/// Generate a command table, jittered from [`JITTER_SEED`] when enabled.
///
/// # Errors
///
/// - `UnsupportedSignal` if `signal_kind` is neither `"sine"` nor `"line"`
/// - `InvalidParameter` if a frequency is not positive
pub fn generate(
    signal_kind: &str,
    amplitude: f64,
    signal_freq: f64,
    sample_freq: f64,
    jitter_enabled: bool,
    jitter_amount: f64,
) -> Result<Vec<f64>> {
    generate_seeded(
        signal_kind,
        amplitude,
        signal_freq,
        sample_freq,
        jitter_enabled,
        jitter_amount,
        JITTER_SEED,
    )
}

/// Same as [`generate`] with an explicit jitter seed.
pub fn generate_seeded(
    signal_kind: &str,
    amplitude: f64,
    signal_freq: f64,
    sample_freq: f64,
    jitter_enabled: bool,
    jitter_amount: f64,
    seed: u64,
) -> Result<Vec<f64>> {
    let kind: SignalKind = signal_kind.parse()?;
    let freq = kind.effective_frequency(signal_freq);

    if freq.is_nan() || freq <= 0.0 {
        return Err(invalid("signal_freq", "must be greater than zero"));
    }
    if sample_freq.is_nan() || sample_freq <= 0.0 {
        return Err(invalid("cmd_freq", "must be greater than zero"));
    }

    let count = libm::floor(sample_freq / freq) as usize;
    let mut samples: Vec<f64> = phases(count).map(|p| amplitude * libm::sin(p)).collect();

    if jitter_enabled {
        let mut rng = StdRng::seed_from_u64(seed);
        for sample in samples.iter_mut() {
            *sample += jitter_amount + standard_normal(&mut rng);
        }
    }

    Ok(samples)
}

/// `count` evenly spaced phases over `[-pi, pi]`, both ends included.
fn phases(count: usize) -> impl Iterator<Item = f64> {
    let step = if count > 1 {
        2.0 * PI / (count - 1) as f64
    } else {
        0.0
    };
    (0..count).map(move |i| -PI + step * i as f64)
}

/// Box-Muller draw from N(0, 1).
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // (0, 1] keeps the log finite
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    libm::sqrt(-2.0 * libm::log(u1)) * libm::cos(2.0 * PI * u2)
}
