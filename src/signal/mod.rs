//! Signal module for actuator-demos.
//!
//! Pure generators for the command plans the control loops step through:
//! voltage ramps, current ramp-downs and sampled waveforms.

mod ramp;
mod waveform;

pub use ramp::{ramp_down_currents, ramp_voltages, RAMP_TICK_SECS};
pub use waveform::{generate, generate_seeded, SignalKind, JITTER_SEED};
