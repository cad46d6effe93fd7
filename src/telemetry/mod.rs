//! Telemetry module for actuator-demos.
//!
//! Time-series capture of requested versus measured values for the
//! reporting side. Control loops only append; reporting only reads exports.

mod recorder;

pub use recorder::{Sample, TelemetryLog, TelemetryRecorder};
