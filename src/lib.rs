//! # actuator-demos
//!
//! Parameter-driven control-loop demos for motorized actuator devices.
//!
//! ## Features
//!
//! - **Parameter-driven**: Each demo declares a schema; parameter files are validated before any device opens
//! - **embedded-hal 1.0**: Loop timing through `DelayNs`
//! - **no_std compatible**: Core library works without standard library (needs `alloc`)
//! - **Scoped device sessions**: Devices are neutralized and closed exactly once on every exit path
//! - **Error budget**: Transient transport failures skip a tick; persistent ones abort
//! - **Multi-device**: Leader/follower and dual-position demos in lock-step
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use actuator_demos::{DemoKind, DemoRunner, SimulatedBus, StdDelay, AutoConfirm};
//!
//! let params = actuator_demos::load_parameters("position_control.toml")?;
//!
//! let mut bus = SimulatedBus::new();
//! let mut delay = StdDelay;
//! let mut operator = AutoConfirm;
//! let mut runner = DemoRunner::new(&mut bus, &mut delay, &mut operator);
//!
//! let report = runner.run(DemoKind::PositionControl, params)?;
//! println!("{:?}", report.sessions[0].telemetry.mean_abs_error());
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables parameter file loading, `StdDelay` and the stdin prompt
//! - `cli`: Builds the `actuator-demos` binary

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

extern crate alloc;

// Core modules
pub mod control;
pub mod demo;
pub mod device;
pub mod error;
pub mod params;
pub mod signal;
pub mod telemetry;

// Re-exports for ergonomic API
pub use control::{ControlLoop, LoopContext, LoopState, LoopSummary, PairedLoop, SessionOutcome};
pub use demo::{AutoConfirm, Demo, DemoKind, DemoReport, DemoRunner, Operator, SessionReport};
pub use device::{
    ControlMode, DeviceHandle, DeviceOpener, DevicePair, DeviceSession, SimulatedBus, Telemetry,
};
pub use error::{Error, Result};
pub use params::{validate, GainSet, ParamType, ParamValue, ParameterSchema, ParameterSet};
pub use signal::{generate, ramp_voltages};
pub use telemetry::{Sample, TelemetryLog, TelemetryRecorder};

// Parameter loading (std only)
#[cfg(feature = "std")]
pub use params::{load_parameters, parse_parameters};

#[cfg(feature = "std")]
pub use demo::StdinOperator;
#[cfg(feature = "std")]
pub use device::StdDelay;
