//! Device module for actuator-demos.
//!
//! Provides the device access traits, the scoped session that guarantees a
//! device is closed, and the simulated backend.

#[cfg(feature = "std")]
mod delay;
mod handle;
mod session;
mod sim;

pub use handle::{
    AppType, BootloaderTarget, ControlMode, DeviceHandle, DeviceOpener, Telemetry,
};
pub use session::{CallKind, DevicePair, DeviceSession};
pub use sim::{SimulatedBus, SimulatedDevice};

#[cfg(feature = "std")]
pub use delay::StdDelay;
