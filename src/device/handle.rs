//! Device access traits and the values exchanged with a device.

use core::fmt;
use core::str::FromStr;

use crate::error::{bounded, DeviceError, Error, Result, UnsupportedError};
use crate::params::GainSet;

/// Control mode a device is commanded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    /// No active control, the motor is released.
    #[default]
    None,
    /// Open-loop voltage (mV).
    Voltage,
    /// Closed-loop current (mA).
    Current,
    /// Closed-loop position (encoder ticks).
    Position,
    /// Impedance around a position (encoder ticks).
    Impedance,
}

impl ControlMode {
    /// Short lowercase name for logs.
    pub fn name(self) -> &'static str {
        match self {
            ControlMode::None => "none",
            ControlMode::Voltage => "voltage",
            ControlMode::Current => "current",
            ControlMode::Position => "position",
            ControlMode::Impedance => "impedance",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw readout of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Telemetry {
    /// Device clock in milliseconds.
    pub state_time: u32,
    /// Motor encoder angle (ticks).
    pub motor_angle: i32,
    /// Motor velocity (ticks/s).
    pub motor_velocity: i32,
    /// Motor current (mA).
    pub motor_current: i32,
    /// Motor voltage (mV).
    pub motor_voltage: i32,
    /// Battery voltage (mV).
    pub battery_voltage: i32,
}

/// Application running on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppType {
    /// Single actuator pack.
    ActPack,
    /// Exoskeleton boot.
    ExoBoot,
}

impl AppType {
    /// Identify an application type from the code a device reports.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedError::AppType` for applications the demos
    /// cannot drive, including network masters and battery managers.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(AppType::ActPack),
            1 => Ok(AppType::ExoBoot),
            other => Err(UnsupportedError::AppType(other).into()),
        }
    }

    /// Wire code.
    pub fn code(self) -> i32 {
        match self {
            AppType::ActPack => 0,
            AppType::ExoBoot => 1,
        }
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self {
            AppType::ActPack => "ActPack",
            AppType::ExoBoot => "ExoBoot",
        }
    }
}

/// Microcontroller whose bootloader can be activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootloaderTarget {
    /// Absolute encoder controller.
    Habsolute,
    /// Regulation controller.
    Regulate,
    /// Execute controller.
    Execute,
    /// Manage controller.
    Manage,
    /// Bluetooth radio.
    Bluetooth,
    /// XBee radio.
    XBee,
}

impl BootloaderTarget {
    /// Every target, in wire-id order.
    pub const ALL: [BootloaderTarget; 6] = [
        BootloaderTarget::Habsolute,
        BootloaderTarget::Regulate,
        BootloaderTarget::Execute,
        BootloaderTarget::Manage,
        BootloaderTarget::Bluetooth,
        BootloaderTarget::XBee,
    ];

    /// Wire id sent with an activation request.
    pub fn id(self) -> u8 {
        match self {
            BootloaderTarget::Habsolute => 0,
            BootloaderTarget::Regulate => 1,
            BootloaderTarget::Execute => 2,
            BootloaderTarget::Manage => 3,
            BootloaderTarget::Bluetooth => 4,
            BootloaderTarget::XBee => 5,
        }
    }

    /// Key used in parameter files.
    pub fn key(self) -> &'static str {
        match self {
            BootloaderTarget::Habsolute => "Habs",
            BootloaderTarget::Regulate => "Reg",
            BootloaderTarget::Execute => "Exe",
            BootloaderTarget::Manage => "Mn",
            BootloaderTarget::Bluetooth => "BT121",
            BootloaderTarget::XBee => "XBee",
        }
    }

    /// Descriptive name.
    pub fn name(self) -> &'static str {
        match self {
            BootloaderTarget::Habsolute => "Habsolute",
            BootloaderTarget::Regulate => "Regulate",
            BootloaderTarget::Execute => "Execute",
            BootloaderTarget::Manage => "Manage",
            BootloaderTarget::Bluetooth => "Bluetooth",
            BootloaderTarget::XBee => "XBee",
        }
    }
}

impl FromStr for BootloaderTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BootloaderTarget::ALL
            .iter()
            .copied()
            .find(|t| t.key() == s)
            .ok_or_else(|| UnsupportedError::BootloaderTarget(bounded(s)).into())
    }
}

/// Operations on one opened device.
///
/// Every call may fail with a [`DeviceError`]; deciding whether a failure
/// is fatal is left to the caller. `close` is called exactly once per
/// opened handle when it is owned by a
/// [`DeviceSession`](crate::device::DeviceSession).
pub trait DeviceHandle {
    /// Raw application type code.
    fn app_type(&mut self) -> core::result::Result<i32, DeviceError>;

    /// Read the latest telemetry.
    fn read(&mut self) -> core::result::Result<Telemetry, DeviceError>;

    /// Command `value` in `mode`.
    fn send_command(
        &mut self,
        mode: ControlMode,
        value: f64,
    ) -> core::result::Result<(), DeviceError>;

    /// Apply controller gains.
    fn set_gains(&mut self, gains: &GainSet) -> core::result::Result<(), DeviceError>;

    /// Request bootloader activation on the microcontroller `target_id`.
    fn activate_bootloader(&mut self, target_id: u8) -> core::result::Result<(), DeviceError>;

    /// Check whether a previously requested bootloader is active.
    fn is_bootloader_active(&mut self) -> core::result::Result<bool, DeviceError>;

    /// Run the motor pole-finding routine.
    fn find_poles(&mut self) -> core::result::Result<(), DeviceError>;

    /// Release the port.
    fn close(&mut self) -> core::result::Result<(), DeviceError>;
}

/// Opens devices by port name.
pub trait DeviceOpener {
    /// Handle type produced by this opener.
    type Handle: DeviceHandle;

    /// Open `port` at `baud_rate`.
    fn open(
        &mut self,
        port: &str,
        baud_rate: u32,
    ) -> core::result::Result<Self::Handle, DeviceError>;
}
