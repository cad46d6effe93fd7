//! Simulated actuator backend.
//!
//! Each device is a first-order plant: position and impedance commands pull
//! the angle toward the target, current and voltage commands drive the
//! motor current, and the angle integrates the current. Time advances by
//! a fixed step on every read, so runs are fully deterministic.

use tracing::debug;

use crate::error::DeviceError;
use crate::params::GainSet;

use super::handle::{ControlMode, DeviceHandle, DeviceOpener, Telemetry};

/// Device clock advance per read, in milliseconds.
const READ_STEP_MS: u32 = 10;

/// Angle increment per read per mA of motor current.
const ANGLE_PER_MA: f64 = 0.01;

/// Motor current per mV of commanded voltage.
const MA_PER_MV: f64 = 0.1;

/// Nominal battery voltage (mV).
const BATTERY_MV: i32 = 24_000;

/// Opens simulated devices.
///
/// The n-th opened device (counting from 1) starts at angle `1000 * n`.
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    opened: u32,
    app_type: i32,
    bootloader_polls: u32,
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self {
            opened: 0,
            app_type: 0,
            bootloader_polls: 3,
        }
    }
}

impl SimulatedBus {
    /// Create a bus of actuator packs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `code` as the application type of every device.
    pub fn with_app_type(mut self, code: i32) -> Self {
        self.app_type = code;
        self
    }

    /// Number of status polls before a requested bootloader comes up.
    pub fn with_bootloader_polls(mut self, polls: u32) -> Self {
        self.bootloader_polls = polls;
        self
    }

    /// Devices opened so far.
    pub fn opened(&self) -> u32 {
        self.opened
    }
}

impl DeviceOpener for SimulatedBus {
    type Handle = SimulatedDevice;

    fn open(&mut self, port: &str, baud_rate: u32) -> Result<SimulatedDevice, DeviceError> {
        if baud_rate == 0 {
            return Err(DeviceError::Rejected(crate::error::bounded("baud rate 0")));
        }
        self.opened += 1;
        debug!(port, baud_rate, id = self.opened, "simulated device attached");
        Ok(SimulatedDevice::new(
            f64::from(self.opened) * 1000.0,
            self.app_type,
            self.bootloader_polls,
        ))
    }
}

/// One simulated actuator.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    angle: f64,
    velocity: f64,
    current: f64,
    voltage: f64,
    mode: ControlMode,
    setpoint: f64,
    gains: GainSet,
    app_type: i32,
    clock_ms: u32,
    bootloader_polls: u32,
    bootloader_pending: Option<u32>,
    bootloader_active: bool,
    poles_found: bool,
    closed: bool,
}

impl SimulatedDevice {
    /// Create a device resting at `angle`.
    pub fn new(angle: f64, app_type: i32, bootloader_polls: u32) -> Self {
        Self {
            angle,
            velocity: 0.0,
            current: 0.0,
            voltage: 0.0,
            mode: ControlMode::None,
            setpoint: 0.0,
            gains: GainSet::ZERO,
            app_type,
            clock_ms: 0,
            bootloader_polls,
            bootloader_pending: None,
            bootloader_active: false,
            poles_found: false,
            closed: false,
        }
    }

    /// Gains currently applied.
    pub fn gains(&self) -> GainSet {
        self.gains
    }

    /// Last commanded mode.
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Check whether the pole-finding routine has run.
    pub fn poles_found(&self) -> bool {
        self.poles_found
    }

    /// Check whether the device was closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<(), DeviceError> {
        if self.closed {
            Err(DeviceError::Disconnected)
        } else {
            Ok(())
        }
    }

    /// Fraction of the position error closed per step.
    fn tracking_rate(&self) -> f64 {
        let gain = match self.mode {
            ControlMode::Impedance => self.gains.stiffness.max(self.gains.proportional),
            _ => self.gains.proportional,
        };
        if gain <= 0 {
            0.0
        } else {
            (f64::from(gain) / 100.0).min(0.5)
        }
    }

    fn step(&mut self) {
        let previous = self.angle;
        match self.mode {
            ControlMode::None => {
                self.current *= 0.5;
                self.voltage = 0.0;
            }
            ControlMode::Voltage => {
                self.voltage = self.setpoint;
                self.current = self.setpoint * MA_PER_MV;
                self.angle += self.current * ANGLE_PER_MA;
            }
            ControlMode::Current => {
                self.current += (self.setpoint - self.current) * 0.5;
                self.angle += self.current * ANGLE_PER_MA;
            }
            ControlMode::Position | ControlMode::Impedance => {
                let error = self.setpoint - self.angle;
                self.angle += error * self.tracking_rate();
                self.current = error;
            }
        }
        self.velocity = (self.angle - previous) * 1000.0 / f64::from(READ_STEP_MS);
        self.clock_ms = self.clock_ms.wrapping_add(READ_STEP_MS);
    }
}

impl DeviceHandle for SimulatedDevice {
    fn app_type(&mut self) -> Result<i32, DeviceError> {
        self.ensure_open()?;
        Ok(self.app_type)
    }

    fn read(&mut self) -> Result<Telemetry, DeviceError> {
        self.ensure_open()?;
        self.step();
        Ok(Telemetry {
            state_time: self.clock_ms,
            motor_angle: libm::round(self.angle) as i32,
            motor_velocity: libm::round(self.velocity) as i32,
            motor_current: libm::round(self.current) as i32,
            motor_voltage: libm::round(self.voltage) as i32,
            battery_voltage: BATTERY_MV,
        })
    }

    fn send_command(&mut self, mode: ControlMode, value: f64) -> Result<(), DeviceError> {
        self.ensure_open()?;
        self.mode = mode;
        self.setpoint = value;
        Ok(())
    }

    fn set_gains(&mut self, gains: &GainSet) -> Result<(), DeviceError> {
        self.ensure_open()?;
        self.gains = *gains;
        Ok(())
    }

    fn activate_bootloader(&mut self, _target_id: u8) -> Result<(), DeviceError> {
        self.ensure_open()?;
        if self.bootloader_pending.is_none() {
            self.bootloader_pending = Some(self.bootloader_polls);
        }
        Ok(())
    }

    fn is_bootloader_active(&mut self) -> Result<bool, DeviceError> {
        self.ensure_open()?;
        if let Some(remaining) = self.bootloader_pending {
            if remaining <= 1 {
                self.bootloader_active = true;
                self.bootloader_pending = None;
            } else {
                self.bootloader_pending = Some(remaining - 1);
            }
        }
        Ok(self.bootloader_active)
    }

    fn find_poles(&mut self) -> Result<(), DeviceError> {
        self.ensure_open()?;
        self.poles_found = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeviceError> {
        self.ensure_open()?;
        self.mode = ControlMode::None;
        self.closed = true;
        Ok(())
    }
}
