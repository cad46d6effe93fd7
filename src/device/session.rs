//! Scoped ownership of one opened device.

use tracing::{debug, info, warn};

use crate::control::LoopState;
use crate::error::{bounded, DeviceError, PortName, Result, TransportError};
use crate::params::GainSet;
use crate::telemetry::Sample;

use super::handle::{AppType, ControlMode, DeviceHandle, DeviceOpener, Telemetry};

/// Direction of a device call. Each direction keeps its own failure count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Telemetry reads.
    Read,
    /// Commands and gain changes.
    Write,
}

/// An opened device that is closed exactly once.
///
/// Dropping a session that was not closed explicitly commands the device
/// to neutral (best effort) and closes it, so every exit path out of a
/// control loop releases the port.
pub struct DeviceSession<H: DeviceHandle> {
    handle: H,
    port: PortName,
    baud_rate: u32,
    app_type: AppType,
    initial_position: i32,
    last_sample: Option<Sample>,
    mode: ControlMode,
    state: LoopState,
    read_failures: u32,
    write_failures: u32,
}

impl<H: DeviceHandle> DeviceSession<H> {
    /// Open `port`, identify the application and capture the initial position.
    ///
    /// # Errors
    ///
    /// - `TransportError::Open` if the port cannot be opened
    /// - `TransportError::Setup` if identification or the first read fails
    /// - `UnsupportedError::AppType` for an application the demos cannot drive
    ///
    /// A handle that was opened is closed again before any error returns.
    pub fn open<O>(opener: &mut O, port: &str, baud_rate: u32) -> Result<Self>
    where
        O: DeviceOpener<Handle = H>,
    {
        let handle = opener
            .open(port, baud_rate)
            .map_err(|cause| TransportError::Open {
                port: bounded(port),
                cause,
            })?;

        let mut session = Self {
            handle,
            port: bounded(port),
            baud_rate,
            app_type: AppType::ActPack,
            initial_position: 0,
            last_sample: None,
            mode: ControlMode::None,
            state: LoopState::Idle,
            read_failures: 0,
            write_failures: 0,
        };

        let code = session.handle.app_type().map_err(|e| session.setup_error(e))?;
        session.app_type = AppType::from_code(code)?;
        let first = session.setup_read()?;
        session.initial_position = first.motor_angle;
        session.set_state(LoopState::Running);

        info!(
            port = session.port.as_str(),
            baud_rate,
            app = session.app_type.name(),
            initial_position = session.initial_position,
            "device opened"
        );
        Ok(session)
    }

    /// Port this session was opened on.
    #[inline]
    pub fn port(&self) -> &str {
        self.port.as_str()
    }

    /// Baud rate the port was opened at.
    #[inline]
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Application type reported at open.
    #[inline]
    pub fn app_type(&self) -> AppType {
        self.app_type
    }

    /// Motor angle read when the session was opened.
    #[inline]
    pub fn initial_position(&self) -> i32 {
        self.initial_position
    }

    /// Most recent successful sample.
    #[inline]
    pub fn last_sample(&self) -> Option<Sample> {
        self.last_sample
    }

    /// Mode of the last successful command.
    #[inline]
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Check if the session has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Failed calls of `kind` since the last successful one.
    ///
    /// A successful write does not clear read failures and vice versa.
    #[inline]
    pub fn consecutive_failures(&self, kind: CallKind) -> u32 {
        match kind {
            CallKind::Read => self.read_failures,
            CallKind::Write => self.write_failures,
        }
    }

    pub(crate) fn note_failure(&mut self, kind: CallKind) -> u32 {
        let count = self.failures_mut(kind);
        *count = count.saturating_add(1);
        *count
    }

    pub(crate) fn note_success(&mut self, kind: CallKind) {
        *self.failures_mut(kind) = 0;
    }

    fn failures_mut(&mut self, kind: CallKind) -> &mut u32 {
        match kind {
            CallKind::Read => &mut self.read_failures,
            CallKind::Write => &mut self.write_failures,
        }
    }

    /// Enter the ramp-down phase.
    pub fn begin_ramp_down(&mut self) {
        self.set_state(LoopState::RampingDown);
    }

    fn set_state(&mut self, next: LoopState) {
        if self.state.can_transition_to(next) {
            debug!(port = self.port.as_str(), from = %self.state, to = %next, "state change");
            self.state = next;
        }
    }

    /// Read raw telemetry.
    pub fn read(&mut self) -> core::result::Result<Telemetry, DeviceError> {
        self.handle.read()
    }

    /// Read one sample stamped with `time`.
    pub fn sample(&mut self, time: f64) -> core::result::Result<Sample, DeviceError> {
        let data = self.handle.read()?;
        let sample = Sample {
            motor_angle: data.motor_angle,
            motor_current: data.motor_current,
            motor_voltage: data.motor_voltage,
            time,
        };
        self.last_sample = Some(sample);
        Ok(sample)
    }

    /// Command `value` in `mode`.
    pub fn command(
        &mut self,
        mode: ControlMode,
        value: f64,
    ) -> core::result::Result<(), DeviceError> {
        self.handle.send_command(mode, value)?;
        self.mode = mode;
        Ok(())
    }

    /// Apply controller gains.
    pub fn set_gains(&mut self, gains: &GainSet) -> core::result::Result<(), DeviceError> {
        self.handle.set_gains(gains)
    }

    /// Request bootloader activation.
    pub fn activate_bootloader(&mut self, target_id: u8) -> core::result::Result<(), DeviceError> {
        self.handle.activate_bootloader(target_id)
    }

    /// Poll bootloader status.
    pub fn is_bootloader_active(&mut self) -> core::result::Result<bool, DeviceError> {
        self.handle.is_bootloader_active()
    }

    /// Run pole finding.
    pub fn find_poles(&mut self) -> core::result::Result<(), DeviceError> {
        self.handle.find_poles()
    }

    /// Read that must succeed before the loop can start.
    pub fn setup_read(&mut self) -> Result<Telemetry> {
        self.handle.read().map_err(|e| self.setup_error(e))
    }

    /// Gain change that must succeed before the loop can start.
    pub fn setup_gains(&mut self, gains: &GainSet) -> Result<()> {
        self.handle.set_gains(gains).map_err(|e| self.setup_error(e))
    }

    /// Command that must succeed before the loop can start.
    pub fn setup_command(&mut self, mode: ControlMode, value: f64) -> Result<()> {
        self.command(mode, value).map_err(|e| self.setup_error(e))
    }

    /// Zero the gains and command neutral, ignoring failures.
    pub fn neutralize(&mut self) {
        if let Err(e) = self.handle.set_gains(&GainSet::ZERO) {
            warn!(port = self.port.as_str(), error = %e, "could not zero gains");
        }
        self.command_neutral();
    }

    fn command_neutral(&mut self) {
        if let Err(e) = self.command(ControlMode::None, 0.0) {
            warn!(port = self.port.as_str(), error = %e, "could not command neutral");
        }
    }

    /// Close the device. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Close` if the device reported a failure; the
    /// session counts as closed either way.
    pub fn close(&mut self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.set_state(LoopState::Closed);
        let result = self.handle.close();
        info!(port = self.port.as_str(), "device closed");
        result.map_err(|cause| {
            TransportError::Close {
                port: self.port.clone(),
                cause,
            }
            .into()
        })
    }

    fn setup_error(&self, cause: DeviceError) -> crate::Error {
        TransportError::Setup {
            port: self.port.clone(),
            cause,
        }
        .into()
    }
}

impl<H: DeviceHandle> Drop for DeviceSession<H> {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        if self.mode != ControlMode::None {
            self.command_neutral();
        }
        if let Err(e) = self.close() {
            warn!(error = %e, "close during unwind failed");
        }
    }
}

/// Two sessions driven together, released leader first.
pub struct DevicePair<H: DeviceHandle> {
    /// Device whose motion is read.
    pub leader: DeviceSession<H>,
    /// Device that is commanded.
    pub follower: DeviceSession<H>,
    released: bool,
}

impl<H: DeviceHandle> DevicePair<H> {
    /// Pair two opened sessions.
    pub fn new(leader: DeviceSession<H>, follower: DeviceSession<H>) -> Self {
        Self {
            leader,
            follower,
            released: false,
        }
    }

    /// Neutralize and close both devices in order, pausing `settle` between
    /// neutral and close.
    ///
    /// Both devices are closed even if the first close fails; the first
    /// failure is returned.
    pub fn release<F: FnMut()>(&mut self, mut settle: F) -> Result<()> {
        self.released = true;
        self.leader.neutralize();
        settle();
        let first = self.leader.close();
        self.follower.neutralize();
        settle();
        let second = self.follower.close();
        first.and(second)
    }
}

impl<H: DeviceHandle> Drop for DevicePair<H> {
    fn drop(&mut self) {
        // fields drop leader then follower, closing them in that order
        if !self.released {
            self.leader.neutralize();
            self.follower.neutralize();
        }
    }
}
