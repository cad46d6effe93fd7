//! Error types for actuator-demos.
//!
//! Provides unified error handling across parameter validation, device
//! transport, and demo execution.

use core::fmt;

use crate::params::ParamType;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Bounded parameter or identifier name carried by errors.
pub type Name = heapless::String<32>;

/// Bounded free-form message carried by errors.
pub type Message = heapless::String<128>;

/// Bounded port identifier.
pub type PortName = heapless::String<128>;

/// Unified error type for all demo operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Parameter or configuration validation failed (raised before any device opens)
    Validation(ValidationError),
    /// A requested mode, signal, or device type is not supported
    Unsupported(UnsupportedError),
    /// Device transport failure that could not be recovered
    Transport(TransportError),
    /// Parameter file could not be read or parsed
    Config(ConfigError),
}

/// Parameter validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required parameter is absent
    MissingParameter(Name),
    /// A parameter is present but has the wrong type
    TypeMismatch {
        /// Parameter name
        name: Name,
        /// Declared type
        expected: ParamType,
        /// Type actually found
        found: ParamType,
    },
    /// A parameter has the right type but an unusable value
    InvalidParameter {
        /// Parameter name
        name: Name,
        /// Why the value was rejected
        reason: &'static str,
    },
    /// A multi-device demo got the wrong number of ports
    WrongDeviceCount {
        /// Ports the demo needs
        expected: usize,
        /// Ports configured
        found: usize,
    },
}

/// Unsupported mode errors.
#[derive(Debug, Clone, PartialEq)]
pub enum UnsupportedError {
    /// Unknown signal kind requested from the sample generator
    Signal(Name),
    /// Unknown high-speed controller type
    Controller(Name),
    /// Unknown bootloader target
    BootloaderTarget(Name),
    /// Device reported an application type the demos cannot drive
    AppType(i32),
}

/// Failure reported by a [`DeviceHandle`](crate::device::DeviceHandle) call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// Underlying I/O failure
    Io(Message),
    /// Device did not answer in time
    Timeout,
    /// Device is no longer connected
    Disconnected,
    /// Device rejected the request
    Rejected(Message),
}

/// Transport errors that abort a demo.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Opening the port failed
    Open {
        /// Port being opened
        port: PortName,
        /// Device-level cause
        cause: DeviceError,
    },
    /// A setup command before the tick loop failed
    Setup {
        /// Port of the session
        port: PortName,
        /// Device-level cause
        cause: DeviceError,
    },
    /// Per-tick failures kept happening past the error budget
    Persistent {
        /// Port of the session
        port: PortName,
        /// Consecutive failures observed
        failures: u32,
        /// Last device-level cause
        cause: DeviceError,
    },
    /// Closing the port reported a failure
    Close {
        /// Port of the session
        port: PortName,
        /// Device-level cause
        cause: DeviceError,
    },
}

/// Parameter file errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse the parameter file
    ParseError(Message),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(Message),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Unsupported(e) => write!(f, "Unsupported: {}", e),
            Error::Transport(e) => write!(f, "Transport error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingParameter(name) => {
                write!(f, "'{}' not found in parameter file", name)
            }
            ValidationError::TypeMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "'{}' must be of type {}, found {}",
                name, expected, found
            ),
            ValidationError::InvalidParameter { name, reason } => {
                write!(f, "Invalid value for '{}': {}", name, reason)
            }
            ValidationError::WrongDeviceCount { expected, found } => {
                write!(f, "Need {} devices. Got: {}", expected, found)
            }
        }
    }
}

impl fmt::Display for UnsupportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsupportedError::Signal(kind) => write!(f, "Unsupported signal type: '{}'", kind),
            UnsupportedError::Controller(kind) => {
                write!(f, "Unsupported controller type: '{}'", kind)
            }
            UnsupportedError::BootloaderTarget(target) => {
                write!(f, "Unknown bootloader target: '{}'", target)
            }
            UnsupportedError::AppType(code) => {
                write!(f, "Unsupported application type: {}", code)
            }
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Io(msg) => write!(f, "I/O failure: {}", msg),
            DeviceError::Timeout => write!(f, "device did not respond"),
            DeviceError::Disconnected => write!(f, "device disconnected"),
            DeviceError::Rejected(msg) => write!(f, "request rejected: {}", msg),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Open { port, cause } => {
                write!(f, "could not open '{}': {}", port, cause)
            }
            TransportError::Setup { port, cause } => {
                write!(f, "setup of '{}' failed: {}", port, cause)
            }
            TransportError::Persistent {
                port,
                failures,
                cause,
            } => write!(
                f,
                "'{}' failed {} times in a row, last: {}",
                port, failures, cause
            ),
            TransportError::Close { port, cause } => {
                write!(f, "closing '{}' failed: {}", port, cause)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

// Conversion impls
impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<UnsupportedError> for Error {
    fn from(e: UnsupportedError) -> Self {
        Error::Unsupported(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

/// Copy `s` into a bounded string, truncating on a char boundary if needed.
pub(crate) fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ValidationError {}

#[cfg(feature = "std")]
impl std::error::Error for UnsupportedError {}

#[cfg(feature = "std")]
impl std::error::Error for DeviceError {}

#[cfg(feature = "std")]
impl std::error::Error for TransportError {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}
