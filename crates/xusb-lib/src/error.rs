//! Unified error type for the xusb-lib crate.
//!
//! [`XusbError`] covers caller errors, lookups that missed after a refresh,
//! opaque transport failures and the ambient config/I/O layers. `From` impls
//! allow `?` to propagate across module boundaries seamlessly.
//!
//! Operations the bus's protocol version does not support are never errors:
//! they return `Ok` with a default payload.

use std::fmt;

use crate::status::Status;
use crate::wire::WireError;

/// Unified error type for xusb-lib operations.
#[derive(Debug)]
pub enum XusbError {
    /// Caller passed an invalid argument; detected before any I/O.
    InvalidArgument(String),
    /// No bus with this instance index, even after a refresh.
    BusNotFound(u8),
    /// No device with this user index, even after a refresh.
    DeviceNotFound(u8),
    /// The device-control channel reported a failure status.
    Transport(Status),
    /// A wait is already outstanding for this user index.
    Busy(u8),
    /// The driver returned a malformed response.
    Protocol(String),
    /// The bus was evicted by a refresh and its handles released.
    Disposed,
    /// Standard I/O error (config persistence).
    Io(std::io::Error),
    /// Configuration validation error.
    Config(String),
}

impl XusbError {
    /// Map this error onto the raw status space for callers that want the
    /// driver's numeric model.
    pub fn status(&self) -> Status {
        match self {
            XusbError::Transport(s) => *s,
            XusbError::BusNotFound(_) | XusbError::DeviceNotFound(_) | XusbError::Disposed => {
                Status::DEVICE_NOT_CONNECTED
            }
            XusbError::Busy(_) => Status::OPERATION_IN_PROGRESS,
            // ERROR_INVALID_PARAMETER
            XusbError::InvalidArgument(_) | XusbError::Config(_) => Status(87),
            // ERROR_INVALID_DATA
            XusbError::Protocol(_) => Status(13),
            XusbError::Io(e) => e
                .raw_os_error()
                .map(|c| Status(c as u32))
                // ERROR_GEN_FAILURE
                .unwrap_or(Status(31)),
        }
    }

    /// Whether this error is a cancelled wait.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, XusbError::Transport(s) if s.is_cancellation())
    }

    /// Whether this error means the device is gone.
    pub fn is_not_connected(&self) -> bool {
        matches!(
            self,
            XusbError::Transport(Status::DEVICE_NOT_CONNECTED) | XusbError::DeviceNotFound(_)
        )
    }
}

impl fmt::Display for XusbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XusbError::InvalidArgument(e) => write!(f, "Invalid argument: {e}"),
            XusbError::BusNotFound(i) => write!(f, "Bus {i} not found"),
            XusbError::DeviceNotFound(i) => write!(f, "Device {i} not found"),
            XusbError::Transport(s) => write!(f, "Driver request failed: {s}"),
            XusbError::Busy(i) => write!(f, "A wait is already outstanding for device {i}"),
            XusbError::Protocol(e) => write!(f, "Protocol error: {e}"),
            XusbError::Disposed => write!(f, "Bus handle has been released"),
            XusbError::Io(e) => write!(f, "I/O error: {e}"),
            XusbError::Config(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for XusbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            XusbError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Status> for XusbError {
    fn from(s: Status) -> Self {
        XusbError::Transport(s)
    }
}

impl From<WireError> for XusbError {
    fn from(e: WireError) -> Self {
        XusbError::Protocol(e.to_string())
    }
}

impl From<std::io::Error> for XusbError {
    fn from(e: std::io::Error) -> Self {
        XusbError::Io(e)
    }
}

/// Crate-level Result alias using [`XusbError`].
pub type Result<T> = std::result::Result<T, XusbError>;
