//! Transport status codes.
//!
//! The driver channel reports raw Win32 error codes. Only a handful of them
//! carry protocol meaning; every other value is passed through untouched.

use std::fmt;

use serde::Serialize;

/// A raw status code reported by the device-control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Status(pub u32);

impl Status {
    pub const SUCCESS: Status = Status(0);
    pub const OPERATION_IN_PROGRESS: Status = Status(329);
    /// Reported by the OS when an overlapped operation was cancelled.
    pub const OPERATION_ABORTED: Status = Status(995);
    pub const IO_PENDING: Status = Status(997);
    pub const DEVICE_NOT_CONNECTED: Status = Status(1167);
    pub const CANCELLED: Status = Status(1223);

    pub fn code(self) -> u32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == Status::SUCCESS
    }

    pub fn is_pending(self) -> bool {
        self == Status::IO_PENDING
    }

    /// Whether this status means the operation was cancelled, by either the
    /// caller or the OS.
    pub fn is_cancellation(self) -> bool {
        self == Status::CANCELLED || self == Status::OPERATION_ABORTED
    }

    /// Convert to `Ok(())` on success, or the status itself on failure.
    pub fn ok(self) -> Result<(), Status> {
        if self.is_success() { Ok(()) } else { Err(self) }
    }

    fn name(self) -> Option<&'static str> {
        match self {
            Status::SUCCESS => Some("success"),
            Status::OPERATION_IN_PROGRESS => Some("operation in progress"),
            Status::OPERATION_ABORTED => Some("operation aborted"),
            Status::IO_PENDING => Some("I/O pending"),
            Status::DEVICE_NOT_CONNECTED => Some("device not connected"),
            Status::CANCELLED => Some("cancelled"),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "Win32 error {}", self.0),
        }
    }
}

impl From<u32> for Status {
    fn from(code: u32) -> Self {
        Status(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_have_win32_values() {
        assert_eq!(Status::SUCCESS.code(), 0);
        assert_eq!(Status::OPERATION_IN_PROGRESS.code(), 329);
        assert_eq!(Status::IO_PENDING.code(), 997);
        assert_eq!(Status::DEVICE_NOT_CONNECTED.code(), 1167);
        assert_eq!(Status::CANCELLED.code(), 1223);
    }

    #[test]
    fn ok_maps_success_only() {
        assert_eq!(Status::SUCCESS.ok(), Ok(()));
        assert_eq!(Status(5).ok(), Err(Status(5)));
    }

    #[test]
    fn cancellation_covers_both_codes() {
        assert!(Status::CANCELLED.is_cancellation());
        assert!(Status::OPERATION_ABORTED.is_cancellation());
        assert!(!Status::DEVICE_NOT_CONNECTED.is_cancellation());
    }

    #[test]
    fn display_named_and_opaque() {
        assert_eq!(
            Status::DEVICE_NOT_CONNECTED.to_string(),
            "device not connected (1167)"
        );
        assert_eq!(Status(31).to_string(), "Win32 error 31");
    }

    #[test]
    fn serializes_as_number() {
        assert_eq!(serde_json::to_string(&Status(1167)).unwrap(), "1167");
    }
}
