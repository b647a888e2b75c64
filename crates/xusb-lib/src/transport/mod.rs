//! Device-control transport and bus discovery.
//!
//! [`Transport`] opens bus handles and exchanges buffered control requests,
//! synchronously or overlapped. [`Discovery`] lists the device paths that
//! expose the XUSB bus interface. Both are consumed by the registry and the
//! dispatcher; the Windows backend implements them on top of
//! `DeviceIoControl` and SetupDi, the mock backend simulates a driver in
//! memory.

use std::fmt;
use std::sync::Arc;

use crate::status::Status;

#[cfg(windows)]
mod win32;
#[cfg(windows)]
pub use self::win32::{SetupDiDiscovery, WindowsHandle, WindowsTransport};

#[doc(hidden)]
pub mod mock;

/// Outcome of a transport call: the bytes the driver returned (already
/// truncated to the reported count) or the failure status.
pub type IoResult = std::result::Result<Vec<u8>, Status>;

/// An overlapped operation that has not completed yet.
pub trait PendingIo: Send + Sync {
    /// Block until the operation completes or is cancelled.
    ///
    /// A cancelled operation reports a cancellation status. Calling `wait`
    /// again after completion returns the same result.
    fn wait(&self) -> IoResult;

    /// Request cancellation. Idempotent; a no-op once the operation is done.
    fn cancel(&self);
}

/// Result of submitting an overlapped operation.
pub enum Submitted {
    /// The driver had data ready and completed the call immediately.
    Completed(Vec<u8>),
    /// The driver pended the call.
    Pending(Arc<dyn PendingIo>),
}

impl fmt::Debug for Submitted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Submitted::Completed(b) => f.debug_tuple("Completed").field(&b.len()).finish(),
            Submitted::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Device-control channel to a bus.
pub trait Transport: Send + Sync + 'static {
    /// Open handle to one bus. Released when dropped.
    type Handle: Send + Sync + 'static;

    /// Open `path`. `overlapped` handles accept [`submit_overlapped`].
    ///
    /// [`submit_overlapped`]: Transport::submit_overlapped
    fn open(&self, path: &str, overlapped: bool) -> Result<Self::Handle, Status>;

    /// Send `input` and block for at most `out_capacity` bytes of reply.
    fn send_receive(
        &self,
        handle: &Self::Handle,
        code: u32,
        input: &[u8],
        out_capacity: usize,
    ) -> IoResult;

    /// Submit an overlapped request on a handle opened with `overlapped`.
    fn submit_overlapped(
        &self,
        handle: &Self::Handle,
        code: u32,
        input: &[u8],
        out_capacity: usize,
    ) -> Result<Submitted, Status>;
}

/// Lists device paths exposing the XUSB bus interface, in OS order.
pub trait Discovery: Send + Sync {
    fn enumerate_paths(&self) -> Vec<String>;
}

impl<F> Discovery for F
where
    F: Fn() -> Vec<String> + Send + Sync,
{
    fn enumerate_paths(&self) -> Vec<String> {
        self()
    }
}

// ── Stub backend for unsupported platforms ──

/// Transport that opens nothing. Lets the crate build and test on hosts
/// without the XUSB driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubTransport;

/// Discovery that finds nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubDiscovery;

/// ERROR_FILE_NOT_FOUND
const STUB_OPEN_STATUS: Status = Status(2);

impl Transport for StubTransport {
    type Handle = ();

    fn open(&self, _path: &str, _overlapped: bool) -> Result<(), Status> {
        Err(STUB_OPEN_STATUS)
    }

    fn send_receive(&self, _: &(), _: u32, _: &[u8], _: usize) -> IoResult {
        Err(STUB_OPEN_STATUS)
    }

    fn submit_overlapped(&self, _: &(), _: u32, _: &[u8], _: usize) -> Result<Submitted, Status> {
        Err(STUB_OPEN_STATUS)
    }
}

impl Discovery for StubDiscovery {
    fn enumerate_paths(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Concrete transport for the current platform.
#[cfg(windows)]
pub type PlatformTransport = WindowsTransport;
#[cfg(not(windows))]
pub type PlatformTransport = StubTransport;

/// Concrete discovery for the current platform.
#[cfg(windows)]
pub type PlatformDiscovery = SetupDiDiscovery;
#[cfg(not(windows))]
pub type PlatformDiscovery = StubDiscovery;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_opens_nothing() {
        assert_eq!(StubTransport.open("\\\\?\\bus", false), Err(Status(2)));
        assert!(StubDiscovery.enumerate_paths().is_empty());
    }

    #[test]
    fn closures_are_discovery() {
        let d = || vec!["a".to_string(), "b".to_string()];
        assert_eq!(d.enumerate_paths(), vec!["a", "b"]);
    }

    #[test]
    fn submitted_debug_hides_payload() {
        assert_eq!(
            format!("{:?}", Submitted::Completed(vec![0; 29])),
            "Completed(29)"
        );
    }
}
