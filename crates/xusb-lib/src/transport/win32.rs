//! Windows backend: `CreateFileW` + `DeviceIoControl` on the bus device
//! interface, SetupDi enumeration by interface GUID.

use std::cell::UnsafeCell;
use std::mem;
use std::sync::{Arc, Mutex};

use windows::Win32::Devices::DeviceAndDriverInstallation::*;
use windows::Win32::Foundation::*;
use windows::Win32::Storage::FileSystem::*;
use windows::Win32::System::IO::{CancelIoEx, DeviceIoControl, GetOverlappedResult, OVERLAPPED};
use windows::Win32::System::Threading::CreateEventW;
use windows::core::PCWSTR;

use super::{Discovery, IoResult, PendingIo, Submitted, Transport};
use crate::protocol::XUSB_INTERFACE_GUID;
use crate::status::Status;

/// Map a `windows` crate error (an HRESULT) back onto its Win32 code.
fn status_of(e: &windows::core::Error) -> Status {
    let hr = e.code().0 as u32;
    if hr & 0xFFFF_0000 == 0x8007_0000 {
        Status(hr & 0xFFFF)
    } else {
        Status(hr)
    }
}

// ── Handles ──

/// Kernel handle closed on drop.
struct OwnedHandle(HANDLE);

// SAFETY: kernel handles are process-wide values; every call made on them
// here (DeviceIoControl, GetOverlappedResult, CancelIoEx) is thread-safe.
unsafe impl Send for OwnedHandle {}
unsafe impl Sync for OwnedHandle {}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        // SAFETY: the handle was returned by CreateFileW/CreateEventW and is
        // closed exactly once, here.
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

/// Open bus handle. Pending operations keep it alive until they drain.
#[derive(Clone)]
pub struct WindowsHandle {
    inner: Arc<OwnedHandle>,
    overlapped: bool,
}

impl WindowsHandle {
    fn raw(&self) -> HANDLE {
        self.inner.0
    }
}

fn in_ptr(input: &[u8]) -> Option<*const std::ffi::c_void> {
    if input.is_empty() {
        None
    } else {
        Some(input.as_ptr() as *const _)
    }
}

// ── Pending overlapped operation ──

/// An in-flight overlapped `DeviceIoControl`.
///
/// Owns the OVERLAPPED block, its event and both buffers on the heap so
/// their addresses stay fixed while the kernel holds them. Dropping an
/// unfinished operation cancels it and waits for the cancellation to land
/// before anything is freed.
struct WindowsPending {
    handle: WindowsHandle,
    _event: OwnedHandle,
    overlapped: Box<UnsafeCell<OVERLAPPED>>,
    _input: Box<[u8]>,
    output: Box<UnsafeCell<Vec<u8>>>,
    done: Mutex<Option<IoResult>>,
}

// SAFETY: the OVERLAPPED block and output buffer are only written by the
// kernel while the operation is outstanding and only read after
// GetOverlappedResult reports completion, under the `done` lock.
unsafe impl Send for WindowsPending {}
unsafe impl Sync for WindowsPending {}

impl WindowsPending {
    fn overlapped_ptr(&self) -> *mut OVERLAPPED {
        self.overlapped.get()
    }

    /// Collect the result. `block` waits for completion; otherwise the
    /// operation must already be complete.
    fn finish(&self, block: bool) -> IoResult {
        let mut ret: u32 = 0;
        // SAFETY: the OVERLAPPED block belongs to an operation issued on
        // this handle and lives as long as `self`.
        let r = unsafe {
            GetOverlappedResult(self.handle.raw(), self.overlapped_ptr(), &mut ret, block)
        };
        match r {
            Ok(()) => {
                // SAFETY: the operation has completed, so the kernel no
                // longer writes the output buffer.
                let output = unsafe { &*self.output.get() };
                let n = (ret as usize).min(output.len());
                Ok(output[..n].to_vec())
            }
            Err(e) => Err(status_of(&e)),
        }
    }
}

impl PendingIo for WindowsPending {
    fn wait(&self) -> IoResult {
        let mut done = match self.done.lock() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        };
        if let Some(r) = done.as_ref() {
            return r.clone();
        }
        let r = self.finish(true);
        *done = Some(r.clone());
        r
    }

    fn cancel(&self) {
        // SAFETY: CancelIoEx only targets this operation's OVERLAPPED block;
        // it fails harmlessly once the operation has completed.
        unsafe {
            let _ = CancelIoEx(self.handle.raw(), Some(self.overlapped_ptr() as *const _));
        }
    }
}

impl Drop for WindowsPending {
    fn drop(&mut self) {
        let finished = match self.done.get_mut() {
            Ok(d) => d.is_some(),
            Err(p) => p.into_inner().is_some(),
        };
        if !finished {
            self.cancel();
            let _ = self.finish(true);
        }
    }
}

// ── Transport ──

/// `DeviceIoControl` transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsTransport;

impl Transport for WindowsTransport {
    type Handle = WindowsHandle;

    fn open(&self, path: &str, overlapped: bool) -> Result<WindowsHandle, Status> {
        let wide: Vec<u16> = path.encode_utf16().chain(std::iter::once(0)).collect();
        let flags = if overlapped {
            FILE_FLAG_OVERLAPPED
        } else {
            FILE_ATTRIBUTE_NORMAL
        };
        // SAFETY: `wide` is a NUL-terminated UTF-16 path that outlives the call.
        let handle = unsafe {
            CreateFileW(
                PCWSTR(wide.as_ptr()),
                (GENERIC_READ | GENERIC_WRITE).0,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                None,
                OPEN_EXISTING,
                flags,
                None,
            )
        }
        .map_err(|e| status_of(&e))?;
        Ok(WindowsHandle {
            inner: Arc::new(OwnedHandle(handle)),
            overlapped,
        })
    }

    fn send_receive(
        &self,
        handle: &WindowsHandle,
        code: u32,
        input: &[u8],
        out_capacity: usize,
    ) -> IoResult {
        let mut output = vec![0u8; out_capacity];
        let mut ret: u32 = 0;
        let out_ptr = if out_capacity == 0 {
            None
        } else {
            Some(output.as_mut_ptr() as *mut _)
        };
        // SAFETY: both buffers outlive the synchronous call and their sizes
        // are passed alongside.
        unsafe {
            DeviceIoControl(
                handle.raw(),
                code,
                in_ptr(input),
                input.len() as u32,
                out_ptr,
                out_capacity as u32,
                Some(&mut ret),
                None,
            )
        }
        .map_err(|e| status_of(&e))?;
        output.truncate(ret as usize);
        Ok(output)
    }

    fn submit_overlapped(
        &self,
        handle: &WindowsHandle,
        code: u32,
        input: &[u8],
        out_capacity: usize,
    ) -> Result<Submitted, Status> {
        if !handle.overlapped {
            // ERROR_INVALID_HANDLE
            return Err(Status(6));
        }
        // SAFETY: plain manual-reset, initially unsignaled, unnamed event.
        let event = unsafe { CreateEventW(None, true, false, PCWSTR::null()) }
            .map_err(|e| status_of(&e))?;
        // SAFETY: OVERLAPPED is a plain C struct; all-zero is its initial state.
        let mut ov: OVERLAPPED = unsafe { mem::zeroed() };
        ov.hEvent = event;

        let op = WindowsPending {
            handle: handle.clone(),
            _event: OwnedHandle(event),
            overlapped: Box::new(UnsafeCell::new(ov)),
            _input: input.to_vec().into_boxed_slice(),
            output: Box::new(UnsafeCell::new(vec![0u8; out_capacity])),
            done: Mutex::new(None),
        };

        let out_ptr = if out_capacity == 0 {
            None
        } else {
            // SAFETY: nothing else touches the buffer until the operation
            // completes.
            Some(unsafe { (*op.output.get()).as_mut_ptr() } as *mut _)
        };
        // SAFETY: the OVERLAPPED block and both buffers are heap-owned by
        // `op`, which cancels and drains the operation before freeing them.
        let r = unsafe {
            DeviceIoControl(
                handle.raw(),
                code,
                in_ptr(&op._input),
                op._input.len() as u32,
                out_ptr,
                out_capacity as u32,
                None,
                Some(op.overlapped_ptr()),
            )
        };
        match r {
            Ok(()) => {
                let result = op.finish(false);
                if let Ok(mut done) = op.done.lock() {
                    *done = Some(result.clone());
                }
                result.map(Submitted::Completed)
            }
            Err(e) if status_of(&e).is_pending() => Ok(Submitted::Pending(Arc::new(op))),
            Err(e) => {
                // Nothing was queued, so there is nothing to drain.
                if let Ok(mut done) = op.done.lock() {
                    *done = Some(Err(status_of(&e)));
                }
                Err(status_of(&e))
            }
        }
    }
}

// ── Discovery ──

/// SetupDi enumeration of present XUSB bus interfaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct SetupDiDiscovery;

/// Extract a null-terminated UTF-16 path from SP_DEVICE_INTERFACE_DETAIL_DATA_W.
///
/// # Safety
/// `detail` must point to a valid, fully initialized SP_DEVICE_INTERFACE_DETAIL_DATA_W.
unsafe fn extract_path(detail: &SP_DEVICE_INTERFACE_DETAIL_DATA_W) -> String {
    let ptr = &detail.DevicePath as *const u16;
    let mut len = 0;
    // SAFETY: caller guarantees `detail` is fully initialized; the path is
    // NUL-terminated within the buffer SetupDi filled.
    unsafe {
        while *ptr.add(len) != 0 {
            len += 1;
        }
        String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len))
    }
}

impl Discovery for SetupDiDiscovery {
    fn enumerate_paths(&self) -> Vec<String> {
        // SAFETY: a NULL enumerator and no parent window are valid inputs.
        let dev_info = match unsafe {
            SetupDiGetClassDevsW(
                Some(&XUSB_INTERFACE_GUID),
                PCWSTR::null(),
                None,
                DIGCF_PRESENT | DIGCF_DEVICEINTERFACE,
            )
        } {
            Ok(h) => h,
            Err(e) => {
                log::warn!("SetupDiGetClassDevsW failed: {e}");
                return Vec::new();
            }
        };

        // SAFETY: dev_info is a valid device information set.
        let paths = unsafe { enumerate_inner(dev_info) };
        // SAFETY: destroyed exactly once after enumeration.
        unsafe {
            let _ = SetupDiDestroyDeviceInfoList(dev_info);
        }
        paths
    }
}

/// # Safety
/// `dev_info` must be a valid device information set.
unsafe fn enumerate_inner(dev_info: HDEVINFO) -> Vec<String> {
    let mut paths = Vec::new();
    for index in 0u32.. {
        let mut iface = SP_DEVICE_INTERFACE_DATA {
            cbSize: mem::size_of::<SP_DEVICE_INTERFACE_DATA>() as u32,
            ..Default::default()
        };
        // SAFETY: dev_info is valid; iface is sized and initialized above.
        if unsafe {
            SetupDiEnumDeviceInterfaces(dev_info, None, &XUSB_INTERFACE_GUID, index, &mut iface)
        }
        .is_err()
        {
            break;
        }
        let mut req: u32 = 0;
        // SAFETY: first call with no buffer queries the required size.
        let _ = unsafe {
            SetupDiGetDeviceInterfaceDetailW(dev_info, &iface, None, 0, Some(&mut req), None)
        };
        if req == 0 {
            continue;
        }
        let mut buf = vec![0u8; req as usize];
        // SAFETY: buf is req bytes, large enough for the detail struct.
        let detail = unsafe { &mut *(buf.as_mut_ptr() as *mut SP_DEVICE_INTERFACE_DETAIL_DATA_W) };
        detail.cbSize = mem::size_of::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>() as u32;
        // SAFETY: detail is req bytes long and cbSize is set.
        if unsafe {
            SetupDiGetDeviceInterfaceDetailW(dev_info, &iface, Some(detail), req, None, None)
        }
        .is_ok()
        {
            // SAFETY: detail was just filled by SetupDiGetDeviceInterfaceDetailW.
            paths.push(unsafe { extract_path(detail) });
        }
    }
    paths
}
