//! In-memory XUSB driver for unit and integration tests.
//!
//! Always compiled (zero runtime cost), hidden from public docs. The driver
//! decodes requests and encodes replies with the crate's own wire codec, so
//! it answers exactly as many bytes as the real layouts define. Tests script
//! buses and slots, inject failures per control code, inspect the recorded
//! requests, and complete or observe pending waits.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{Discovery, IoResult, PendingIo, Submitted, Transport};
use crate::protocol::*;
use crate::status::Status;
use crate::wire::{
    AudioDeviceInfo, BatteryInfo, BusInfo, BusInfoEx, CapabilitiesV1, CapabilitiesV2,
    InputStateV0, InputStateV1, LedSetting, LedState, ProtocolVersion, Vibration,
};

/// ERROR_INVALID_PARAMETER, returned for malformed requests.
pub const INVALID_PARAMETER: Status = Status(87);

/// ERROR_GEN_FAILURE, returned for a slot whose LED cannot be read.
pub const GEN_FAILURE: Status = Status(31);

/// ERROR_FILE_NOT_FOUND, returned when opening an unknown path.
pub const FILE_NOT_FOUND: Status = Status(2);

/// One occupied slot.
#[derive(Debug, Clone)]
pub struct MockSlot {
    pub input: InputStateV1,
    /// `None` makes LED queries fail.
    pub led: Option<u8>,
    pub caps: CapabilitiesV2,
    /// Indexed by sub-device (gamepad, headset).
    pub battery: [BatteryInfo; 2],
    pub audio: AudioDeviceInfo,
    pub vibration: Vibration,
    /// Bytes a wait completes with immediately. `None` pends the wait.
    pub wait_reply: Option<Vec<u8>>,
}

impl MockSlot {
    /// A connected slot with no LED pattern set.
    pub fn connected() -> Self {
        MockSlot {
            input: InputStateV1 {
                version: ProtocolVersion::V1_1.raw(),
                status: 1,
                ..Default::default()
            },
            led: Some(LedSetting::Off.raw()),
            caps: CapabilitiesV2 {
                device_type: 1,
                device_subtype: 1,
                vendor_id: 0x045E,
                product_id: 0x028E,
                ..Default::default()
            },
            battery: [
                BatteryInfo {
                    battery_type: 0x01,
                    level: 0x03,
                    ..Default::default()
                },
                BatteryInfo::default(),
            ],
            audio: AudioDeviceInfo::default(),
            vibration: Vibration::ZERO,
            wait_reply: None,
        }
    }

    pub fn with_led(mut self, led: LedSetting) -> Self {
        self.led = Some(led.raw());
        self
    }

    /// LED queries on this slot fail.
    pub fn without_led(mut self) -> Self {
        self.led = None;
        self
    }

    pub fn with_input(mut self, input: InputStateV1) -> Self {
        self.input = input;
        self
    }

    pub fn with_wait_reply(mut self, reply: Vec<u8>) -> Self {
        self.wait_reply = Some(reply);
        self
    }
}

/// One bus instance.
#[derive(Debug, Clone)]
pub struct MockBus {
    pub path: String,
    pub info: BusInfo,
    pub info_ex: BusInfoEx,
    pub slots: BTreeMap<u8, MockSlot>,
    /// Opening this bus fails.
    pub fail_open: bool,
    /// Control codes that fail with the given status.
    pub failures: HashMap<u32, Status>,
}

impl MockBus {
    pub fn new(path: &str, version: ProtocolVersion, max_count: u8) -> Self {
        MockBus {
            path: path.to_string(),
            info: BusInfo {
                version: version.raw(),
                max_count,
                vendor_id: 0x045E,
                product_id: 0x02A1,
                ..Default::default()
            },
            info_ex: BusInfoEx::default(),
            slots: BTreeMap::new(),
            fail_open: false,
            failures: HashMap::new(),
        }
    }

    pub fn with_slot(mut self, index: u8, slot: MockSlot) -> Self {
        self.slots.insert(index, slot);
        self.info.device_count = self.slots.len() as u8;
        self
    }

    pub fn with_status(mut self, status: u8) -> Self {
        self.info.status = status;
        self
    }

    pub fn with_failure(mut self, code: u32, status: Status) -> Self {
        self.failures.insert(code, status);
        self
    }

    pub fn with_info_ex(mut self, info_ex: BusInfoEx) -> Self {
        self.info_ex = info_ex;
        self
    }

    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::from_raw(self.info.version)
    }
}

/// A request the driver received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub path: String,
    pub code: u32,
    pub input: Vec<u8>,
    pub overlapped: bool,
}

/// Handle to a mock bus. Counts towards [`MockDriver::open_handles`] until
/// dropped.
#[derive(Debug)]
pub struct MockHandle {
    path: String,
    overlapped: bool,
    open: Arc<AtomicUsize>,
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A pended wait, completed by the test or cancelled by the caller.
#[derive(Default)]
pub struct MockPending {
    result: Mutex<Option<IoResult>>,
    cv: Condvar,
}

impl MockPending {
    fn complete(&self, r: IoResult) -> bool {
        let mut g = lock(&self.result);
        if g.is_some() {
            return false;
        }
        *g = Some(r);
        self.cv.notify_all();
        true
    }

    pub fn is_done(&self) -> bool {
        lock(&self.result).is_some()
    }
}

impl PendingIo for MockPending {
    fn wait(&self) -> IoResult {
        let mut g = lock(&self.result);
        loop {
            if let Some(r) = g.as_ref() {
                return r.clone();
            }
            g = match self.cv.wait(g) {
                Ok(g) => g,
                Err(p) => p.into_inner(),
            };
        }
    }

    fn cancel(&self) {
        self.complete(Err(Status::OPERATION_ABORTED));
    }
}

#[derive(Default)]
struct DriverState {
    buses: Vec<MockBus>,
    requests: Vec<Request>,
    pending: Vec<Arc<MockPending>>,
}

/// Simulated XUSB driver: transport and discovery in one.
#[derive(Default)]
pub struct MockDriver {
    state: Mutex<DriverState>,
    pending_cv: Condvar,
    open: Arc<AtomicUsize>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(p) => p.into_inner(),
    }
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bus(self, bus: MockBus) -> Self {
        self.add_bus(bus);
        self
    }

    pub fn add_bus(&self, bus: MockBus) {
        lock(&self.state).buses.push(bus);
    }

    /// Unplug a bus: it disappears from discovery and its handles fail.
    pub fn remove_bus(&self, path: &str) {
        lock(&self.state).buses.retain(|b| b.path != path);
    }

    /// Edit a bus in place.
    pub fn update_bus(&self, path: &str, f: impl FnOnce(&mut MockBus)) {
        let mut st = lock(&self.state);
        if let Some(bus) = st.buses.iter_mut().find(|b| b.path == path) {
            f(bus);
        }
    }

    /// Read a copy of a bus.
    pub fn bus(&self, path: &str) -> Option<MockBus> {
        lock(&self.state)
            .buses
            .iter()
            .find(|b| b.path == path)
            .cloned()
    }

    pub fn requests(&self) -> Vec<Request> {
        lock(&self.state).requests.clone()
    }

    pub fn requests_for(&self, code: u32) -> Vec<Request> {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.code == code)
            .cloned()
            .collect()
    }

    pub fn clear_requests(&self) {
        lock(&self.state).requests.clear();
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Number of waits pended and not yet completed or cancelled.
    pub fn pending_count(&self) -> usize {
        lock(&self.state)
            .pending
            .iter()
            .filter(|p| !p.is_done())
            .count()
    }

    /// Block until at least `n` waits are pending, or `timeout` elapses.
    pub fn wait_for_pending(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut st = lock(&self.state);
        loop {
            if st.pending.iter().filter(|p| !p.is_done()).count() >= n {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            st = match self.pending_cv.wait_timeout(st, deadline - now) {
                Ok((g, _)) => g,
                Err(p) => p.into_inner().0,
            };
        }
    }

    /// Complete every outstanding wait with `reply`. Returns how many were
    /// completed.
    pub fn complete_pending(&self, reply: IoResult) -> usize {
        let pending = std::mem::take(&mut lock(&self.state).pending);
        pending
            .iter()
            .filter(|p| p.complete(reply.clone()))
            .count()
    }

    fn dispatch(&self, handle: &MockHandle, code: u32, input: &[u8], overlapped: bool) -> Reply {
        let mut st = lock(&self.state);
        st.requests.push(Request {
            path: handle.path.clone(),
            code,
            input: input.to_vec(),
            overlapped,
        });
        let Some(bus) = st.buses.iter_mut().find(|b| b.path == handle.path) else {
            return Reply::Done(Err(Status::DEVICE_NOT_CONNECTED));
        };
        if let Some(status) = bus.failures.get(&code) {
            return Reply::Done(Err(*status));
        }
        handle_request(bus, code, input)
    }
}

enum Reply {
    Done(IoResult),
    Pend,
}

fn slot_index(input: &[u8], size: usize) -> Result<u8, Status> {
    if input.len() != size {
        return Err(INVALID_PARAMETER);
    }
    Ok(if size == 1 { input[0] } else { input[2] })
}

fn handle_request(bus: &mut MockBus, code: u32, input: &[u8]) -> Reply {
    let version = bus.version();
    let r: IoResult = match code {
        IOCTL_BUS_GET_INFORMATION => Ok(bus.info.encode().to_vec()),
        IOCTL_BUS_GET_INFORMATION_EX => {
            if input.len() != 36 {
                Err(INVALID_PARAMETER)
            } else {
                Ok(bus.info_ex.encode())
            }
        }
        IOCTL_DEVICE_GET_INPUT => {
            let size = if version == ProtocolVersion::V1_0 { 1 } else { 3 };
            slot_index(input, size).and_then(|i| {
                let slot = bus.slots.get(&i).ok_or(Status::DEVICE_NOT_CONNECTED)?;
                if version == ProtocolVersion::V1_0 {
                    let s = InputStateV0 {
                        status: slot.input.status,
                        packet_number: slot.input.packet_number,
                        gamepad: slot.input.gamepad.standard(),
                        ..Default::default()
                    };
                    Ok(s.encode().to_vec())
                } else {
                    let mut s = slot.input;
                    s.version = version.raw();
                    Ok(s.encode().to_vec())
                }
            })
        }
        IOCTL_DEVICE_GET_LED_STATE => slot_index(input, 3).and_then(|i| {
            let slot = bus.slots.get(&i).ok_or(Status::DEVICE_NOT_CONNECTED)?;
            let led = slot.led.ok_or(GEN_FAILURE)?;
            Ok(LedState {
                version: version.raw(),
                led,
            }
            .encode()
            .to_vec())
        }),
        IOCTL_DEVICE_SET_STATE => {
            if input.len() != 5 {
                Err(INVALID_PARAMETER)
            } else {
                match bus.slots.get_mut(&input[0]) {
                    None => Err(Status::DEVICE_NOT_CONNECTED),
                    Some(slot) => {
                        if input[4] & 1 != 0 {
                            slot.led = Some(input[1]);
                        }
                        if input[4] & 2 != 0 {
                            slot.vibration = Vibration::new(input[2], input[3]);
                        }
                        Ok(Vec::new())
                    }
                }
            }
        }
        IOCTL_DEVICE_GET_CAPABILITIES => slot_index(input, 3).and_then(|i| {
            let slot = bus.slots.get(&i).ok_or(Status::DEVICE_NOT_CONNECTED)?;
            let c = slot.caps;
            if u16::from_le_bytes([input[0], input[1]]) == ProtocolVersion::V1_1.raw() {
                Ok(CapabilitiesV1 {
                    version: ProtocolVersion::V1_1.raw(),
                    device_type: c.device_type,
                    device_subtype: c.device_subtype,
                    gamepad: c.gamepad,
                    vibration: c.vibration,
                }
                .encode()
                .to_vec())
            } else {
                Ok(CapabilitiesV2 {
                    version: version.raw(),
                    ..c
                }
                .encode()
                .to_vec())
            }
        }),
        IOCTL_DEVICE_GET_BATTERY_INFORMATION => slot_index(input, 4).and_then(|i| {
            let slot = bus.slots.get(&i).ok_or(Status::DEVICE_NOT_CONNECTED)?;
            let b = slot
                .battery
                .get(input[3] as usize)
                .ok_or(INVALID_PARAMETER)?;
            Ok(BatteryInfo {
                version: version.raw(),
                ..*b
            }
            .encode()
            .to_vec())
        }),
        IOCTL_DEVICE_GET_AUDIO_DEVICE_INFORMATION => slot_index(input, 3).and_then(|i| {
            let slot = bus.slots.get(&i).ok_or(Status::DEVICE_NOT_CONNECTED)?;
            Ok(AudioDeviceInfo {
                version: version.raw(),
                ..slot.audio
            }
            .encode()
            .to_vec())
        }),
        IOCTL_DEVICE_POWER_OFF => slot_index(input, 3).and_then(|i| {
            bus.slots
                .remove(&i)
                .ok_or(Status::DEVICE_NOT_CONNECTED)?;
            bus.info.device_count = bus.slots.len() as u8;
            Ok(Vec::new())
        }),
        IOCTL_DEVICE_WAIT_FOR_GUIDE | IOCTL_DEVICE_WAIT_FOR_INPUT => {
            let size = if code == IOCTL_DEVICE_WAIT_FOR_GUIDE { 3 } else { 4 };
            match slot_index(input, size) {
                Err(e) => Err(e),
                Ok(i) => match bus.slots.get(&i) {
                    None => Err(Status::DEVICE_NOT_CONNECTED),
                    Some(slot) => match &slot.wait_reply {
                        Some(bytes) => Ok(bytes.clone()),
                        None => return Reply::Pend,
                    },
                },
            }
        }
        _ => Err(INVALID_PARAMETER),
    };
    Reply::Done(r)
}

impl Transport for MockDriver {
    type Handle = MockHandle;

    fn open(&self, path: &str, overlapped: bool) -> Result<MockHandle, Status> {
        let st = lock(&self.state);
        match st.buses.iter().find(|b| b.path == path) {
            None => Err(FILE_NOT_FOUND),
            Some(b) if b.fail_open => Err(Status::DEVICE_NOT_CONNECTED),
            Some(_) => {
                self.open.fetch_add(1, Ordering::SeqCst);
                Ok(MockHandle {
                    path: path.to_string(),
                    overlapped,
                    open: Arc::clone(&self.open),
                })
            }
        }
    }

    fn send_receive(
        &self,
        handle: &MockHandle,
        code: u32,
        input: &[u8],
        out_capacity: usize,
    ) -> IoResult {
        match self.dispatch(handle, code, input, false) {
            Reply::Done(Ok(mut bytes)) => {
                bytes.truncate(out_capacity);
                Ok(bytes)
            }
            Reply::Done(Err(e)) => Err(e),
            // A synchronous handle cannot pend; the real driver would block.
            Reply::Pend => Err(INVALID_PARAMETER),
        }
    }

    fn submit_overlapped(
        &self,
        handle: &MockHandle,
        code: u32,
        input: &[u8],
        out_capacity: usize,
    ) -> Result<Submitted, Status> {
        if !handle.overlapped {
            // ERROR_INVALID_HANDLE
            return Err(Status(6));
        }
        match self.dispatch(handle, code, input, true) {
            Reply::Done(Ok(mut bytes)) => {
                bytes.truncate(out_capacity);
                Ok(Submitted::Completed(bytes))
            }
            Reply::Done(Err(e)) => Err(e),
            Reply::Pend => {
                let p = Arc::new(MockPending::default());
                lock(&self.state).pending.push(Arc::clone(&p));
                self.pending_cv.notify_all();
                Ok(Submitted::Pending(p))
            }
        }
    }
}

impl Discovery for MockDriver {
    fn enumerate_paths(&self) -> Vec<String> {
        lock(&self.state)
            .buses
            .iter()
            .map(|b| b.path.clone())
            .collect()
    }
}
