//! Async wait engine — at most one outstanding wait per user index.
//!
//! A wait moves through Idle → Pending → {Completed, Cancelled, Faulted} →
//! Idle. The busy check and slot creation happen under one engine-wide lock.
//! [`WaitEngine::cancel`] releases the slot and cancels the in-flight
//! request; the blocked caller then sees [`Status::CANCELLED`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::dispatch::WaitKind;
use crate::error::{Result, XusbError};
use crate::protocol::ioctl_name;
use crate::status::Status;
use crate::transport::{PendingIo, Submitted, Transport};
use crate::wire::{InputState, InputStateV1};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(p) => p.into_inner(),
    }
}

#[derive(Default)]
struct SlotState {
    cancelled: bool,
    io: Option<Arc<dyn PendingIo>>,
}

/// Wait primitive for one key while a wait is live.
#[derive(Default)]
struct WaitSlot {
    state: Mutex<SlotState>,
}

impl WaitSlot {
    /// Attach the in-flight request, or cancel it at once if the slot was
    /// cancelled before the request was issued.
    fn attach(&self, io: &Arc<dyn PendingIo>) {
        let mut st = lock(&self.state);
        if st.cancelled {
            io.cancel();
        }
        st.io = Some(Arc::clone(io));
    }

    fn cancel(&self) {
        let mut st = lock(&self.state);
        st.cancelled = true;
        if let Some(io) = st.io.as_ref() {
            io.cancel();
        }
    }
}

/// Tracks outstanding waits, keyed by user index.
#[derive(Default)]
pub struct WaitEngine {
    slots: Mutex<HashMap<u8, Arc<WaitSlot>>>,
}

/// Removes a slot from the engine when its wait ends, unless a cancel (and
/// possibly a newer wait) already replaced it.
struct SlotGuard<'a> {
    engine: &'a WaitEngine,
    key: u8,
    slot: Arc<WaitSlot>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut slots = lock(&self.engine.slots);
        if slots
            .get(&self.key)
            .is_some_and(|s| Arc::ptr_eq(s, &self.slot))
        {
            slots.remove(&self.key);
        }
    }
}

impl WaitEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a wait is outstanding for `key`.
    pub fn is_pending(&self, key: u8) -> bool {
        lock(&self.slots).contains_key(&key)
    }

    /// Cancel the wait outstanding for `key`. A no-op when there is none.
    pub fn cancel(&self, key: u8) {
        let slot = lock(&self.slots).remove(&key);
        if let Some(slot) = slot {
            log::debug!("cancelling wait for user index {key}");
            slot.cancel();
        }
    }

    /// Cancel every outstanding wait.
    pub fn cancel_all(&self) {
        let slots: Vec<_> = lock(&self.slots).drain().collect();
        for (key, slot) in slots {
            log::debug!("cancelling wait for user index {key}");
            slot.cancel();
        }
    }

    /// Run one wait to completion on the calling thread.
    ///
    /// Fails with [`XusbError::Busy`] if a wait is already outstanding for
    /// `key`. The request goes out on `handle`, which must be overlapped.
    pub fn wait<T: Transport>(
        &self,
        key: u8,
        transport: &T,
        handle: &T::Handle,
        kind: WaitKind,
        index_on_bus: u8,
    ) -> Result<InputState> {
        let slot = {
            let mut slots = lock(&self.slots);
            if slots.contains_key(&key) {
                return Err(XusbError::Busy(key));
            }
            let slot = Arc::new(WaitSlot::default());
            slots.insert(key, Arc::clone(&slot));
            slot
        };
        let _guard = SlotGuard {
            engine: self,
            key,
            slot: Arc::clone(&slot),
        };

        let code = kind.code();
        let request = kind.request(index_on_bus);
        log::trace!("{} <- {:02X?}", ioctl_name(code), request);
        let bytes = match transport.submit_overlapped(handle, code, &request, InputStateV1::SIZE) {
            Ok(Submitted::Completed(bytes)) => Ok(bytes),
            Ok(Submitted::Pending(io)) => {
                log::debug!("{} pending for user index {key}", ioctl_name(code));
                slot.attach(&io);
                io.wait()
            }
            Err(status) => Err(status),
        };
        classify(bytes)
    }
}

/// Turn a finished wait into a domain result.
///
/// A short read means the request was torn down and counts as cancelled. A
/// full reply whose status byte is zero means the device went away.
fn classify(bytes: std::result::Result<Vec<u8>, Status>) -> Result<InputState> {
    let bytes = match bytes {
        Ok(b) => b,
        Err(s) if s.is_cancellation() => return Err(XusbError::Transport(Status::CANCELLED)),
        Err(s) => return Err(XusbError::Transport(s)),
    };
    if bytes.len() != InputStateV1::SIZE {
        log::debug!(
            "wait returned {} bytes, expected {}; treating as cancelled",
            bytes.len(),
            InputStateV1::SIZE
        );
        return Err(XusbError::Transport(Status::CANCELLED));
    }
    let state = InputStateV1::decode(&bytes)?;
    if state.status == 0 {
        return Err(XusbError::Transport(Status::DEVICE_NOT_CONNECTED));
    }
    Ok(state.into())
}
