//! Bus/device registry — discovery and user-index assignment.
//!
//! A refresh rebuilds the whole snapshot: every bus found by [`Discovery`]
//! is opened, queried and probed slot by slot. Occupied slots get a user
//! index, preferring the player number their LED shows. The previous
//! snapshot's buses are disposed first, which releases their handles.
//!
//! One mutex guards the snapshot. Lookups take it too, so a refresh is
//! atomic with respect to them; a lookup miss triggers exactly one refresh
//! and one retry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::dispatch::{self, WaitKind};
use crate::error::{Result, XusbError};
use crate::protocol::{BUS_STATUS_RESERVED_SKIP, USER_INDEX_COUNT};
use crate::transport::{Discovery, Transport};
use crate::wait::WaitEngine;
use crate::wire::{
    AudioDeviceInfo, BatteryInfo, BusInfo, BusInfoEx, BusInfoExKind, Capabilities, InputState,
    LedSetting, LedState, ProtocolVersion, SetStateFlags, SubDevice, Vibration,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(p) => p.into_inner(),
    }
}

/// Discovery behaviour, derived from [`crate::config::Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Prefer the player number shown by a slot's LED when assigning user
    /// indices.
    pub led_hint: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self { led_hint: true }
    }
}

// ── User-index pool ──

/// User indices claimed during one refresh pass.
pub struct UserIndexPool {
    taken: [bool; USER_INDEX_COUNT],
}

impl Default for UserIndexPool {
    fn default() -> Self {
        Self {
            taken: [false; USER_INDEX_COUNT],
        }
    }
}

impl UserIndexPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `hint` if it is free, else the lowest free index. `None` once
    /// all indices are taken.
    pub fn claim(&mut self, hint: Option<u8>) -> Option<u8> {
        let pick = match hint {
            Some(h) if (h as usize) < USER_INDEX_COUNT && !self.taken[h as usize] => h as usize,
            _ => self.taken.iter().position(|t| !t)?,
        };
        self.taken[pick] = true;
        Some(pick as u8)
    }

    pub fn is_taken(&self, index: u8) -> bool {
        self.taken.get(index as usize).copied().unwrap_or(false)
    }
}

// ── Bus ──

struct BusHandles<H> {
    sync: H,
    overlapped: H,
}

/// One open bus instance.
///
/// Holds a synchronous and an overlapped handle, opened once at discovery.
/// After [`dispose`](Bus::dispose) every operation fails with
/// [`XusbError::Disposed`]; operations already running finish on the handles
/// they hold, which are released when the last of them ends.
pub struct Bus<T: Transport> {
    instance: u8,
    path: String,
    info: BusInfo,
    version: ProtocolVersion,
    transport: Arc<T>,
    handles: Mutex<Option<Arc<BusHandles<T::Handle>>>>,
}

impl<T: Transport> fmt::Debug for Bus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("instance", &self.instance)
            .field("path", &self.path)
            .field("version", &self.version)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl<T: Transport> Bus<T> {
    /// Open both handles on `path` and negotiate the protocol version.
    pub fn open(transport: Arc<T>, instance: u8, path: &str) -> Result<Self> {
        let sync = transport.open(path, false)?;
        let overlapped = transport.open(path, true)?;
        let info = dispatch::get_bus_info(&*transport, &sync)?;
        Ok(Bus {
            instance,
            path: path.to_string(),
            info,
            version: ProtocolVersion::from_raw(info.version),
            transport,
            handles: Mutex::new(Some(Arc::new(BusHandles { sync, overlapped }))),
        })
    }

    /// Enumeration-order instance index. Not stable across refreshes.
    pub fn instance(&self) -> u8 {
        self.instance
    }

    /// OS device path. Stable for the lifetime of the physical bus.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Bus information captured when the bus was opened.
    pub fn info(&self) -> BusInfo {
        self.info
    }

    /// Number of slots on the bus.
    pub fn max_slot_count(&self) -> u8 {
        self.info.max_count
    }

    /// Release both handles. Idempotent.
    pub fn dispose(&self) {
        if lock(&self.handles).take().is_some() {
            log::debug!("bus {} disposed ({})", self.instance, self.path);
        }
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.handles).is_none()
    }

    fn handles(&self) -> Result<Arc<BusHandles<T::Handle>>> {
        lock(&self.handles).clone().ok_or(XusbError::Disposed)
    }

    /// Query bus information again.
    pub fn query_info(&self) -> Result<BusInfo> {
        let h = self.handles()?;
        dispatch::get_bus_info(&*self.transport, &h.sync)
    }

    pub fn info_ex(&self, kind: BusInfoExKind) -> Result<BusInfoEx> {
        let h = self.handles()?;
        dispatch::get_bus_info_ex(&*self.transport, &h.sync, kind)
    }

    pub fn input_state(&self, index: u8) -> Result<InputState> {
        let h = self.handles()?;
        dispatch::get_input_state(&*self.transport, &h.sync, self.version, index)
    }

    pub fn led_state(&self, index: u8) -> Result<LedState> {
        let h = self.handles()?;
        dispatch::get_led_state(&*self.transport, &h.sync, self.version, index)
    }

    pub fn set_state(
        &self,
        index: u8,
        led: LedSetting,
        vibration: Vibration,
        flags: SetStateFlags,
    ) -> Result<()> {
        let h = self.handles()?;
        dispatch::set_state(&*self.transport, &h.sync, index, led, vibration, flags)
    }

    pub fn capabilities(&self, index: u8) -> Result<Capabilities> {
        let h = self.handles()?;
        dispatch::get_capabilities(&*self.transport, &h.sync, self.version, index)
    }

    pub fn battery_info(&self, index: u8, sub_device: SubDevice) -> Result<BatteryInfo> {
        let h = self.handles()?;
        dispatch::get_battery_info(&*self.transport, &h.sync, self.version, index, sub_device)
    }

    pub fn audio_info(&self, index: u8) -> Result<AudioDeviceInfo> {
        let h = self.handles()?;
        dispatch::get_audio_info(&*self.transport, &h.sync, self.version, index)
    }

    pub fn power_off(&self, index: u8) -> Result<()> {
        let h = self.handles()?;
        dispatch::power_off(&*self.transport, &h.sync, self.version, index)
    }

    /// Block in `engine` on the overlapped handle until the wait ends.
    pub(crate) fn wait(
        &self,
        engine: &WaitEngine,
        key: u8,
        kind: WaitKind,
        index: u8,
    ) -> Result<InputState> {
        let h = self.handles()?;
        engine.wait(key, &*self.transport, &h.overlapped, kind, index)
    }
}

// ── Device ──

/// An occupied slot, as seen by callers.
///
/// Refers to its bus without owning it: once a refresh evicts the bus,
/// operations fail with [`XusbError::Disposed`].
pub struct Device<T: Transport> {
    user_index: u8,
    index_on_bus: u8,
    bus_instance: u8,
    bus: Weak<Bus<T>>,
}

impl<T: Transport> fmt::Debug for Device<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("user_index", &self.user_index)
            .field("bus", &self.bus_instance)
            .field("index_on_bus", &self.index_on_bus)
            .finish()
    }
}

impl<T: Transport> Device<T> {
    /// Caller-visible index, recomputed on every refresh.
    pub fn user_index(&self) -> u8 {
        self.user_index
    }

    pub fn index_on_bus(&self) -> u8 {
        self.index_on_bus
    }

    pub fn bus_instance(&self) -> u8 {
        self.bus_instance
    }

    pub fn bus(&self) -> Result<Arc<Bus<T>>> {
        self.bus.upgrade().ok_or(XusbError::Disposed)
    }

    pub fn input_state(&self) -> Result<InputState> {
        self.bus()?.input_state(self.index_on_bus)
    }

    pub fn led_state(&self) -> Result<LedState> {
        self.bus()?.led_state(self.index_on_bus)
    }

    pub fn set_state(
        &self,
        led: LedSetting,
        vibration: Vibration,
        flags: SetStateFlags,
    ) -> Result<()> {
        self.bus()?
            .set_state(self.index_on_bus, led, vibration, flags)
    }

    pub fn set_led(&self, led: LedSetting) -> Result<()> {
        self.set_state(led, Vibration::ZERO, SetStateFlags::LED)
    }

    pub fn set_vibration(&self, vibration: Vibration) -> Result<()> {
        self.set_state(LedSetting::Off, vibration, SetStateFlags::VIBRATION)
    }

    pub fn capabilities(&self) -> Result<Capabilities> {
        self.bus()?.capabilities(self.index_on_bus)
    }

    pub fn battery_info(&self, sub_device: SubDevice) -> Result<BatteryInfo> {
        self.bus()?.battery_info(self.index_on_bus, sub_device)
    }

    pub fn audio_info(&self) -> Result<AudioDeviceInfo> {
        self.bus()?.audio_info(self.index_on_bus)
    }

    pub fn power_off(&self) -> Result<()> {
        self.bus()?.power_off(self.index_on_bus)
    }

    pub(crate) fn wait(&self, engine: &WaitEngine, kind: WaitKind) -> Result<InputState> {
        self.bus()?
            .wait(engine, self.user_index, kind, self.index_on_bus)
    }
}

// ── Registry ──

struct Snapshot<T: Transport> {
    buses: BTreeMap<u8, Arc<Bus<T>>>,
    devices: BTreeMap<u8, Arc<Device<T>>>,
}

impl<T: Transport> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            buses: BTreeMap::new(),
            devices: BTreeMap::new(),
        }
    }
}

/// Owns every discovered bus and device slot.
pub struct Registry<T: Transport> {
    transport: Arc<T>,
    discovery: Arc<dyn Discovery>,
    options: RegistryOptions,
    snapshot: Mutex<Snapshot<T>>,
}

impl<T: Transport> Registry<T> {
    /// Create an empty registry. Nothing is discovered until the first
    /// refresh or lookup.
    pub fn new(transport: Arc<T>, discovery: Arc<dyn Discovery>, options: RegistryOptions) -> Self {
        Registry {
            transport,
            discovery,
            options,
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn options(&self) -> RegistryOptions {
        self.options
    }

    /// Rediscover every bus and slot.
    pub fn refresh(&self) {
        let mut snap = lock(&self.snapshot);
        self.refresh_locked(&mut snap);
    }

    fn refresh_locked(&self, snap: &mut Snapshot<T>) {
        for bus in snap.buses.values() {
            bus.dispose();
        }
        snap.buses.clear();
        snap.devices.clear();

        let mut pool = UserIndexPool::new();
        for (position, path) in self.discovery.enumerate_paths().into_iter().enumerate() {
            let Ok(instance) = u8::try_from(position) else {
                log::warn!("more than 256 buses found; ignoring the rest");
                break;
            };
            log::debug!("found bus {instance}: {path}");

            let bus = match Bus::open(Arc::clone(&self.transport), instance, &path) {
                Ok(bus) => bus,
                Err(e) => {
                    log::warn!("skipping bus {instance} ({path}): {e}");
                    continue;
                }
            };
            let info = bus.info();
            if info.status & BUS_STATUS_RESERVED_SKIP != 0 {
                log::debug!(
                    "skipping bus {instance}: status 0x{:02X} has reserved bit set",
                    info.status
                );
                continue;
            }
            if !bus.version().is_supported() {
                log::warn!(
                    "skipping bus {instance}: unsupported protocol version 0x{:04X}",
                    info.version
                );
                continue;
            }
            log::debug!(
                "bus {instance}: version {}, {} slots, {} connected",
                bus.version(),
                info.max_count,
                info.device_count
            );

            let bus = Arc::new(bus);
            snap.buses.insert(instance, Arc::clone(&bus));
            self.probe_slots(&bus, &mut pool, snap);
        }
        log::debug!(
            "refresh: {} buses, {} devices",
            snap.buses.len(),
            snap.devices.len()
        );
    }

    fn probe_slots(&self, bus: &Arc<Bus<T>>, pool: &mut UserIndexPool, snap: &mut Snapshot<T>) {
        for index in 0..bus.max_slot_count() {
            if let Err(e) = bus.input_state(index) {
                log::trace!("bus {} slot {index} empty: {e}", bus.instance());
                continue;
            }
            let hint = if self.options.led_hint {
                match bus.led_state(index) {
                    Ok(led) => led.setting().and_then(LedSetting::player_index),
                    Err(e) => {
                        log::debug!("bus {} slot {index}: LED unreadable: {e}", bus.instance());
                        None
                    }
                }
            } else {
                None
            };
            let Some(user_index) = pool.claim(hint) else {
                log::warn!(
                    "no free user index for bus {} slot {index}; skipping remaining slots",
                    bus.instance()
                );
                break;
            };
            log::debug!(
                "bus {} slot {index} -> user index {user_index}{}",
                bus.instance(),
                if hint == Some(user_index) {
                    " (LED)"
                } else {
                    ""
                }
            );
            snap.devices.insert(
                user_index,
                Arc::new(Device {
                    user_index,
                    index_on_bus: index,
                    bus_instance: bus.instance(),
                    bus: Arc::downgrade(bus),
                }),
            );
        }
    }

    /// Look up a bus by instance index, refreshing once on a miss.
    pub fn get_bus(&self, instance: u8) -> Result<Arc<Bus<T>>> {
        let mut snap = lock(&self.snapshot);
        if let Some(bus) = snap.buses.get(&instance) {
            return Ok(Arc::clone(bus));
        }
        self.refresh_locked(&mut snap);
        snap.buses
            .get(&instance)
            .cloned()
            .ok_or(XusbError::BusNotFound(instance))
    }

    /// Look up a device by user index, refreshing once on a miss.
    pub fn get_device(&self, user_index: u8) -> Result<Arc<Device<T>>> {
        let mut snap = lock(&self.snapshot);
        if let Some(dev) = snap.devices.get(&user_index) {
            return Ok(Arc::clone(dev));
        }
        self.refresh_locked(&mut snap);
        snap.devices
            .get(&user_index)
            .cloned()
            .ok_or(XusbError::DeviceNotFound(user_index))
    }

    /// Refresh, then list buses by instance index.
    pub fn buses(&self) -> Vec<Arc<Bus<T>>> {
        let mut snap = lock(&self.snapshot);
        self.refresh_locked(&mut snap);
        snap.buses.values().cloned().collect()
    }

    /// Refresh, then list devices by user index.
    pub fn devices(&self) -> Vec<Arc<Device<T>>> {
        let mut snap = lock(&self.snapshot);
        self.refresh_locked(&mut snap);
        snap.devices.values().cloned().collect()
    }

    /// Current devices without refreshing.
    pub fn cached_devices(&self) -> Vec<Arc<Device<T>>> {
        lock(&self.snapshot).devices.values().cloned().collect()
    }

    /// Release every bus and forget all devices.
    pub fn dispose(&self) {
        let mut snap = lock(&self.snapshot);
        for bus in snap.buses.values() {
            bus.dispose();
        }
        snap.buses.clear();
        snap.devices.clear();
    }
}

impl<T: Transport> Drop for Registry<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::*;
    use crate::status::Status;
    use crate::transport::mock::{MockBus, MockDriver, MockSlot};

    fn registry(d: &Arc<MockDriver>) -> Registry<MockDriver> {
        Registry::new(Arc::clone(d), d.clone(), RegistryOptions::default())
    }

    fn user_indices(r: &Registry<MockDriver>) -> Vec<(u8, u8, u8)> {
        r.cached_devices()
            .iter()
            .map(|d| (d.user_index(), d.bus_instance(), d.index_on_bus()))
            .collect()
    }

    #[test]
    fn pool_prefers_hint_then_lowest_free() {
        let mut pool = UserIndexPool::new();
        assert_eq!(pool.claim(Some(2)), Some(2));
        assert_eq!(pool.claim(Some(2)), Some(0));
        assert_eq!(pool.claim(None), Some(1));
        assert_eq!(pool.claim(None), Some(3));
        assert!(pool.is_taken(2));
        assert!(!pool.is_taken(4));
    }

    #[test]
    fn pool_exhausts_after_all_indices() {
        let mut pool = UserIndexPool::new();
        for i in 0..USER_INDEX_COUNT {
            assert_eq!(pool.claim(None), Some(i as u8));
        }
        assert_eq!(pool.claim(None), None);
        assert_eq!(pool.claim(Some(0)), None);
        // 255 is outside the range and never handed out
        assert!(!pool.is_taken(255));
    }

    #[test]
    fn led_hint_then_lowest_free() {
        // slot 0 shows player 2, slot 2 LED unreadable
        let d = Arc::new(
            MockDriver::new().with_bus(
                MockBus::new("bus0", ProtocolVersion::V1_1, 4)
                    .with_slot(0, MockSlot::connected().with_led(LedSetting::Player2))
                    .with_slot(2, MockSlot::connected().without_led()),
            ),
        );
        let r = registry(&d);
        r.refresh();
        assert_eq!(user_indices(&r), vec![(0, 0, 2), (1, 0, 0)]);
    }

    #[test]
    fn duplicate_led_pattern_first_wins() {
        let d = Arc::new(
            MockDriver::new().with_bus(
                MockBus::new("bus0", ProtocolVersion::V1_0, 4)
                    .with_slot(0, MockSlot::connected().with_led(LedSetting::Player3))
                    .with_slot(1, MockSlot::connected().with_led(LedSetting::Player3SwitchBlink))
                    .with_slot(3, MockSlot::connected().with_led(LedSetting::Cycle)),
            ),
        );
        let r = registry(&d);
        r.refresh();
        assert_eq!(user_indices(&r), vec![(0, 0, 1), (1, 0, 3), (2, 0, 0)]);
    }

    #[test]
    fn assignment_is_deterministic() {
        let d = Arc::new(
            MockDriver::new()
                .with_bus(
                    MockBus::new("bus0", ProtocolVersion::V1_1, 4)
                        .with_slot(1, MockSlot::connected().with_led(LedSetting::Player4))
                        .with_slot(3, MockSlot::connected()),
                )
                .with_bus(
                    MockBus::new("bus1", ProtocolVersion::V1_1, 4)
                        .with_slot(0, MockSlot::connected().with_led(LedSetting::Player1)),
                ),
        );
        let r = registry(&d);
        r.refresh();
        let first = user_indices(&r);
        r.refresh();
        assert_eq!(user_indices(&r), first);
        // bus1's player-1 LED loses to bus0 slot 3, which claimed 0 first
        assert_eq!(first, vec![(0, 0, 3), (1, 1, 0), (3, 0, 1)]);
    }

    #[test]
    fn led_hint_disabled_uses_lowest_free() {
        let d = Arc::new(
            MockDriver::new().with_bus(
                MockBus::new("bus0", ProtocolVersion::V1_1, 4)
                    .with_slot(0, MockSlot::connected().with_led(LedSetting::Player4)),
            ),
        );
        let r = Registry::new(
            Arc::clone(&d),
            d.clone(),
            RegistryOptions { led_hint: false },
        );
        r.refresh();
        assert_eq!(user_indices(&r), vec![(0, 0, 0)]);
        assert!(d.requests_for(IOCTL_DEVICE_GET_LED_STATE).is_empty());
    }

    #[test]
    fn later_versions_get_no_led_hint() {
        let d = Arc::new(
            MockDriver::new().with_bus(
                MockBus::new("bus0", ProtocolVersion::V1_2, 4)
                    .with_slot(2, MockSlot::connected().with_led(LedSetting::Player4)),
            ),
        );
        let r = registry(&d);
        r.refresh();
        assert_eq!(user_indices(&r), vec![(0, 0, 2)]);
    }

    #[test]
    fn skips_unopenable_failing_and_reserved_buses() {
        let mut broken = MockBus::new("broken", ProtocolVersion::V1_1, 4);
        broken.fail_open = true;
        let d = Arc::new(
            MockDriver::new()
                .with_bus(broken.with_slot(0, MockSlot::connected()))
                .with_bus(
                    MockBus::new("noinfo", ProtocolVersion::V1_1, 4)
                        .with_slot(0, MockSlot::connected())
                        .with_failure(IOCTL_BUS_GET_INFORMATION, Status(31)),
                )
                .with_bus(
                    MockBus::new("reserved", ProtocolVersion::V1_1, 4)
                        .with_status(BUS_STATUS_RESERVED_SKIP)
                        .with_slot(0, MockSlot::connected()),
                )
                .with_bus(
                    MockBus::new("good", ProtocolVersion::V1_1, 4)
                        .with_slot(1, MockSlot::connected()),
                ),
        );
        let r = registry(&d);
        let buses = r.buses();
        assert_eq!(buses.len(), 1);
        // instance index is the enumeration position, gaps included
        assert_eq!(buses[0].instance(), 3);
        assert_eq!(buses[0].path(), "good");
        assert_eq!(user_indices(&r), vec![(0, 3, 1)]);
        // only the good bus keeps its two handles open
        assert_eq!(d.open_handles(), 2);
    }

    #[test]
    fn unsupported_version_bus_is_skipped() {
        let mut bus = MockBus::new("old", ProtocolVersion::V1_1, 4).with_slot(0, MockSlot::connected());
        bus.info.version = 0x0001;
        let d = Arc::new(MockDriver::new().with_bus(bus));
        let r = registry(&d);
        assert!(r.buses().is_empty());
        assert!(r.cached_devices().is_empty());
    }

    #[test]
    fn all_indices_taken_stops_bus() {
        let mut bus = MockBus::new("big", ProtocolVersion::V1_1, 255);
        for i in 0..255u8 {
            bus = bus.with_slot(i, MockSlot::connected());
        }
        let mut extra = MockBus::new("extra", ProtocolVersion::V1_1, 2);
        extra = extra
            .with_slot(0, MockSlot::connected())
            .with_slot(1, MockSlot::connected());
        let d = Arc::new(MockDriver::new().with_bus(bus).with_bus(extra));
        let r = registry(&d);
        assert_eq!(r.devices().len(), USER_INDEX_COUNT);
        assert!(r.get_bus(1).is_ok());
    }

    #[test]
    fn lookup_miss_refreshes_once() {
        let d = Arc::new(MockDriver::new().with_bus(
            MockBus::new("bus0", ProtocolVersion::V1_1, 4).with_slot(0, MockSlot::connected()),
        ));
        let r = registry(&d);
        // first lookup populates the empty snapshot
        assert_eq!(r.get_device(0).unwrap().index_on_bus(), 0);
        d.clear_requests();
        // hit: no traffic
        r.get_device(0).unwrap();
        assert!(d.requests().is_empty());
        // miss: one refresh, then not found
        let err = r.get_device(9).unwrap_err();
        assert!(matches!(err, XusbError::DeviceNotFound(9)));
        assert_eq!(d.requests_for(IOCTL_BUS_GET_INFORMATION).len(), 1);
        assert!(matches!(r.get_bus(5), Err(XusbError::BusNotFound(5))));
    }

    #[test]
    fn lookup_miss_finds_hotplugged_device() {
        let d = Arc::new(MockDriver::new().with_bus(MockBus::new(
            "bus0",
            ProtocolVersion::V1_1,
            4,
        )));
        let r = registry(&d);
        r.refresh();
        assert!(r.cached_devices().is_empty());
        d.update_bus("bus0", |b| {
            b.slots.insert(0, MockSlot::connected());
        });
        assert!(r.get_device(0).is_ok());
    }

    #[test]
    fn refresh_disposes_previous_buses() {
        let d = Arc::new(MockDriver::new().with_bus(
            MockBus::new("bus0", ProtocolVersion::V1_2, 4).with_slot(0, MockSlot::connected()),
        ));
        let r = registry(&d);
        let old_dev = r.get_device(0).unwrap();
        let old_bus = r.get_bus(0).unwrap();
        assert_eq!(d.open_handles(), 2);
        r.refresh();
        assert!(old_bus.is_disposed());
        assert_eq!(d.open_handles(), 2);
        assert!(matches!(old_bus.input_state(0), Err(XusbError::Disposed)));
        assert!(matches!(old_dev.input_state(), Err(XusbError::Disposed)));
        // the fresh snapshot works
        assert!(r.get_device(0).unwrap().input_state().is_ok());
    }

    #[test]
    fn dispose_releases_handles() {
        let d = Arc::new(MockDriver::new().with_bus(
            MockBus::new("bus0", ProtocolVersion::V1_2, 4).with_slot(0, MockSlot::connected()),
        ));
        {
            let r = registry(&d);
            r.refresh();
            assert_eq!(d.open_handles(), 2);
        }
        assert_eq!(d.open_handles(), 0);
    }

    #[test]
    fn device_operations_route_to_slot() {
        let d = Arc::new(MockDriver::new().with_bus(
            MockBus::new("bus0", ProtocolVersion::V1_2, 4).with_slot(3, MockSlot::connected()),
        ));
        let r = registry(&d);
        let dev = r.get_device(0).unwrap();
        d.clear_requests();
        dev.set_led(LedSetting::Player1).unwrap();
        assert_eq!(d.requests()[0].input, vec![3, 6, 0, 0, 1]);
        dev.set_vibration(Vibration::FULL).unwrap();
        assert_eq!(d.requests()[1].input, vec![3, 0, 255, 255, 2]);
        assert!(matches!(dev.capabilities().unwrap(), Capabilities::V1_2(_)));
        assert_eq!(dev.battery_info(SubDevice::Gamepad).unwrap().level_name(), "full");
        assert_eq!(dev.audio_info().unwrap().version, 0x0102);
    }
}
