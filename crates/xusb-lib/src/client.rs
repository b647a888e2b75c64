//! Client facade — every public operation, addressed by user index.
//!
//! Resolves a user index through the [`Registry`] (one refresh on a miss)
//! and calls the matching bus operation. Waits go through the shared
//! [`WaitEngine`]; the async forms run the same wait on a worker thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::Config;
use crate::dispatch::WaitKind;
use crate::error::{Result, XusbError};
use crate::registry::{Bus, Device, Registry, RegistryOptions};
use crate::transport::{Discovery, PlatformDiscovery, PlatformTransport, Transport};
use crate::wait::WaitEngine;
use crate::wire::{
    AudioDeviceInfo, BatteryInfo, BusInfo, BusInfoEx, BusInfoExKind, Capabilities, InputState,
    LedSetting, LedState, SetStateFlags, SubDevice, Vibration,
};

/// Behaviour switches, usually taken from [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub registry: RegistryOptions,
    pub refresh_after_power_off: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            registry: RegistryOptions::default(),
            refresh_after_power_off: true,
        }
    }
}

impl From<&Config> for ClientOptions {
    fn from(config: &Config) -> Self {
        Self {
            registry: config.registry_options(),
            refresh_after_power_off: config.refresh_after_power_off,
        }
    }
}

/// User-mode client for every XUSB bus on the system.
pub struct Xusb<T: Transport> {
    registry: Registry<T>,
    waits: Arc<WaitEngine>,
    options: ClientOptions,
}

/// Client over the platform's real driver.
pub type PlatformXusb = Xusb<PlatformTransport>;

impl PlatformXusb {
    /// Open a client on the platform transport. Nothing is discovered until
    /// the first operation.
    pub fn open_platform(options: ClientOptions) -> Self {
        Xusb::new(
            Arc::new(PlatformTransport::default()),
            Arc::new(PlatformDiscovery::default()),
            options,
        )
    }
}

impl<T: Transport> Xusb<T> {
    pub fn new(transport: Arc<T>, discovery: Arc<dyn Discovery>, options: ClientOptions) -> Self {
        Xusb {
            registry: Registry::new(transport, discovery, options.registry),
            waits: Arc::new(WaitEngine::new()),
            options,
        }
    }

    pub fn registry(&self) -> &Registry<T> {
        &self.registry
    }

    pub fn options(&self) -> ClientOptions {
        self.options
    }

    /// Rediscover every bus and device.
    pub fn refresh(&self) {
        self.registry.refresh();
    }

    pub fn buses(&self) -> Vec<Arc<Bus<T>>> {
        self.registry.buses()
    }

    pub fn devices(&self) -> Vec<Arc<Device<T>>> {
        self.registry.devices()
    }

    pub fn bus(&self, instance: u8) -> Result<Arc<Bus<T>>> {
        self.registry.get_bus(instance)
    }

    pub fn device(&self, user_index: u8) -> Result<Arc<Device<T>>> {
        self.registry.get_device(user_index)
    }

    // ── Bus operations ──

    /// Query a bus's information afresh.
    pub fn bus_info(&self, instance: u8) -> Result<BusInfo> {
        self.bus(instance)?.query_info()
    }

    pub fn bus_info_ex(&self, instance: u8, kind: BusInfoExKind) -> Result<BusInfoEx> {
        self.bus(instance)?.info_ex(kind)
    }

    // ── Device operations ──

    pub fn input_state(&self, user_index: u8) -> Result<InputState> {
        self.device(user_index)?.input_state()
    }

    pub fn led_state(&self, user_index: u8) -> Result<LedState> {
        self.device(user_index)?.led_state()
    }

    pub fn set_state(
        &self,
        user_index: u8,
        led: LedSetting,
        vibration: Vibration,
        flags: SetStateFlags,
    ) -> Result<()> {
        if !flags.is_valid() {
            return Err(XusbError::InvalidArgument(format!(
                "set-state flags 0x{:02X} select neither LED nor vibration",
                flags.bits()
            )));
        }
        self.device(user_index)?.set_state(led, vibration, flags)
    }

    pub fn set_led(&self, user_index: u8, led: LedSetting) -> Result<()> {
        self.device(user_index)?.set_led(led)
    }

    pub fn set_vibration(&self, user_index: u8, vibration: Vibration) -> Result<()> {
        self.device(user_index)?.set_vibration(vibration)
    }

    pub fn capabilities(&self, user_index: u8) -> Result<Capabilities> {
        self.device(user_index)?.capabilities()
    }

    pub fn battery_info(&self, user_index: u8, sub_device: SubDevice) -> Result<BatteryInfo> {
        self.device(user_index)?.battery_info(sub_device)
    }

    pub fn audio_info(&self, user_index: u8) -> Result<AudioDeviceInfo> {
        self.device(user_index)?.audio_info()
    }

    /// Power off a device. Idempotent: a device that is already gone counts
    /// as success. Rediscovers afterwards unless disabled in the options.
    pub fn power_off(&self, user_index: u8) -> Result<()> {
        let device = match self.device(user_index) {
            Ok(d) => d,
            Err(XusbError::DeviceNotFound(_)) => {
                log::debug!("power-off: user index {user_index} already gone");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        device.power_off()?;
        if self.options.refresh_after_power_off {
            self.registry.refresh();
        }
        Ok(())
    }

    // ── Waits ──

    /// Block until the guide button is pressed on a device.
    pub fn wait_for_guide(&self, user_index: u8) -> Result<InputState> {
        self.device(user_index)?
            .wait(&self.waits, WaitKind::GuideButton)
    }

    /// Block until a device reports new input.
    ///
    /// The driver only completes this wait while a focused, non-console
    /// window is in the foreground. From a console it waits until cancelled.
    pub fn wait_for_input(&self, user_index: u8) -> Result<InputState> {
        self.device(user_index)?
            .wait(&self.waits, WaitKind::Input)
    }

    /// [`wait_for_guide`](Self::wait_for_guide) on a worker thread.
    pub fn wait_for_guide_async(&self, user_index: u8) -> JoinHandle<Result<InputState>> {
        self.spawn_wait(user_index, WaitKind::GuideButton)
    }

    /// [`wait_for_input`](Self::wait_for_input) on a worker thread.
    pub fn wait_for_input_async(&self, user_index: u8) -> JoinHandle<Result<InputState>> {
        self.spawn_wait(user_index, WaitKind::Input)
    }

    fn spawn_wait(&self, user_index: u8, kind: WaitKind) -> JoinHandle<Result<InputState>> {
        let device = self.device(user_index);
        let waits = Arc::clone(&self.waits);
        thread::spawn(move || device?.wait(&waits, kind))
    }

    /// Cancel the wait outstanding on a user index. A no-op when idle.
    pub fn cancel_wait(&self, user_index: u8) {
        self.waits.cancel(user_index);
    }

    pub fn cancel_all_waits(&self) {
        self.waits.cancel_all();
    }

    pub fn is_waiting(&self, user_index: u8) -> bool {
        self.waits.is_pending(user_index)
    }

    /// Handle for cancelling waits from another thread (e.g. a Ctrl+C
    /// handler) without holding the client.
    pub fn wait_canceller(&self) -> WaitCanceller {
        WaitCanceller(Arc::clone(&self.waits))
    }
}

impl<T: Transport> Drop for Xusb<T> {
    fn drop(&mut self) {
        self.waits.cancel_all();
    }
}

/// Cancels waits on a client's engine. Cheap to clone.
#[derive(Clone)]
pub struct WaitCanceller(Arc<WaitEngine>);

impl WaitCanceller {
    pub fn cancel(&self, user_index: u8) {
        self.0.cancel(user_index);
    }

    pub fn cancel_all(&self) {
        self.0.cancel_all();
    }
}
