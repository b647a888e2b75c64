//! Protocol dispatcher — one call per logical driver operation.
//!
//! Each call picks the wire layout for the bus's negotiated version, encodes
//! the request, issues it on the synchronous handle and decodes the reply.
//!
//! Operations a bus version does not support return `Ok` with a default
//! payload rather than an error. Callers therefore cannot tell "not
//! supported" from "supported, nothing to report" except by the payload
//! (for example [`Capabilities::None`] or a zero version tag).

use crate::error::{Result, XusbError};
use crate::protocol::*;
use crate::status::Status;
use crate::transport::Transport;
use crate::wire::{
    AudioDeviceInfo, BatteryInfo, BatteryRequest, BusInfo, BusInfoEx, BusInfoExKind,
    BusInfoExRequest, Capabilities, CapabilitiesV1, CapabilitiesV2, CommonRequest, InputState,
    InputStateV0, InputStateV1, LedSetting, LedState, ProtocolVersion, SetStateFlags,
    SetStateRequest, SubDevice, Vibration, WaitForInputRequest,
};

/// Issue one synchronous request, tracing the raw traffic.
fn call<T: Transport>(
    transport: &T,
    handle: &T::Handle,
    code: u32,
    input: &[u8],
    out_capacity: usize,
) -> Result<Vec<u8>> {
    log::trace!("{} <- {:02X?}", ioctl_name(code), input);
    match transport.send_receive(handle, code, input, out_capacity) {
        Ok(bytes) => {
            log::trace!("{} -> {} bytes", ioctl_name(code), bytes.len());
            Ok(bytes)
        }
        Err(status) => {
            log::trace!("{} failed: {status}", ioctl_name(code));
            Err(XusbError::Transport(status))
        }
    }
}

// ── Bus operations ──

/// Query bus information. Version-independent.
pub fn get_bus_info<T: Transport>(transport: &T, handle: &T::Handle) -> Result<BusInfo> {
    let bytes = call(transport, handle, IOCTL_BUS_GET_INFORMATION, &[], BusInfo::SIZE)?;
    Ok(BusInfo::decode(&bytes)?)
}

/// Query extended bus information.
///
/// The request is always tagged with the newest known version, regardless of
/// what the bus negotiated; the driver expects it that way.
pub fn get_bus_info_ex<T: Transport>(
    transport: &T,
    handle: &T::Handle,
    kind: BusInfoExKind,
) -> Result<BusInfoEx> {
    let req = BusInfoExRequest { kind }.encode();
    let bytes = call(
        transport,
        handle,
        IOCTL_BUS_GET_INFORMATION_EX,
        &req,
        BusInfoEx::SIZE,
    )?;
    Ok(BusInfoEx::decode(&bytes)?)
}

// ── Device operations ──

/// Query a slot's LED state. Only 1.0 and 1.1 drivers expose it; later
/// versions get a zeroed state.
pub fn get_led_state<T: Transport>(
    transport: &T,
    handle: &T::Handle,
    version: ProtocolVersion,
    index: u8,
) -> Result<LedState> {
    match version {
        ProtocolVersion::V1_0 | ProtocolVersion::V1_1 => {}
        _ => return Ok(LedState::default()),
    }
    let req = CommonRequest::new(ProtocolVersion::V1_1, index).encode();
    let bytes = call(
        transport,
        handle,
        IOCTL_DEVICE_GET_LED_STATE,
        &req,
        LedState::SIZE,
    )?;
    Ok(LedState::decode(&bytes)?)
}

/// Query a slot's input state.
///
/// 1.0 drivers take the bare index and answer with the standard gamepad;
/// every later version takes a versioned request and answers with the
/// extended gamepad. The result's version tag is the one the driver wrote.
pub fn get_input_state<T: Transport>(
    transport: &T,
    handle: &T::Handle,
    version: ProtocolVersion,
    index: u8,
) -> Result<InputState> {
    if version == ProtocolVersion::V1_0 {
        let bytes = call(
            transport,
            handle,
            IOCTL_DEVICE_GET_INPUT,
            &[index],
            InputStateV0::SIZE,
        )?;
        return Ok(InputStateV0::decode(&bytes)?.into());
    }
    let req = CommonRequest::new(ProtocolVersion::V1_1, index).encode();
    let bytes = call(
        transport,
        handle,
        IOCTL_DEVICE_GET_INPUT,
        &req,
        InputStateV1::SIZE,
    )?;
    Ok(InputStateV1::decode(&bytes)?.into())
}

/// Set a slot's LED and/or vibration. One layout on every version.
///
/// `flags` must select at least one of LED and vibration and nothing else;
/// anything else is rejected before any request is sent.
pub fn set_state<T: Transport>(
    transport: &T,
    handle: &T::Handle,
    index: u8,
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
    let req = SetStateRequest {
        index,
        led,
        vibration,
        flags,
    }
    .encode();
    call(transport, handle, IOCTL_DEVICE_SET_STATE, &req, 0)?;
    Ok(())
}

/// Query a slot's capabilities: nothing on 1.0, the short layout on 1.1, the
/// long layout (with vendor, product, revision and serial) on 1.2+.
pub fn get_capabilities<T: Transport>(
    transport: &T,
    handle: &T::Handle,
    version: ProtocolVersion,
    index: u8,
) -> Result<Capabilities> {
    match version {
        ProtocolVersion::Unsupported | ProtocolVersion::V1_0 => Ok(Capabilities::None),
        ProtocolVersion::V1_1 => {
            let req = CommonRequest::new(ProtocolVersion::V1_1, index).encode();
            let bytes = call(
                transport,
                handle,
                IOCTL_DEVICE_GET_CAPABILITIES,
                &req,
                CapabilitiesV1::SIZE,
            )?;
            Ok(Capabilities::V1_1(CapabilitiesV1::decode(&bytes)?))
        }
        _ => {
            let req = CommonRequest::new(ProtocolVersion::V1_2, index).encode();
            let bytes = call(
                transport,
                handle,
                IOCTL_DEVICE_GET_CAPABILITIES,
                &req,
                CapabilitiesV2::SIZE,
            )?;
            Ok(Capabilities::V1_2(CapabilitiesV2::decode(&bytes)?))
        }
    }
}

/// Query battery information for a slot or its headset. Zeroed below 1.2.
pub fn get_battery_info<T: Transport>(
    transport: &T,
    handle: &T::Handle,
    version: ProtocolVersion,
    index: u8,
    sub_device: SubDevice,
) -> Result<BatteryInfo> {
    if version < ProtocolVersion::V1_2 {
        return Ok(BatteryInfo::default());
    }
    let req = BatteryRequest {
        version: ProtocolVersion::V1_2.raw(),
        index,
        sub_device,
    }
    .encode();
    let bytes = call(
        transport,
        handle,
        IOCTL_DEVICE_GET_BATTERY_INFORMATION,
        &req,
        BatteryInfo::SIZE,
    )?;
    Ok(BatteryInfo::decode(&bytes)?)
}

/// Query a slot's audio sub-device identity. Zeroed below 1.2.
pub fn get_audio_info<T: Transport>(
    transport: &T,
    handle: &T::Handle,
    version: ProtocolVersion,
    index: u8,
) -> Result<AudioDeviceInfo> {
    if version < ProtocolVersion::V1_2 {
        return Ok(AudioDeviceInfo::default());
    }
    let req = CommonRequest::new(ProtocolVersion::V1_2, index).encode();
    let bytes = call(
        transport,
        handle,
        IOCTL_DEVICE_GET_AUDIO_DEVICE_INFORMATION,
        &req,
        AudioDeviceInfo::SIZE,
    )?;
    Ok(AudioDeviceInfo::decode(&bytes)?)
}

/// Power off a slot. A no-op below 1.2. A slot that is already gone counts
/// as success.
pub fn power_off<T: Transport>(
    transport: &T,
    handle: &T::Handle,
    version: ProtocolVersion,
    index: u8,
) -> Result<()> {
    if version < ProtocolVersion::V1_2 {
        return Ok(());
    }
    let req = CommonRequest::new(version, index).encode();
    match call(transport, handle, IOCTL_DEVICE_POWER_OFF, &req, 0) {
        Ok(_) | Err(XusbError::Transport(Status::DEVICE_NOT_CONNECTED)) => Ok(()),
        Err(e) => Err(e),
    }
}

// ── Waits ──

/// Which event a wait blocks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitKind {
    /// An input state with the guide button pressed.
    GuideButton,
    /// Any new input state. Only completes while a focused, non-console
    /// window is in the foreground; the driver enforces this.
    Input,
}

impl WaitKind {
    pub fn code(self) -> u32 {
        match self {
            WaitKind::GuideButton => IOCTL_DEVICE_WAIT_FOR_GUIDE,
            WaitKind::Input => IOCTL_DEVICE_WAIT_FOR_INPUT,
        }
    }

    /// Request buffer for a wait on `index`, always tagged 1.2.
    pub fn request(self, index: u8) -> Vec<u8> {
        let version = ProtocolVersion::V1_2;
        match self {
            WaitKind::GuideButton => CommonRequest::new(version, index).encode().to_vec(),
            WaitKind::Input => WaitForInputRequest {
                version: version.raw(),
                index,
            }
            .encode()
            .to_vec(),
        }
    }
}
