//! Protocol constants for the XUSB bus driver.
//!
//! All values decoded from the driver's device-control interface; field
//! meanings that are still unknown are kept as opaque constants.
//!
//! ## Control codes
//!
//! Every logical operation is labelled with a 32-bit control code built by
//! [`ctl_code`] from a vendor device type, a custom function number,
//! `METHOD_BUFFERED` and an access mask. The codes are computed at compile
//! time and never change between driver revisions; only the buffer layouts do.

// ── Control-code builder ──

/// Vendor-defined device type flag.
pub const TYPE_FLAG_VENDOR: u32 = 0x8000;

/// Vendor-defined function flag (functions 0x800..=0xFFF are custom).
pub const FUNCTION_FLAG_CUSTOM: u32 = 0x800;

/// Buffered transfer method.
pub const METHOD_BUFFERED: u32 = 0;

/// Read access bit.
pub const ACCESS_READ: u32 = 0x01;

/// Write access bit.
pub const ACCESS_WRITE: u32 = 0x02;

/// Build a device-control code.
///
/// Layout: `[device_type:16][access:2][function:12][method:2]`. Out-of-range
/// bits in each argument are masked off rather than rejected.
pub const fn ctl_code(device_type: u32, function: u32, method: u32, access: u32) -> u32 {
    ((device_type & 0xFFFF) << 16)
        | ((access & 0b11) << 14)
        | ((function & 0xFFF) << 2)
        | (method & 0b11)
}

const fn xusb_code(function: u32, access: u32) -> u32 {
    ctl_code(
        TYPE_FLAG_VENDOR,
        FUNCTION_FLAG_CUSTOM | function,
        METHOD_BUFFERED,
        access,
    )
}

// ── IOCTL codes ──

/// Get bus information (version, slot count, status).
pub const IOCTL_BUS_GET_INFORMATION: u32 = xusb_code(0x000, ACCESS_READ);

/// Get device capabilities.
pub const IOCTL_DEVICE_GET_CAPABILITIES: u32 = xusb_code(0x001, ACCESS_READ | ACCESS_WRITE);

/// Get device LED state.
pub const IOCTL_DEVICE_GET_LED_STATE: u32 = xusb_code(0x002, ACCESS_READ | ACCESS_WRITE);

/// Get device input state.
pub const IOCTL_DEVICE_GET_INPUT: u32 = xusb_code(0x003, ACCESS_READ | ACCESS_WRITE);

/// Set device LED and/or vibration state.
pub const IOCTL_DEVICE_SET_STATE: u32 = xusb_code(0x004, ACCESS_WRITE);

/// Pend until the device reports a state with the guide button pressed.
pub const IOCTL_DEVICE_WAIT_FOR_GUIDE: u32 = xusb_code(0x005, ACCESS_READ | ACCESS_WRITE);

/// Get battery information for a device or one of its sub-devices.
pub const IOCTL_DEVICE_GET_BATTERY_INFORMATION: u32 =
    xusb_code(0x006, ACCESS_READ | ACCESS_WRITE);

/// Power off a device.
pub const IOCTL_DEVICE_POWER_OFF: u32 = xusb_code(0x007, ACCESS_WRITE);

/// Get audio sub-device information.
pub const IOCTL_DEVICE_GET_AUDIO_DEVICE_INFORMATION: u32 =
    xusb_code(0x008, ACCESS_READ | ACCESS_WRITE);

/// Pend until the device reports new input.
///
/// Only completes while a focused, non-console window is in the foreground.
pub const IOCTL_DEVICE_WAIT_FOR_INPUT: u32 = xusb_code(0x0EB, ACCESS_READ | ACCESS_WRITE);

/// Get extended bus information.
pub const IOCTL_BUS_GET_INFORMATION_EX: u32 = xusb_code(0x0FF, ACCESS_READ | ACCESS_WRITE);

/// Every operation code, in function-number order.
pub const ALL_IOCTLS: [u32; 11] = [
    IOCTL_BUS_GET_INFORMATION,
    IOCTL_DEVICE_GET_CAPABILITIES,
    IOCTL_DEVICE_GET_LED_STATE,
    IOCTL_DEVICE_GET_INPUT,
    IOCTL_DEVICE_SET_STATE,
    IOCTL_DEVICE_WAIT_FOR_GUIDE,
    IOCTL_DEVICE_GET_BATTERY_INFORMATION,
    IOCTL_DEVICE_POWER_OFF,
    IOCTL_DEVICE_GET_AUDIO_DEVICE_INFORMATION,
    IOCTL_DEVICE_WAIT_FOR_INPUT,
    IOCTL_BUS_GET_INFORMATION_EX,
];

/// Human-readable operation name for an IOCTL code (for trace logs).
pub fn ioctl_name(code: u32) -> &'static str {
    match code {
        IOCTL_BUS_GET_INFORMATION => "BUS_GET_INFORMATION",
        IOCTL_DEVICE_GET_CAPABILITIES => "DEVICE_GET_CAPABILITIES",
        IOCTL_DEVICE_GET_LED_STATE => "DEVICE_GET_LED_STATE",
        IOCTL_DEVICE_GET_INPUT => "DEVICE_GET_INPUT",
        IOCTL_DEVICE_SET_STATE => "DEVICE_SET_STATE",
        IOCTL_DEVICE_WAIT_FOR_GUIDE => "DEVICE_WAIT_FOR_GUIDE",
        IOCTL_DEVICE_GET_BATTERY_INFORMATION => "DEVICE_GET_BATTERY_INFORMATION",
        IOCTL_DEVICE_POWER_OFF => "DEVICE_POWER_OFF",
        IOCTL_DEVICE_GET_AUDIO_DEVICE_INFORMATION => "DEVICE_GET_AUDIO_DEVICE_INFORMATION",
        IOCTL_DEVICE_WAIT_FOR_INPUT => "DEVICE_WAIT_FOR_INPUT",
        IOCTL_BUS_GET_INFORMATION_EX => "BUS_GET_INFORMATION_EX",
        _ => "UNKNOWN",
    }
}

// ── Opaque protocol constants ──

/// Bus status bit whose meaning is unknown. Buses reporting it are skipped
/// during discovery.
pub const BUS_STATUS_RESERVED_SKIP: u8 = 0x80;

/// Reserved byte sent verbatim in every wait-for-input request.
pub const WAIT_FOR_INPUT_RESERVED: u8 = 3;

/// Highest user index a device can be assigned (inclusive).
pub const MAX_USER_INDEX: u8 = 254;

/// Number of assignable user indices.
pub const USER_INDEX_COUNT: usize = MAX_USER_INDEX as usize + 1;

/// Device interface GUID registered by the XUSB bus driver.
/// Used on Windows to enumerate bus instances via SetupDi.
#[cfg(windows)]
pub const XUSB_INTERFACE_GUID: windows::core::GUID = windows::core::GUID {
    data1: 0xEC87F1E3,
    data2: 0xC13B,
    data3: 0x4100,
    data4: [0xB5, 0xF7, 0x8B, 0x84, 0xD5, 0x42, 0x60, 0xCB],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ioctl_codes_distinct() {
        for i in 0..ALL_IOCTLS.len() {
            for j in (i + 1)..ALL_IOCTLS.len() {
                assert_ne!(
                    ALL_IOCTLS[i], ALL_IOCTLS[j],
                    "IOCTL codes at index {i} and {j} collide"
                );
            }
        }
    }

    #[test]
    fn ctl_code_layout() {
        // device type in the high word, access at bit 14, function at bit 2
        assert_eq!(ctl_code(0x8000, 0x800, 0, 1), 0x8000_6000);
        assert_eq!(ctl_code(0, 0, 3, 0), 3);
        assert_eq!(ctl_code(0, 0xFFF, 0, 0), 0x3FFC);
    }

    #[test]
    fn ctl_code_masks_out_of_range_bits() {
        assert_eq!(ctl_code(0x1_8000, 0, 0, 0), ctl_code(0x8000, 0, 0, 0));
        assert_eq!(ctl_code(0, 0x1800, 0, 0), ctl_code(0, 0x800, 0, 0));
        assert_eq!(ctl_code(0, 0, 0b111, 0b111), ctl_code(0, 0, 0b11, 0b11));
    }

    #[test]
    fn known_ioctl_values() {
        assert_eq!(IOCTL_BUS_GET_INFORMATION, 0x8000_6000);
        assert_eq!(IOCTL_DEVICE_GET_CAPABILITIES, 0x8000_E004);
        assert_eq!(IOCTL_DEVICE_GET_LED_STATE, 0x8000_E008);
        assert_eq!(IOCTL_DEVICE_GET_INPUT, 0x8000_E00C);
        assert_eq!(IOCTL_DEVICE_SET_STATE, 0x8000_A010);
        assert_eq!(IOCTL_DEVICE_WAIT_FOR_GUIDE, 0x8000_E014);
        assert_eq!(IOCTL_DEVICE_GET_BATTERY_INFORMATION, 0x8000_E018);
        assert_eq!(IOCTL_DEVICE_POWER_OFF, 0x8000_A01C);
        assert_eq!(IOCTL_DEVICE_GET_AUDIO_DEVICE_INFORMATION, 0x8000_E020);
        assert_eq!(IOCTL_DEVICE_WAIT_FOR_INPUT, 0x8000_E3AC);
        assert_eq!(IOCTL_BUS_GET_INFORMATION_EX, 0x8000_E3FC);
    }

    #[test]
    fn ioctl_names_cover_all_codes() {
        for code in ALL_IOCTLS {
            assert_ne!(ioctl_name(code), "UNKNOWN", "0x{code:08X} has no name");
        }
        assert_eq!(ioctl_name(0xDEAD_BEEF), "UNKNOWN");
    }

    #[test]
    fn user_index_count_consistent() {
        assert_eq!(USER_INDEX_COUNT, 255);
    }
}
