//! Wire codec — fixed-layout request/response buffers and the version-agnostic
//! records decoded from them.
//!
//! All multi-byte fields are little-endian and packed (no padding). Every
//! response record has a `SIZE` constant and a `decode` that rejects buffers
//! whose length differs from it; the driver's reported byte count must match
//! exactly.

mod bus_info;
mod gamepad;
mod records;
mod request;
mod version;

pub use bus_info::{
    BUS_INFO_EX_DATA_CAPACITY, BUS_INFO_EX_HEADER_SIZE, BUS_INFO_EX_LIST_SIZE, BusInfo,
    BusInfoEx, BusInfoExBasic, BusInfoExFull, BusInfoExFullSub, BusInfoExKind, BusInfoExMinimal,
};
pub use gamepad::{Gamepad, GamepadEx, Vibration, buttons};
pub use records::{
    AudioDeviceInfo, BatteryInfo, Capabilities, CapabilitiesV1, CapabilitiesV2, InputState,
    InputStateV0, InputStateV1, LedSetting, LedState, SubDevice,
};
pub use request::{
    BatteryRequest, BusInfoExRequest, CommonRequest, SetStateFlags, SetStateRequest,
    WaitForInputRequest,
};
pub use version::ProtocolVersion;

use std::fmt;

/// Codec error: a buffer did not have the layout its decoder expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Buffer length differs from the fixed layout size.
    SizeMismatch {
        layout: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Extended bus info holds no data.
    Empty,
    /// Extended bus info holds a different record shape than requested.
    WrongShape {
        requested: BusInfoExKind,
        data_len: usize,
    },
    /// A field holds a value outside its enumeration.
    InvalidValue { field: &'static str, value: u32 },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::SizeMismatch {
                layout,
                expected,
                actual,
            } => write!(f, "{layout}: expected {expected} bytes, got {actual}"),
            WireError::Empty => write!(f, "extended bus info buffer is empty"),
            WireError::WrongShape {
                requested,
                data_len,
            } => write!(
                f,
                "extended bus info holds {data_len} bytes, not {requested} info"
            ),
            WireError::InvalidValue { field, value } => {
                write!(f, "invalid {field} value {value}")
            }
        }
    }
}

impl std::error::Error for WireError {}

/// Check that `buf` is exactly `N` bytes and return it as an array.
pub(crate) fn exact<const N: usize>(
    layout: &'static str,
    buf: &[u8],
) -> Result<[u8; N], WireError> {
    buf.try_into().map_err(|_| WireError::SizeMismatch {
        layout,
        expected: N,
        actual: buf.len(),
    })
}

// Little-endian field readers over fixed arrays. Offsets are layout constants,
// so the slices are always in bounds.

pub(crate) fn le_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

pub(crate) fn le_i16(buf: &[u8], off: usize) -> i16 {
    i16::from_le_bytes([buf[off], buf[off + 1]])
}

pub(crate) fn le_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

pub(crate) fn put_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_i16(buf: &mut [u8], off: usize, v: i16) {
    buf[off..off + 2].copy_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_accepts_matching_length() {
        let arr: [u8; 3] = exact("test", &[1, 2, 3]).unwrap();
        assert_eq!(arr, [1, 2, 3]);
    }

    #[test]
    fn exact_rejects_short_and_long() {
        assert_eq!(
            exact::<3>("test", &[1, 2]).unwrap_err(),
            WireError::SizeMismatch {
                layout: "test",
                expected: 3,
                actual: 2
            }
        );
        assert!(exact::<3>("test", &[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn field_helpers_are_little_endian() {
        let mut buf = [0u8; 8];
        put_u16(&mut buf, 0, 0x1234);
        put_i16(&mut buf, 2, -2);
        put_u32(&mut buf, 4, 0xDEAD_BEEF);
        assert_eq!(buf[..2], [0x34, 0x12]);
        assert_eq!(le_u16(&buf, 0), 0x1234);
        assert_eq!(le_i16(&buf, 2), -2);
        assert_eq!(le_u32(&buf, 4), 0xDEAD_BEEF);
    }

    #[test]
    fn size_mismatch_display() {
        let e = WireError::SizeMismatch {
            layout: "LedState",
            expected: 3,
            actual: 0,
        };
        assert_eq!(e.to_string(), "LedState: expected 3 bytes, got 0");
    }
}
