//! Request buffers sent to the driver.

use std::ops::BitOr;

use serde::Serialize;

use super::{BusInfoExKind, LedSetting, ProtocolVersion, SubDevice, Vibration, put_u16};
use crate::protocol::WAIT_FOR_INPUT_RESERVED;

/// Device request used by most operations: `version u16 | index u8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonRequest {
    pub version: u16,
    pub index: u8,
}

impl CommonRequest {
    pub const SIZE: usize = 3;

    pub fn new(version: ProtocolVersion, index: u8) -> Self {
        Self {
            version: version.raw(),
            index,
        }
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        put_u16(&mut b, 0, self.version);
        b[2] = self.index;
        b
    }
}

/// Battery query: `version u16 | index u8 | sub_device u8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryRequest {
    pub version: u16,
    pub index: u8,
    pub sub_device: SubDevice,
}

impl BatteryRequest {
    pub const SIZE: usize = 4;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        put_u16(&mut b, 0, self.version);
        b[2] = self.index;
        b[3] = self.sub_device as u8;
        b
    }
}

/// Which parts of a set-state request the driver should apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SetStateFlags(u8);

impl SetStateFlags {
    pub const NONE: SetStateFlags = SetStateFlags(0);
    pub const LED: SetStateFlags = SetStateFlags(1);
    pub const VIBRATION: SetStateFlags = SetStateFlags(2);
    pub const ALL: SetStateFlags = SetStateFlags(3);

    pub const fn from_bits(bits: u8) -> Self {
        SetStateFlags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: SetStateFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Non-empty and no bits outside LED | VIBRATION.
    pub const fn is_valid(self) -> bool {
        self.0 != 0 && self.0 & !Self::ALL.0 == 0
    }
}

impl BitOr for SetStateFlags {
    type Output = SetStateFlags;

    fn bitor(self, rhs: SetStateFlags) -> SetStateFlags {
        SetStateFlags(self.0 | rhs.0)
    }
}

/// Set LED and/or vibration: `index u8 | led u8 | left u8 | right u8 |
/// flags u8`. Same layout on every protocol revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetStateRequest {
    pub index: u8,
    pub led: LedSetting,
    pub vibration: Vibration,
    pub flags: SetStateFlags,
}

impl SetStateRequest {
    pub const SIZE: usize = 5;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        [
            self.index,
            self.led.raw(),
            self.vibration.left,
            self.vibration.right,
            self.flags.bits(),
        ]
    }
}

/// Wait for input: `version u16 | index u8 | reserved u8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitForInputRequest {
    pub version: u16,
    pub index: u8,
}

impl WaitForInputRequest {
    pub const SIZE: usize = 4;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        put_u16(&mut b, 0, self.version);
        b[2] = self.index;
        b[3] = WAIT_FOR_INPUT_RESERVED;
        b
    }
}

/// Extended bus info query: `version u16 | kind u8 | reserved [33]`.
///
/// Always sent at the newest known version, whatever the bus negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusInfoExRequest {
    pub kind: BusInfoExKind,
}

impl BusInfoExRequest {
    pub const SIZE: usize = 36;

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        put_u16(&mut b, 0, ProtocolVersion::LATEST.raw());
        b[2] = self.kind as u8;
        b
    }
}
