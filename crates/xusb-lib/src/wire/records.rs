//! Per-device response records.
//!
//! Layouts that changed between driver revisions are modelled as one struct
//! per revision wrapped in a tagged enum; the tag follows what the driver
//! actually returned.

use std::fmt;

use serde::Serialize;

use super::{
    Gamepad, GamepadEx, ProtocolVersion, Vibration, WireError, exact, le_u16, le_u32, put_u16,
    put_u32,
};

// ── Enumerations ──

/// LED animation setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum LedSetting {
    Off = 0,
    Blink = 1,
    Player1SwitchBlink = 2,
    Player2SwitchBlink = 3,
    Player3SwitchBlink = 4,
    Player4SwitchBlink = 5,
    Player1 = 6,
    Player2 = 7,
    Player3 = 8,
    Player4 = 9,
    Cycle = 10,
    FastBlink = 11,
    SlowBlink = 12,
    Flipflop = 13,
    AllBlink = 14,
}

impl LedSetting {
    pub const ALL: [LedSetting; 15] = [
        LedSetting::Off,
        LedSetting::Blink,
        LedSetting::Player1SwitchBlink,
        LedSetting::Player2SwitchBlink,
        LedSetting::Player3SwitchBlink,
        LedSetting::Player4SwitchBlink,
        LedSetting::Player1,
        LedSetting::Player2,
        LedSetting::Player3,
        LedSetting::Player4,
        LedSetting::Cycle,
        LedSetting::FastBlink,
        LedSetting::SlowBlink,
        LedSetting::Flipflop,
        LedSetting::AllBlink,
    ];

    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    pub fn raw(self) -> u8 {
        self as u8
    }

    /// Player slot (0-based) shown by this pattern, if it identifies one.
    ///
    /// Only the steady and switch-blink player patterns map to a slot. Used as
    /// a discovery hint; never authoritative.
    pub fn player_index(self) -> Option<u8> {
        match self {
            LedSetting::Player1 | LedSetting::Player1SwitchBlink => Some(0),
            LedSetting::Player2 | LedSetting::Player2SwitchBlink => Some(1),
            LedSetting::Player3 | LedSetting::Player3SwitchBlink => Some(2),
            LedSetting::Player4 | LedSetting::Player4SwitchBlink => Some(3),
            _ => None,
        }
    }

    /// Kebab-case name, as accepted by [`parse`](Self::parse).
    pub fn name(self) -> &'static str {
        match self {
            LedSetting::Off => "off",
            LedSetting::Blink => "blink",
            LedSetting::Player1SwitchBlink => "player1-switch-blink",
            LedSetting::Player2SwitchBlink => "player2-switch-blink",
            LedSetting::Player3SwitchBlink => "player3-switch-blink",
            LedSetting::Player4SwitchBlink => "player4-switch-blink",
            LedSetting::Player1 => "player1",
            LedSetting::Player2 => "player2",
            LedSetting::Player3 => "player3",
            LedSetting::Player4 => "player4",
            LedSetting::Cycle => "cycle",
            LedSetting::FastBlink => "fast-blink",
            LedSetting::SlowBlink => "slow-blink",
            LedSetting::Flipflop => "flipflop",
            LedSetting::AllBlink => "all-blink",
        }
    }

    /// Parse a kebab-case name or a raw numeric value.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u8>() {
            return Self::from_raw(n);
        }
        let lower = s.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|l| l.name() == lower)
    }
}

impl fmt::Display for LedSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sub-device selector for battery queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum SubDevice {
    #[default]
    Gamepad = 0,
    Headset = 1,
}

// ── LED state ──

/// LED state. Wire layout (3 bytes): `version u16 | led u8`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedState {
    pub version: u16,
    /// Raw LED value; may fall outside [`LedSetting`].
    pub led: u8,
}

impl LedState {
    pub const SIZE: usize = 3;

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let b: [u8; Self::SIZE] = exact("LedState", buf)?;
        Ok(Self {
            version: le_u16(&b, 0),
            led: b[2],
        })
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        put_u16(&mut b, 0, self.version);
        b[2] = self.led;
        b
    }

    pub fn setting(&self) -> Option<LedSetting> {
        LedSetting::from_raw(self.led)
    }
}

// ── Input state ──

/// Input state as returned by 1.0 drivers (20 bytes, no version field).
///
/// `status u8 | reserved [2] | packet u32 | reserved u8 | gamepad [12]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InputStateV0 {
    pub status: u8,
    pub reserved0: [u8; 2],
    pub packet_number: u32,
    pub reserved1: u8,
    pub gamepad: Gamepad,
}

impl InputStateV0 {
    pub const SIZE: usize = 20;

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let b: [u8; Self::SIZE] = exact("InputState 1.0", buf)?;
        Ok(Self {
            status: b[0],
            reserved0: [b[1], b[2]],
            packet_number: le_u32(&b, 3),
            reserved1: b[7],
            gamepad: Gamepad::read(&b[8..]),
        })
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        b[0] = self.status;
        b[1..3].copy_from_slice(&self.reserved0);
        put_u32(&mut b, 3, self.packet_number);
        b[7] = self.reserved1;
        self.gamepad.write(&mut b[8..]);
        b
    }
}

/// Input state as returned by 1.1+ drivers (29 bytes).
///
/// `version u16 | status u8 | reserved [2] | packet u32 | reserved [2] |
/// gamepad_ex [18]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InputStateV1 {
    pub version: u16,
    pub status: u8,
    pub reserved0: [u8; 2],
    pub packet_number: u32,
    pub reserved1: [u8; 2],
    pub gamepad: GamepadEx,
}

impl InputStateV1 {
    pub const SIZE: usize = 29;

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let b: [u8; Self::SIZE] = exact("InputState 1.1", buf)?;
        Ok(Self {
            version: le_u16(&b, 0),
            status: b[2],
            reserved0: [b[3], b[4]],
            packet_number: le_u32(&b, 5),
            reserved1: [b[9], b[10]],
            gamepad: GamepadEx::read(&b[11..]),
        })
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        put_u16(&mut b, 0, self.version);
        b[2] = self.status;
        b[3..5].copy_from_slice(&self.reserved0);
        put_u32(&mut b, 5, self.packet_number);
        b[9..11].copy_from_slice(&self.reserved1);
        self.gamepad.write(&mut b[11..]);
        b
    }
}

/// Input state in whichever layout the driver returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "layout")]
pub enum InputState {
    V1_0(InputStateV0),
    V1_1(InputStateV1),
}

impl Default for InputState {
    fn default() -> Self {
        InputState::V1_1(InputStateV1::default())
    }
}

impl InputState {
    /// Raw version tag. 1.0 responses carry none and report `0x0100`.
    pub fn version(&self) -> u16 {
        match self {
            InputState::V1_0(_) => ProtocolVersion::V1_0.raw(),
            InputState::V1_1(s) => s.version,
        }
    }

    /// Liveness byte; zero means the device is not connected.
    pub fn status(&self) -> u8 {
        match self {
            InputState::V1_0(s) => s.status,
            InputState::V1_1(s) => s.status,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status() != 0
    }

    pub fn packet_number(&self) -> u32 {
        match self {
            InputState::V1_0(s) => s.packet_number,
            InputState::V1_1(s) => s.packet_number,
        }
    }

    /// Standard gamepad, truncating the extended layout if present.
    pub fn gamepad(&self) -> Gamepad {
        match self {
            InputState::V1_0(s) => s.gamepad,
            InputState::V1_1(s) => s.gamepad.standard(),
        }
    }

    /// Extended gamepad, only present in 1.1+ responses.
    pub fn gamepad_ex(&self) -> Option<GamepadEx> {
        match self {
            InputState::V1_0(_) => None,
            InputState::V1_1(s) => Some(s.gamepad),
        }
    }
}

impl From<InputStateV0> for InputState {
    fn from(s: InputStateV0) -> Self {
        InputState::V1_0(s)
    }
}

impl From<InputStateV1> for InputState {
    fn from(s: InputStateV1) -> Self {
        InputState::V1_1(s)
    }
}

// ── Capabilities ──

/// Capabilities as returned by 1.1 drivers (24 bytes).
///
/// `version u16 | type u8 | subtype u8 | gamepad_ex [18] | vibration [2]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitiesV1 {
    pub version: u16,
    pub device_type: u8,
    pub device_subtype: u8,
    pub gamepad: GamepadEx,
    pub vibration: Vibration,
}

impl CapabilitiesV1 {
    pub const SIZE: usize = 24;

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let b: [u8; Self::SIZE] = exact("Capabilities 1.1", buf)?;
        Ok(Self {
            version: le_u16(&b, 0),
            device_type: b[2],
            device_subtype: b[3],
            gamepad: GamepadEx::read(&b[4..]),
            vibration: Vibration::new(b[22], b[23]),
        })
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        put_u16(&mut b, 0, self.version);
        b[2] = self.device_type;
        b[3] = self.device_subtype;
        self.gamepad.write(&mut b[4..]);
        b[22..24].copy_from_slice(&self.vibration.encode());
        b
    }
}

/// Capabilities as returned by 1.2+ drivers (36 bytes).
///
/// `version u16 | type u8 | subtype u8 | flags u16 | vid u16 | pid u16 |
/// revision u16 | serial u32 | gamepad_ex [18] | vibration [2]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapabilitiesV2 {
    pub version: u16,
    pub device_type: u8,
    pub device_subtype: u8,
    pub flags: u16,
    pub vendor_id: u16,
    pub product_id: u16,
    pub revision: u16,
    pub serial: u32,
    pub gamepad: GamepadEx,
    pub vibration: Vibration,
}

impl CapabilitiesV2 {
    pub const SIZE: usize = 36;

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let b: [u8; Self::SIZE] = exact("Capabilities 1.2", buf)?;
        Ok(Self {
            version: le_u16(&b, 0),
            device_type: b[2],
            device_subtype: b[3],
            flags: le_u16(&b, 4),
            vendor_id: le_u16(&b, 6),
            product_id: le_u16(&b, 8),
            revision: le_u16(&b, 10),
            serial: le_u32(&b, 12),
            gamepad: GamepadEx::read(&b[16..]),
            vibration: Vibration::new(b[34], b[35]),
        })
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        put_u16(&mut b, 0, self.version);
        b[2] = self.device_type;
        b[3] = self.device_subtype;
        put_u16(&mut b, 4, self.flags);
        put_u16(&mut b, 6, self.vendor_id);
        put_u16(&mut b, 8, self.product_id);
        put_u16(&mut b, 10, self.revision);
        put_u32(&mut b, 12, self.serial);
        self.gamepad.write(&mut b[16..]);
        b[34..36].copy_from_slice(&self.vibration.encode());
        b
    }
}

/// Capabilities in whichever layout the driver returned.
///
/// `None` is the payload for buses too old to report capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "layout")]
pub enum Capabilities {
    #[default]
    None,
    V1_1(CapabilitiesV1),
    V1_2(CapabilitiesV2),
}

impl Capabilities {
    /// Raw version tag, or `0` when nothing was reported.
    pub fn version(&self) -> u16 {
        match self {
            Capabilities::None => 0,
            Capabilities::V1_1(c) => c.version,
            Capabilities::V1_2(c) => c.version,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Capabilities::None)
    }

    pub fn device_type(&self) -> u8 {
        match self {
            Capabilities::None => 0,
            Capabilities::V1_1(c) => c.device_type,
            Capabilities::V1_2(c) => c.device_type,
        }
    }

    pub fn device_subtype(&self) -> u8 {
        match self {
            Capabilities::None => 0,
            Capabilities::V1_1(c) => c.device_subtype,
            Capabilities::V1_2(c) => c.device_subtype,
        }
    }

    pub fn gamepad(&self) -> GamepadEx {
        match self {
            Capabilities::None => GamepadEx::default(),
            Capabilities::V1_1(c) => c.gamepad,
            Capabilities::V1_2(c) => c.gamepad,
        }
    }

    pub fn vibration(&self) -> Vibration {
        match self {
            Capabilities::None => Vibration::ZERO,
            Capabilities::V1_1(c) => c.vibration,
            Capabilities::V1_2(c) => c.vibration,
        }
    }
}

// ── Battery / audio ──

/// Battery information. Wire layout (4 bytes): `version u16 | type u8 |
/// level u8`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatteryInfo {
    pub version: u16,
    pub battery_type: u8,
    pub level: u8,
}

impl BatteryInfo {
    pub const SIZE: usize = 4;

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let b: [u8; Self::SIZE] = exact("BatteryInfo", buf)?;
        Ok(Self {
            version: le_u16(&b, 0),
            battery_type: b[2],
            level: b[3],
        })
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        put_u16(&mut b, 0, self.version);
        b[2] = self.battery_type;
        b[3] = self.level;
        b
    }

    /// XInput-style name for the battery type byte.
    pub fn type_name(&self) -> &'static str {
        match self.battery_type {
            0x00 => "disconnected",
            0x01 => "wired",
            0x02 => "alkaline",
            0x03 => "nimh",
            0xFF => "unknown",
            _ => "other",
        }
    }

    /// XInput-style name for the charge level byte.
    pub fn level_name(&self) -> &'static str {
        match self.level {
            0x00 => "empty",
            0x01 => "low",
            0x02 => "medium",
            0x03 => "full",
            _ => "other",
        }
    }
}

/// Audio sub-device identity. Wire layout (7 bytes): `version u16 | vid u16 |
/// pid u16 | reserved u8`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AudioDeviceInfo {
    pub version: u16,
    pub vendor_id: u16,
    pub product_id: u16,
    pub reserved: u8,
}

impl AudioDeviceInfo {
    pub const SIZE: usize = 7;

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let b: [u8; Self::SIZE] = exact("AudioDeviceInfo", buf)?;
        Ok(Self {
            version: le_u16(&b, 0),
            vendor_id: le_u16(&b, 2),
            product_id: le_u16(&b, 4),
            reserved: b[6],
        })
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        put_u16(&mut b, 0, self.version);
        put_u16(&mut b, 2, self.vendor_id);
        put_u16(&mut b, 4, self.product_id);
        b[6] = self.reserved;
        b
    }
}
