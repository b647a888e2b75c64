use serde::Serialize;

use super::{WireError, exact, le_i16, le_u16, put_i16, put_u16};

/// Button bitmask values (XInput-compatible).
pub mod buttons {
    pub const DPAD_UP: u16 = 0x0001;
    pub const DPAD_DOWN: u16 = 0x0002;
    pub const DPAD_LEFT: u16 = 0x0004;
    pub const DPAD_RIGHT: u16 = 0x0008;
    pub const START: u16 = 0x0010;
    pub const BACK: u16 = 0x0020;
    pub const LEFT_THUMB: u16 = 0x0040;
    pub const RIGHT_THUMB: u16 = 0x0080;
    pub const LEFT_SHOULDER: u16 = 0x0100;
    pub const RIGHT_SHOULDER: u16 = 0x0200;
    pub const GUIDE: u16 = 0x0400;
    pub const A: u16 = 0x1000;
    pub const B: u16 = 0x2000;
    pub const X: u16 = 0x4000;
    pub const Y: u16 = 0x8000;

    /// Names of the set bits, in bit order.
    pub fn names(mask: u16) -> Vec<&'static str> {
        const TABLE: [(u16, &str); 15] = [
            (DPAD_UP, "up"),
            (DPAD_DOWN, "down"),
            (DPAD_LEFT, "left"),
            (DPAD_RIGHT, "right"),
            (START, "start"),
            (BACK, "back"),
            (LEFT_THUMB, "ls"),
            (RIGHT_THUMB, "rs"),
            (LEFT_SHOULDER, "lb"),
            (RIGHT_SHOULDER, "rb"),
            (GUIDE, "guide"),
            (A, "a"),
            (B, "b"),
            (X, "x"),
            (Y, "y"),
        ];
        TABLE
            .iter()
            .filter(|(bit, _)| mask & bit != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

/// Standard gamepad input.
///
/// Wire layout (12 bytes): `buttons u16 | lt u8 | rt u8 | lx i16 | ly i16 |
/// rx i16 | ry i16`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Gamepad {
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub left_thumb_x: i16,
    pub left_thumb_y: i16,
    pub right_thumb_x: i16,
    pub right_thumb_y: i16,
}

impl Gamepad {
    pub const SIZE: usize = 12;

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let b: [u8; Self::SIZE] = exact("Gamepad", buf)?;
        Ok(Self::read(&b))
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        self.write(&mut b);
        b
    }

    /// Read from the first 12 bytes of `b`. Never touches anything beyond.
    pub(crate) fn read(b: &[u8]) -> Self {
        Self {
            buttons: le_u16(b, 0),
            left_trigger: b[2],
            right_trigger: b[3],
            left_thumb_x: le_i16(b, 4),
            left_thumb_y: le_i16(b, 6),
            right_thumb_x: le_i16(b, 8),
            right_thumb_y: le_i16(b, 10),
        }
    }

    pub(crate) fn write(&self, b: &mut [u8]) {
        put_u16(b, 0, self.buttons);
        b[2] = self.left_trigger;
        b[3] = self.right_trigger;
        put_i16(b, 4, self.left_thumb_x);
        put_i16(b, 6, self.left_thumb_y);
        put_i16(b, 8, self.right_thumb_x);
        put_i16(b, 10, self.right_thumb_y);
    }

    pub fn is_pressed(&self, mask: u16) -> bool {
        self.buttons & mask == mask
    }

    /// Widen to the extended layout with zeroed reserved bytes.
    pub fn extend(self) -> GamepadEx {
        GamepadEx {
            standard: self,
            reserved: [0; 6],
        }
    }
}

/// Extended gamepad input (protocol 1.1+): the standard layout followed by
/// six reserved bytes whose meaning is unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GamepadEx {
    #[serde(flatten)]
    pub standard: Gamepad,
    pub reserved: [u8; 6],
}

impl GamepadEx {
    pub const SIZE: usize = 18;

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let b: [u8; Self::SIZE] = exact("GamepadEx", buf)?;
        Ok(Self::read(&b))
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        self.write(&mut b);
        b
    }

    pub(crate) fn read(b: &[u8]) -> Self {
        let mut reserved = [0u8; 6];
        reserved.copy_from_slice(&b[Gamepad::SIZE..Self::SIZE]);
        Self {
            standard: Gamepad::read(b),
            reserved,
        }
    }

    pub(crate) fn write(&self, b: &mut [u8]) {
        self.standard.write(b);
        b[Gamepad::SIZE..Self::SIZE].copy_from_slice(&self.reserved);
    }

    /// Truncate to the standard layout.
    pub fn standard(&self) -> Gamepad {
        self.standard
    }
}

impl From<GamepadEx> for Gamepad {
    fn from(ex: GamepadEx) -> Self {
        ex.standard
    }
}

/// Motor speeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Vibration {
    pub left: u8,
    pub right: u8,
}

impl Vibration {
    pub const SIZE: usize = 2;

    pub const ZERO: Vibration = Vibration::new(0, 0);
    pub const FULL: Vibration = Vibration::new(u8::MAX, u8::MAX);
    pub const LEFT_FULL: Vibration = Vibration::new(u8::MAX, 0);
    pub const RIGHT_FULL: Vibration = Vibration::new(0, u8::MAX);

    pub const fn new(left: u8, right: u8) -> Self {
        Self { left, right }
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let b: [u8; Self::SIZE] = exact("Vibration", buf)?;
        Ok(Self::new(b[0], b[1]))
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        [self.left, self.right]
    }
}
