use std::fmt;

use serde::Serialize;

/// Driver protocol revision negotiated with a bus.
///
/// Ordered: later revisions compare greater, so version guards read as
/// `version >= ProtocolVersion::V1_2`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ProtocolVersion {
    #[default]
    Unsupported,
    V1_0,
    V1_1,
    V1_2,
    V1_3,
    V1_4,
}

impl ProtocolVersion {
    /// Highest revision this crate knows how to speak.
    pub const LATEST: ProtocolVersion = ProtocolVersion::V1_4;

    /// Parse the raw `major << 8 | minor` value reported by the driver.
    ///
    /// Zero and pre-1.0 values are `Unsupported`. Revisions newer than
    /// [`LATEST`](Self::LATEST) are treated as `LATEST`; every operation
    /// already uses its newest layout from 1.2 on.
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0x0100 => ProtocolVersion::V1_0,
            0x0101 => ProtocolVersion::V1_1,
            0x0102 => ProtocolVersion::V1_2,
            0x0103 => ProtocolVersion::V1_3,
            0x0104 => ProtocolVersion::V1_4,
            r if r > 0x0104 => ProtocolVersion::LATEST,
            _ => ProtocolVersion::Unsupported,
        }
    }

    /// The raw wire value (`0` for `Unsupported`).
    pub fn raw(self) -> u16 {
        match self {
            ProtocolVersion::Unsupported => 0,
            ProtocolVersion::V1_0 => 0x0100,
            ProtocolVersion::V1_1 => 0x0101,
            ProtocolVersion::V1_2 => 0x0102,
            ProtocolVersion::V1_3 => 0x0103,
            ProtocolVersion::V1_4 => 0x0104,
        }
    }

    pub fn is_supported(self) -> bool {
        self != ProtocolVersion::Unsupported
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::Unsupported => write!(f, "unsupported"),
            v => {
                let raw = v.raw();
                write!(f, "{}.{}", raw >> 8, raw & 0xFF)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip_for_known_versions() {
        for v in [
            ProtocolVersion::V1_0,
            ProtocolVersion::V1_1,
            ProtocolVersion::V1_2,
            ProtocolVersion::V1_3,
            ProtocolVersion::V1_4,
        ] {
            assert_eq!(ProtocolVersion::from_raw(v.raw()), v);
        }
    }

    #[test]
    fn zero_and_pre_release_are_unsupported() {
        assert_eq!(ProtocolVersion::from_raw(0), ProtocolVersion::Unsupported);
        assert_eq!(ProtocolVersion::from_raw(0x00FF), ProtocolVersion::Unsupported);
        assert!(!ProtocolVersion::Unsupported.is_supported());
    }

    #[test]
    fn newer_revisions_clamp_to_latest() {
        assert_eq!(ProtocolVersion::from_raw(0x0105), ProtocolVersion::LATEST);
        assert_eq!(ProtocolVersion::from_raw(0x0200), ProtocolVersion::LATEST);
    }

    #[test]
    fn versions_are_ordered() {
        assert!(ProtocolVersion::Unsupported < ProtocolVersion::V1_0);
        assert!(ProtocolVersion::V1_1 < ProtocolVersion::V1_2);
        assert!(ProtocolVersion::V1_4 >= ProtocolVersion::V1_2);
    }

    #[test]
    fn display_as_major_minor() {
        assert_eq!(ProtocolVersion::V1_3.to_string(), "1.3");
        assert_eq!(ProtocolVersion::Unsupported.to_string(), "unsupported");
    }
}
