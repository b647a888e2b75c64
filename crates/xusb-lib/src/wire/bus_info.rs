//! Bus information records.
//!
//! The extended bus info response shares one data buffer between three
//! record shapes. The shape is selected by the declared data length in the
//! header, not by any version field. Nearly every field in these shapes is of
//! unknown meaning, so each record keeps its raw bytes and only exposes the
//! identity fields that are understood.

use std::fmt;

use serde::Serialize;

use super::{WireError, exact, le_u16, put_u16};

// ── Basic bus info ──

/// Bus information. Wire layout (12 bytes):
/// `version u16 | max_count u8 | device_count u8 | status u8 | reserved u8 |
/// reserved u16 | vid u16 | pid u16`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusInfo {
    pub version: u16,
    /// Number of device slots on the bus.
    pub max_count: u8,
    pub device_count: u8,
    /// Status flags. See [`crate::protocol::BUS_STATUS_RESERVED_SKIP`].
    pub status: u8,
    pub reserved0: u8,
    pub reserved1: u16,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl BusInfo {
    pub const SIZE: usize = 12;

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let b: [u8; Self::SIZE] = exact("BusInfo", buf)?;
        Ok(Self {
            version: le_u16(&b, 0),
            max_count: b[2],
            device_count: b[3],
            status: b[4],
            reserved0: b[5],
            reserved1: le_u16(&b, 6),
            vendor_id: le_u16(&b, 8),
            product_id: le_u16(&b, 10),
        })
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut b = [0u8; Self::SIZE];
        put_u16(&mut b, 0, self.version);
        b[2] = self.max_count;
        b[3] = self.device_count;
        b[4] = self.status;
        b[5] = self.reserved0;
        put_u16(&mut b, 6, self.reserved1);
        put_u16(&mut b, 8, self.vendor_id);
        put_u16(&mut b, 10, self.product_id);
        b
    }
}

// ── Extended bus info ──

/// Which record shape to request from the extended bus info query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum BusInfoExKind {
    Basic = 0,
    Full = 1,
    Minimal = 2,
}

impl BusInfoExKind {
    /// Data length the driver declares for this shape.
    pub fn data_len(self) -> usize {
        match self {
            BusInfoExKind::Minimal => BusInfoExMinimal::SIZE,
            BusInfoExKind::Basic => BusInfoExBasic::SIZE * BUS_INFO_EX_LIST_SIZE,
            BusInfoExKind::Full => BusInfoExFull::SIZE * BUS_INFO_EX_LIST_SIZE,
        }
    }

    /// Shape selected by a declared data length, if any.
    pub fn from_data_len(len: usize) -> Option<Self> {
        [
            BusInfoExKind::Minimal,
            BusInfoExKind::Basic,
            BusInfoExKind::Full,
        ]
        .into_iter()
        .find(|k| k.data_len() == len)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Some(BusInfoExKind::Minimal),
            "basic" => Some(BusInfoExKind::Basic),
            "full" => Some(BusInfoExKind::Full),
            _ => None,
        }
    }
}

impl fmt::Display for BusInfoExKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusInfoExKind::Basic => f.write_str("basic"),
            BusInfoExKind::Full => f.write_str("full"),
            BusInfoExKind::Minimal => f.write_str("minimal"),
        }
    }
}

/// Records per list in the basic and full shapes.
pub const BUS_INFO_EX_LIST_SIZE: usize = 16;

/// Header preceding the data buffer: `version u16 | failure u8 | data_len u16`.
pub const BUS_INFO_EX_HEADER_SIZE: usize = 5;

/// Capacity of the shared data buffer (the full shape fills it exactly).
pub const BUS_INFO_EX_DATA_CAPACITY: usize = 944;

/// Minimal shape: a single 32-byte record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusInfoExMinimal {
    pub raw: [u8; 32],
}

impl BusInfoExMinimal {
    pub const SIZE: usize = 32;

    pub fn vendor_id(&self) -> u16 {
        le_u16(&self.raw, 18)
    }

    pub fn product_id(&self) -> u16 {
        le_u16(&self.raw, 20)
    }
}

/// Basic shape: one 27-byte record per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusInfoExBasic {
    pub raw: [u8; 27],
}

impl BusInfoExBasic {
    pub const SIZE: usize = 27;

    pub fn vendor_id(&self) -> u16 {
        le_u16(&self.raw, 9)
    }

    pub fn product_id(&self) -> u16 {
        le_u16(&self.raw, 11)
    }
}

/// Element of the sub-list embedded in each full record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusInfoExFullSub {
    pub raw: [u8; 7],
}

impl BusInfoExFullSub {
    pub const SIZE: usize = 7;
}

/// Full shape: a 3-byte header followed by eight sub-records, per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusInfoExFull {
    pub header: [u8; 3],
    pub devices: [BusInfoExFullSub; 8],
}

impl BusInfoExFull {
    pub const SIZE: usize = 59;
    pub const SUB_COUNT: usize = 8;

    fn read(b: &[u8]) -> Self {
        let mut header = [0u8; 3];
        header.copy_from_slice(&b[..3]);
        let mut devices = [BusInfoExFullSub::default(); Self::SUB_COUNT];
        for (i, d) in devices.iter_mut().enumerate() {
            let off = 3 + i * BusInfoExFullSub::SIZE;
            d.raw.copy_from_slice(&b[off..off + BusInfoExFullSub::SIZE]);
        }
        Self { header, devices }
    }
}

/// Extended bus information.
///
/// Holds the header fields and exactly `data_len` bytes of data. The typed
/// accessors fail when the data is empty or has a different shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BusInfoEx {
    pub version: u16,
    /// Driver-reported failure flag.
    pub failure: bool,
    data: Vec<u8>,
}

impl BusInfoEx {
    /// Largest response: header plus a full data buffer.
    pub const SIZE: usize = BUS_INFO_EX_HEADER_SIZE + BUS_INFO_EX_DATA_CAPACITY;

    /// Decode a response of `bytes_returned` bytes.
    ///
    /// The response must hold the whole header, and the declared data length
    /// must fit in both the data buffer and the bytes actually returned.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < BUS_INFO_EX_HEADER_SIZE || buf.len() > Self::SIZE {
            return Err(WireError::SizeMismatch {
                layout: "BusInfoEx",
                expected: Self::SIZE,
                actual: buf.len(),
            });
        }
        let data_len = le_u16(buf, 3) as usize;
        let available = buf.len() - BUS_INFO_EX_HEADER_SIZE;
        if data_len > available {
            return Err(WireError::SizeMismatch {
                layout: "BusInfoEx data",
                expected: data_len,
                actual: available,
            });
        }
        Ok(Self {
            version: le_u16(buf, 0),
            failure: buf[2] != 0,
            data: buf[BUS_INFO_EX_HEADER_SIZE..BUS_INFO_EX_HEADER_SIZE + data_len].to_vec(),
        })
    }

    /// Build from header fields and data bytes.
    pub fn new(version: u16, failure: bool, data: Vec<u8>) -> Result<Self, WireError> {
        if data.len() > BUS_INFO_EX_DATA_CAPACITY {
            return Err(WireError::SizeMismatch {
                layout: "BusInfoEx data",
                expected: BUS_INFO_EX_DATA_CAPACITY,
                actual: data.len(),
            });
        }
        Ok(Self {
            version,
            failure,
            data,
        })
    }

    /// Encode as a full-size response, zero-padding the unused data tail.
    pub fn encode(&self) -> Vec<u8> {
        let mut b = vec![0u8; Self::SIZE];
        put_u16(&mut b, 0, self.version);
        b[2] = self.failure as u8;
        put_u16(&mut b, 3, self.data.len() as u16);
        b[BUS_INFO_EX_HEADER_SIZE..BUS_INFO_EX_HEADER_SIZE + self.data.len()]
            .copy_from_slice(&self.data);
        b
    }

    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Shape implied by the declared data length.
    pub fn kind(&self) -> Option<BusInfoExKind> {
        BusInfoExKind::from_data_len(self.data.len())
    }

    /// The declared data bytes, uninterpreted. Empty when there is no data.
    pub fn raw(&self) -> &[u8] {
        &self.data
    }

    fn expect(&self, kind: BusInfoExKind) -> Result<(), WireError> {
        if self.data.is_empty() {
            return Err(WireError::Empty);
        }
        if self.data.len() != kind.data_len() {
            return Err(WireError::WrongShape {
                requested: kind,
                data_len: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn minimal(&self) -> Result<BusInfoExMinimal, WireError> {
        self.expect(BusInfoExKind::Minimal)?;
        let raw: [u8; BusInfoExMinimal::SIZE] = exact("BusInfoEx minimal", &self.data)?;
        Ok(BusInfoExMinimal { raw })
    }

    pub fn basic(&self) -> Result<[BusInfoExBasic; BUS_INFO_EX_LIST_SIZE], WireError> {
        self.expect(BusInfoExKind::Basic)?;
        let mut out = [BusInfoExBasic {
            raw: [0; BusInfoExBasic::SIZE],
        }; BUS_INFO_EX_LIST_SIZE];
        for (rec, chunk) in out
            .iter_mut()
            .zip(self.data.chunks_exact(BusInfoExBasic::SIZE))
        {
            rec.raw.copy_from_slice(chunk);
        }
        Ok(out)
    }

    pub fn full(&self) -> Result<Vec<BusInfoExFull>, WireError> {
        self.expect(BusInfoExKind::Full)?;
        Ok(self
            .data
            .chunks_exact(BusInfoExFull::SIZE)
            .map(BusInfoExFull::read)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_data(len: usize) -> BusInfoEx {
        let data = (0..len).map(|i| (i % 251) as u8).collect();
        BusInfoEx::new(0x0104, false, data).unwrap()
    }

    #[test]
    fn bus_info_layout() {
        let info = BusInfo {
            version: 0x0102,
            max_count: 4,
            device_count: 2,
            status: 0x01,
            reserved0: 0xAA,
            reserved1: 0xBBCC,
            vendor_id: 0x045E,
            product_id: 0x02A1,
        };
        let b = info.encode();
        assert_eq!(b, [0x02, 0x01, 4, 2, 1, 0xAA, 0xCC, 0xBB, 0x5E, 0x04, 0xA1, 0x02]);
        assert_eq!(BusInfo::decode(&b).unwrap(), info);
        assert!(BusInfo::decode(&b[..11]).is_err());
    }

    #[test]
    fn shape_sizes() {
        assert_eq!(BusInfoExKind::Minimal.data_len(), 32);
        assert_eq!(BusInfoExKind::Basic.data_len(), 432);
        assert_eq!(BusInfoExKind::Full.data_len(), BUS_INFO_EX_DATA_CAPACITY);
        assert_eq!(BusInfoEx::SIZE, 949);
        assert_eq!(
            BusInfoExFull::SIZE,
            3 + BusInfoExFull::SUB_COUNT * BusInfoExFullSub::SIZE
        );
    }

    #[test]
    fn empty_fails_all_accessors() {
        let info = BusInfoEx::decode(&BusInfoEx::default().encode()).unwrap();
        assert!(info.is_empty());
        assert!(info.raw().is_empty());
        assert_eq!(info.kind(), None);
        assert_eq!(info.minimal().unwrap_err(), WireError::Empty);
        assert_eq!(info.basic().unwrap_err(), WireError::Empty);
        assert_eq!(info.full().unwrap_err(), WireError::Empty);
    }

    #[test]
    fn minimal_shape_selected() {
        let info = with_data(32);
        let m = info.minimal().unwrap();
        assert_eq!(m.vendor_id(), u16::from_le_bytes([18, 19]));
        assert_eq!(m.product_id(), u16::from_le_bytes([20, 21]));
        assert!(matches!(
            info.basic().unwrap_err(),
            WireError::WrongShape { .. }
        ));
        assert!(info.full().is_err());
    }

    #[test]
    fn basic_shape_selected() {
        let info = with_data(432);
        let list = info.basic().unwrap();
        assert_eq!(list.len(), 16);
        assert_eq!(list[1].raw[0], 27);
        assert_eq!(list[0].vendor_id(), u16::from_le_bytes([9, 10]));
        assert!(info.minimal().is_err());
        assert!(info.full().is_err());
    }

    #[test]
    fn full_shape_selected() {
        let info = with_data(944);
        let list = info.full().unwrap();
        assert_eq!(list.len(), 16);
        for rec in &list {
            assert_eq!(rec.devices.len(), 8);
        }
        assert_eq!(list[0].header, [0, 1, 2]);
        assert_eq!(list[0].devices[0].raw, [3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(list[0].devices[7].raw[6], 58);
        assert_eq!(list[1].header[0], 59);
        assert!(info.minimal().is_err());
        assert!(info.basic().is_err());
    }

    #[test]
    fn other_lengths_fail_all_accessors() {
        for len in [1, 31, 33, 431, 500, 943] {
            let info = with_data(len);
            assert_eq!(info.kind(), None);
            assert!(info.minimal().is_err(), "len {len}");
            assert!(info.basic().is_err(), "len {len}");
            assert!(info.full().is_err(), "len {len}");
            assert_eq!(info.raw().len(), len);
        }
    }

    #[test]
    fn decode_reads_declared_length_only() {
        let info = with_data(32);
        let mut b = info.encode();
        // garbage past the declared data is ignored
        b[BUS_INFO_EX_HEADER_SIZE + 40] = 0xFF;
        let back = BusInfoEx::decode(&b).unwrap();
        assert_eq!(back, info);
        // a short response that still covers the declared data is accepted
        let short = BusInfoEx::decode(&b[..BUS_INFO_EX_HEADER_SIZE + 32]).unwrap();
        assert_eq!(short, info);
    }

    #[test]
    fn decode_rejects_truncated_data() {
        let b = with_data(432).encode();
        assert!(BusInfoEx::decode(&b[..BUS_INFO_EX_HEADER_SIZE + 100]).is_err());
        assert!(BusInfoEx::decode(&b[..4]).is_err());
    }

    #[test]
    fn declared_length_beyond_capacity_rejected() {
        assert!(BusInfoEx::new(0x0104, false, vec![0; 945]).is_err());
        let mut b = vec![0u8; BusInfoEx::SIZE];
        put_u16(&mut b, 3, 945);
        assert!(BusInfoEx::decode(&b).is_err());
    }

    #[test]
    fn failure_flag_and_version() {
        let b = BusInfoEx::new(0x0104, true, vec![]).unwrap().encode();
        let back = BusInfoEx::decode(&b).unwrap();
        assert!(back.failure);
        assert_eq!(back.version, 0x0104);
    }

    #[test]
    fn kind_parse() {
        assert_eq!(BusInfoExKind::parse("Full"), Some(BusInfoExKind::Full));
        assert_eq!(BusInfoExKind::parse("tiny"), None);
        assert_eq!(BusInfoExKind::Minimal as u8, 2);
    }
}
