//! Flash layout of the peer bond.
//!
//! System OFF resets the chip, so the bond created while pairing must live
//! in flash for the host to reconnect without pairing again. Only one peer
//! is kept. The record is stored as a single `sequential-storage` map item:
//!
//! ```text
//! [0]      layout version (1)
//! [1..3]   EDIV (little-endian)
//! [3..11]  Rand
//! [11..27] LTK
//! [27]     LTK flags
//! [28..44] peer IRK
//! [44]     peer address type
//! [45..51] peer address
//! [51]     system attributes length (n)
//! [52..]   system attributes (CCCD state), n bytes
//! ```

use heapless::Vec;

/// Layout version byte.
pub const BOND_RECORD_VERSION: u8 = 1;

/// Largest system-attribute blob kept per bond.
pub const MAX_SYS_ATTRS_LEN: usize = 62;

const HEADER_LEN: usize = 52;

/// Largest serialised record.
pub const MAX_BOND_RECORD_SIZE: usize = HEADER_LEN + MAX_SYS_ATTRS_LEN;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BondRecord {
    pub ediv: u16,
    pub rand: [u8; 8],
    pub ltk: [u8; 16],
    pub ltk_flags: u8,
    pub irk: [u8; 16],
    pub addr_type: u8,
    pub addr: [u8; 6],
    pub sys_attrs: Vec<u8, MAX_SYS_ATTRS_LEN>,
}

impl BondRecord {
    /// Serialise into `buf`. Returns the bytes written, 0 if `buf` is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        let total = HEADER_LEN + self.sys_attrs.len();
        if buf.len() < total {
            return 0;
        }

        buf[0] = BOND_RECORD_VERSION;
        buf[1..3].copy_from_slice(&self.ediv.to_le_bytes());
        buf[3..11].copy_from_slice(&self.rand);
        buf[11..27].copy_from_slice(&self.ltk);
        buf[27] = self.ltk_flags;
        buf[28..44].copy_from_slice(&self.irk);
        buf[44] = self.addr_type;
        buf[45..51].copy_from_slice(&self.addr);
        buf[51] = self.sys_attrs.len() as u8;
        buf[HEADER_LEN..total].copy_from_slice(&self.sys_attrs);
        total
    }

    /// Parse a stored record. Unknown versions and truncated data yield `None`.
    pub fn deserialize(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_LEN || data[0] != BOND_RECORD_VERSION {
            return None;
        }

        let sys_len = data[51] as usize;
        let sys = data.get(HEADER_LEN..HEADER_LEN + sys_len)?;

        let mut record = Self {
            ediv: u16::from_le_bytes([data[1], data[2]]),
            ltk_flags: data[27],
            addr_type: data[44],
            ..Self::default()
        };
        record.rand.copy_from_slice(&data[3..11]);
        record.ltk.copy_from_slice(&data[11..27]);
        record.irk.copy_from_slice(&data[28..44]);
        record.addr.copy_from_slice(&data[45..51]);
        record.sys_attrs = Vec::from_slice(sys).ok()?;
        Some(record)
    }
}
