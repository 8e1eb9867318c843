//! IOS configuration area layout.
//!
//! Offsets are relative to the start of one copy of the configuration area.
//! All multi-byte fields are big-endian.
//!
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | `0x06` | 2    | magic 1 (`0xF0A5`)                      |
//! | `0x08` | 2    | magic 2 (`0xABCD`)                      |
//! | `0x0A` | 2    | version (`0x0001`)                      |
//! | `0x0C` | 2    | checksum over `[0x08, copy_size)`       |
//! | `0x0E` | 2    | format tag (`0x0C04`, uncompressed)     |
//! | `0x10` | 4    | config start, relative to `0x08`        |
//! | `0x14` | 4    | config end, relative to `0x08`          |
//! | `0x18` | 4    | config length, NUL terminator included  |
//! | `0x2C` | n    | configuration text                      |

pub const MAGIC1_OFFSET: usize = 0x06;
pub const MAGIC2_OFFSET: usize = 0x08;
pub const VERSION_OFFSET: usize = 0x0a;
pub const CHECKSUM_OFFSET: usize = 0x0c;
pub const FORMAT_OFFSET: usize = 0x0e;
pub const START_OFFSET: usize = 0x10;
pub const END_OFFSET: usize = 0x14;
pub const LENGTH_OFFSET: usize = 0x18;
pub const TEXT_OFFSET: usize = 0x2c;

/// Start of the range covered by the checksum and base of relative offsets.
pub const CHECKSUM_START: usize = 0x08;

/// Bytes that must exist past the area base before the header is read.
pub const HEADER_LEN: usize = 0x30;

pub const MAGIC1: u16 = 0xf0a5;
pub const MAGIC2: u16 = 0xabcd;
pub const VERSION: u16 = 0x0001;
pub const FORMAT_UNCOMPRESSED: u16 = 0x0c04;

/// Placement of the primary and backup configuration copies in a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NvramGeometry {
    /// Offset of the primary copy within the region.
    pub base: usize,
    /// Size of one copy; the backup copy starts at `base + copy_size`.
    pub copy_size: usize,
}

impl NvramGeometry {
    pub const fn new(base: usize, copy_size: usize) -> Self {
        Self { base, copy_size }
    }

    pub const fn backup_base(&self) -> usize {
        self.base + self.copy_size
    }

    /// Minimum region length holding both copies.
    pub const fn required_len(&self) -> usize {
        self.base + 2 * self.copy_size
    }

    /// Largest text payload (NUL included) a single copy can hold.
    pub const fn capacity(&self) -> usize {
        self.copy_size.saturating_sub(TEXT_OFFSET)
    }
}
