//! IOS configuration text encoding in the NVRAM area.
//!
//! [`push_config`] writes the same encoded text to the primary and backup
//! copies; [`extract_config`] only ever reads the primary copy and never
//! mutates the region.

use crate::checksum::nvram_cksum;
use crate::error::{NvramError, Result};
use crate::layout::*;
use byteorder::{BigEndian, ByteOrder};
use tracing::debug;

/// Decoded header of one configuration copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigHeader {
    pub magic1: u16,
    pub magic2: u16,
    pub version: u16,
    pub checksum: u16,
    pub format: u16,
    pub start: u32,
    pub end: u32,
    pub length: u32,
}

impl ConfigHeader {
    /// Reads the header at the start of `copy`.
    pub fn read(copy: &[u8]) -> Result<Self> {
        if copy.len() < HEADER_LEN {
            return Err(NvramError::TruncatedRegion {
                needed: HEADER_LEN,
                available: copy.len(),
            });
        }

        Ok(Self {
            magic1: BigEndian::read_u16(&copy[MAGIC1_OFFSET..]),
            magic2: BigEndian::read_u16(&copy[MAGIC2_OFFSET..]),
            version: BigEndian::read_u16(&copy[VERSION_OFFSET..]),
            checksum: BigEndian::read_u16(&copy[CHECKSUM_OFFSET..]),
            format: BigEndian::read_u16(&copy[FORMAT_OFFSET..]),
            start: BigEndian::read_u32(&copy[START_OFFSET..]),
            end: BigEndian::read_u32(&copy[END_OFFSET..]),
            length: BigEndian::read_u32(&copy[LENGTH_OFFSET..]),
        })
    }

    pub fn has_magic(&self) -> bool {
        self.magic1 == MAGIC1 && self.magic2 == MAGIC2
    }
}

/// Extracts the configuration text stored in the primary copy.
///
/// The returned buffer excludes the stored NUL terminator. A stored length of
/// zero decodes to an empty configuration.
///
/// # Errors
///
/// * [`NvramError::TruncatedRegion`] if the header or the announced text runs
///   past the end of `region`
/// * [`NvramError::BadMagic`] if the area holds no IOS configuration
pub fn extract_config(region: &[u8], geometry: &NvramGeometry) -> Result<Vec<u8>> {
    let base = geometry.base;
    if base.saturating_add(HEADER_LEN) >= region.len() {
        return Err(NvramError::TruncatedRegion {
            needed: base.saturating_add(HEADER_LEN + 1),
            available: region.len(),
        });
    }

    let header = ConfigHeader::read(&region[base..])?;
    if !header.has_magic() {
        return Err(NvramError::BadMagic {
            magic1: header.magic1,
            magic2: header.magic2,
        });
    }

    // The start field holds the 1-based text position minus one.
    let config_start = header.start as usize + 1;
    let config_length = header.length as usize;

    let text_start = base + CHECKSUM_START + config_start - 1;
    let text_end = text_start.saturating_add(config_length);
    if text_end > region.len() {
        return Err(NvramError::TruncatedRegion {
            needed: text_end,
            available: region.len(),
        });
    }

    if config_length == 0 {
        return Ok(Vec::new());
    }

    debug!(
        base,
        length = config_length,
        "Extracted configuration from NVRAM"
    );
    Ok(region[text_start..text_end - 1].to_vec())
}

/// Encodes `payload` verbatim into a single configuration copy.
///
/// `copy` spans exactly one copy of the area; the checksum covers everything
/// from offset `0x08` to its end.
pub fn encode_copy(copy: &mut [u8], payload: &[u8]) -> Result<()> {
    if copy.len() < HEADER_LEN {
        return Err(NvramError::TruncatedRegion {
            needed: HEADER_LEN,
            available: copy.len(),
        });
    }
    let capacity = copy.len() - TEXT_OFFSET;
    if payload.len() > capacity {
        return Err(NvramError::ConfigTooLarge {
            len: payload.len(),
            capacity,
        });
    }

    BigEndian::write_u16(&mut copy[MAGIC1_OFFSET..], MAGIC1);
    BigEndian::write_u16(&mut copy[MAGIC2_OFFSET..], MAGIC2);
    BigEndian::write_u16(&mut copy[VERSION_OFFSET..], VERSION);
    BigEndian::write_u16(&mut copy[CHECKSUM_OFFSET..], 0);
    BigEndian::write_u16(&mut copy[FORMAT_OFFSET..], FORMAT_UNCOMPRESSED);

    copy[TEXT_OFFSET..TEXT_OFFSET + payload.len()].copy_from_slice(payload);

    let start = (TEXT_OFFSET - CHECKSUM_START) as u32;
    let len = payload.len() as u32;
    BigEndian::write_u32(&mut copy[START_OFFSET..], start);
    BigEndian::write_u32(&mut copy[END_OFFSET..], start + len);
    BigEndian::write_u32(&mut copy[LENGTH_OFFSET..], len);

    let cksum = nvram_cksum(&copy[CHECKSUM_START..]);
    BigEndian::write_u16(&mut copy[CHECKSUM_OFFSET..], cksum);
    Ok(())
}

/// Stores `text` in both configuration copies of `region`.
///
/// A NUL terminator is appended, so the stored length is `text.len() + 1`.
/// Nothing is written unless the text fits in a copy.
pub fn push_config(region: &mut [u8], geometry: &NvramGeometry, text: &[u8]) -> Result<()> {
    let needed = geometry.required_len();
    if region.len() < needed {
        return Err(NvramError::TruncatedRegion {
            needed,
            available: region.len(),
        });
    }

    let mut payload = Vec::with_capacity(text.len() + 1);
    payload.extend_from_slice(text);
    payload.push(0);

    let capacity = geometry.capacity();
    if payload.len() > capacity {
        return Err(NvramError::ConfigTooLarge {
            len: payload.len(),
            capacity,
        });
    }

    for base in [geometry.base, geometry.backup_base()] {
        encode_copy(&mut region[base..base + geometry.copy_size], &payload)?;
    }

    debug!(
        base = geometry.base,
        length = payload.len(),
        "Pushed configuration to NVRAM"
    );
    Ok(())
}

/// Returns true if the primary copy holds only zero words.
pub fn is_config_empty(region: &[u8], geometry: &NvramGeometry) -> bool {
    let start = geometry.base.min(region.len());
    let end = geometry.base.saturating_add(geometry.copy_size).min(region.len());
    region[start..end]
        .chunks(4)
        .all(|word| word.iter().all(|b| *b == 0))
}

/// Returns true if the stored checksum of `copy` matches its contents.
pub fn verify_copy(copy: &[u8]) -> bool {
    if copy.len() < HEADER_LEN {
        return false;
    }
    let stored = BigEndian::read_u16(&copy[CHECKSUM_OFFSET..]);
    let mut scratch = copy[CHECKSUM_START..].to_vec();
    let at = CHECKSUM_OFFSET - CHECKSUM_START;
    scratch[at..at + 2].fill(0);
    nvram_cksum(&scratch) == stored
}
