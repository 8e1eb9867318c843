//! Cisco identity EEPROM access.
//!
//! EEPROM contents are kept as big-endian 16-bit words; byte `n` is the high
//! half of word `n / 2` when `n` is even and the low half otherwise. Byte 0
//! holds the layout version:
//!
//! * version 0: fixed layout, MAC address at byte 2
//! * version 4: tagged field directory starting at byte 2, terminated by a
//!   `0xFF` type byte

use crate::error::{NvramError, Result};
use cisco_types::MacAddress;
use tracing::debug;

/// Field type of the base MAC address in a version 4 EEPROM.
pub const V4_FIELD_MAC: u8 = 0xc3;

const V4_END_OF_FIELDS: u8 = 0xff;
const V0_MAC_OFFSET: usize = 2;

/// An identity EEPROM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiscoEeprom {
    name: String,
    data: Vec<u16>,
}

impl CiscoEeprom {
    pub fn new(name: impl Into<String>, data: Vec<u16>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Copies a static template (e.g. a chassis backplane image).
    pub fn from_template(name: &str, words: &[u16]) -> Self {
        Self::new(name, words.to_vec())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn words(&self) -> &[u16] {
        &self.data
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len() * 2
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn version(&self) -> Option<u8> {
        self.get_byte(0)
    }

    pub fn get_byte(&self, offset: usize) -> Option<u8> {
        let word = *self.data.get(offset >> 1)?;
        Some(if offset & 1 == 0 {
            (word >> 8) as u8
        } else {
            (word & 0xff) as u8
        })
    }

    pub fn set_byte(&mut self, offset: usize, value: u8) -> Result<()> {
        let len = self.len();
        let word = self
            .data
            .get_mut(offset >> 1)
            .ok_or(NvramError::EepromOutOfRange { offset, len })?;

        *word = if offset & 1 == 0 {
            (*word & 0x00ff) | (u16::from(value) << 8)
        } else {
            (*word & 0xff00) | u16::from(value)
        };
        Ok(())
    }

    pub fn get_region(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        (offset..offset + len)
            .map(|i| {
                self.get_byte(i).ok_or(NvramError::EepromOutOfRange {
                    offset: i,
                    len: self.len(),
                })
            })
            .collect()
    }

    /// Writes `bytes` at `offset`. Nothing is written if the range does not fit.
    pub fn set_region(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let end = offset + bytes.len();
        if end > self.len() {
            return Err(NvramError::EepromOutOfRange {
                offset: end,
                len: self.len(),
            });
        }
        for (i, b) in bytes.iter().enumerate() {
            self.set_byte(offset + i, *b)?;
        }
        Ok(())
    }

    /// Returns the byte offset of the data of a version 4 field.
    ///
    /// The two top bits of a type byte select the field length: 1, 2 or 4
    /// bytes, or a length given by the low nibble of the following byte.
    pub fn v4_find_field(&self, field_type: u8) -> Option<usize> {
        let mut offset = 2;

        loop {
            let ty = self.get_byte(offset)?;
            if ty == V4_END_OF_FIELDS {
                return None;
            }
            offset += 1;

            let len = match ty >> 6 {
                3 => {
                    let len = usize::from(self.get_byte(offset)? & 0x0f);
                    offset += 1;
                    len
                }
                bits => 1usize << bits,
            };

            if ty == field_type {
                return Some(offset);
            }
            offset += len;
        }
    }

    /// Writes `mac` as the base MAC address.
    ///
    /// # Errors
    ///
    /// * [`NvramError::UnsupportedEepromVersion`] for layouts other than 0 and 4
    /// * [`NvramError::EepromFieldNotFound`] if a version 4 EEPROM has no MAC field
    ///
    /// The EEPROM is left untouched on error.
    pub fn burn_mac(&mut self, mac: &MacAddress) -> Result<()> {
        let version = self
            .version()
            .ok_or(NvramError::EepromOutOfRange { offset: 0, len: 0 })?;

        let offset = match version {
            0 => V0_MAC_OFFSET,
            4 => self
                .v4_find_field(V4_FIELD_MAC)
                .ok_or(NvramError::EepromFieldNotFound {
                    field_type: V4_FIELD_MAC,
                })?,
            other => return Err(NvramError::UnsupportedEepromVersion(other)),
        };

        self.set_region(offset, mac.as_bytes())?;
        debug!(eeprom = %self.name, version, offset, mac = %mac, "Burnt MAC address");
        Ok(())
    }

    /// Reads back the base MAC address.
    pub fn mac(&self) -> Result<MacAddress> {
        let offset = match self.version() {
            Some(0) => V0_MAC_OFFSET,
            Some(4) => self
                .v4_find_field(V4_FIELD_MAC)
                .ok_or(NvramError::EepromFieldNotFound {
                    field_type: V4_FIELD_MAC,
                })?,
            Some(other) => return Err(NvramError::UnsupportedEepromVersion(other)),
            None => return Err(NvramError::EepromOutOfRange { offset: 0, len: 0 }),
        };

        let bytes = self.get_region(offset, 6)?;
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&bytes);
        Ok(MacAddress::new(mac))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Tagged layout: 0xC1 (var, 3 bytes), 0x41 (2 bytes), 0xC3 (var, 6 bytes), end.
    fn v4_eeprom() -> CiscoEeprom {
        CiscoEeprom::new(
            "test",
            vec![
                0x04ff, 0xc103, 0x4142, 0x4341, 0x0102, 0xc306, 0x0000, 0x0000,
                0x0000, 0xffff,
            ],
        )
    }

    #[test]
    fn test_byte_access() {
        let mut eeprom = CiscoEeprom::new("test", vec![0x1234, 0x5678]);
        assert_eq!(eeprom.get_byte(0), Some(0x12));
        assert_eq!(eeprom.get_byte(1), Some(0x34));
        assert_eq!(eeprom.get_byte(3), Some(0x78));
        assert_eq!(eeprom.get_byte(4), None);

        eeprom.set_byte(1, 0xab).unwrap();
        eeprom.set_byte(2, 0xcd).unwrap();
        assert_eq!(eeprom.words(), &[0x12ab, 0xcd78]);
        assert!(eeprom.set_byte(4, 0).is_err());
    }

    #[test]
    fn test_v4_find_field() {
        let eeprom = v4_eeprom();
        assert_eq!(eeprom.v4_find_field(0xc1), Some(4));
        assert_eq!(eeprom.v4_find_field(0x41), Some(8));
        assert_eq!(eeprom.v4_find_field(0xc3), Some(12));
        assert_eq!(eeprom.v4_find_field(0xc5), None);
    }

    #[test]
    fn test_burn_mac_v4() {
        let mut eeprom = v4_eeprom();
        let mac: MacAddress = "c2:01:0a:0b:00:00".parse().unwrap();
        eeprom.burn_mac(&mac).unwrap();
        assert_eq!(eeprom.mac().unwrap(), mac);
        assert_eq!(eeprom.get_region(12, 6).unwrap(), vec![0xc2, 0x01, 0x0a, 0x0b, 0, 0]);
        // Neighbouring fields are preserved.
        assert_eq!(eeprom.get_region(8, 2).unwrap(), vec![0x01, 0x02]);
        assert_eq!(eeprom.get_byte(18), Some(0xff));
    }

    #[test]
    fn test_burn_mac_v0() {
        let mut eeprom = CiscoEeprom::new("test", vec![0x0000; 8]);
        let mac: MacAddress = "00:11:22:33:44:55".parse().unwrap();
        eeprom.burn_mac(&mac).unwrap();
        assert_eq!(eeprom.words()[1..4].to_vec(), vec![0x0011, 0x2233, 0x4455]);
        assert_eq!(eeprom.mac().unwrap(), mac);
    }

    #[test]
    fn test_burn_mac_unsupported_version() {
        let mut eeprom = CiscoEeprom::new("test", vec![0x0100, 0, 0, 0, 0]);
        let before = eeprom.clone();
        let err = eeprom.burn_mac(&MacAddress::ZERO).unwrap_err();
        assert!(matches!(err, NvramError::UnsupportedEepromVersion(1)));
        assert_eq!(eeprom, before);
    }

    #[test]
    fn test_burn_mac_missing_field() {
        let mut eeprom = CiscoEeprom::new("test", vec![0x0401, 0xaaff]);
        assert!(matches!(
            eeprom.burn_mac(&MacAddress::ZERO),
            Err(NvramError::EepromFieldNotFound { field_type: 0xc3 })
        ));
    }

    #[test]
    fn test_set_region_out_of_range_is_atomic() {
        let mut eeprom = CiscoEeprom::new("test", vec![0; 2]);
        assert!(eeprom.set_region(2, &[1, 2, 3]).is_err());
        assert_eq!(eeprom.words(), &[0, 0]);
    }
}
