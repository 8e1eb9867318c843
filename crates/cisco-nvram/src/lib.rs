//! Persistent router state: the IOS configuration in NVRAM and the identity
//! EEPROM.
//!
//! - [`push_config`] / [`extract_config`]: store and read back the startup
//!   configuration (primary and backup copy, checksummed)
//! - [`nvram_cksum`]: the IOS NVRAM checksum
//! - [`CiscoEeprom`]: byte access to word-based EEPROMs and MAC burning
//! - [`RegionStore`]: where region bytes live between router runs
//!
//! # Example
//!
//! ```
//! use cisco_nvram::{extract_config, push_config, NvramGeometry};
//!
//! let geometry = NvramGeometry::new(0x100, 0x400);
//! let mut region = vec![0u8; geometry.required_len()];
//!
//! push_config(&mut region, &geometry, b"hostname R1\n").unwrap();
//! assert_eq!(extract_config(&region, &geometry).unwrap(), b"hostname R1\n");
//! ```

mod checksum;
mod codec;
mod eeprom;
mod error;
pub mod layout;
mod store;

pub use checksum::nvram_cksum;
pub use codec::{encode_copy, extract_config, is_config_empty, push_config, verify_copy, ConfigHeader};
pub use eeprom::{CiscoEeprom, V4_FIELD_MAC};
pub use error::{NvramError, Result};
pub use layout::NvramGeometry;
pub use store::{FileStore, MappedRegion, MemoryStore, RegionStore};
