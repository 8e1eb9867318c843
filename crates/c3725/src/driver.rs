//! Bay driver interface and the driver table.
//!
//! A [`BayDriver`] describes one kind of network module. Initializing it for a
//! bay yields a [`BayDevice`], the runtime handle that lives while the bay is
//! active and receives port attach/detach calls.

use crate::error::DriverError;
use cisco_nio::NioRef;
use cisco_nvram::CiscoEeprom;
use cisco_types::MacAddress;
use std::fmt;
use std::sync::Arc;

/// PCI location a bay's module is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciMapping {
    pub bus: u32,
    pub device: u32,
}

impl fmt::Display for PciMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}", self.bus, self.device)
    }
}

/// Everything a driver gets to see when a bay is activated.
#[derive(Debug, Clone)]
pub struct BayContext<'a> {
    pub router_name: &'a str,
    pub instance_id: u32,
    pub slot: u32,
    /// Synthesized `"<device_type>(<slot>)"` name.
    pub dev_name: &'a str,
    pub pci: Option<PciMapping>,
    pub base_mac: MacAddress,
}

/// A network module type.
pub trait BayDriver: Send + Sync {
    /// Device type name, the key in the driver table (e.g. `NM-1FE-TX`).
    fn dev_type(&self) -> &str;

    /// False for modules listed but not emulated yet.
    fn supported(&self) -> bool {
        true
    }

    /// Identification EEPROM installed in the bay while the module is active.
    fn eeprom(&self) -> Option<CiscoEeprom> {
        None
    }

    /// Brings the module up in a bay and returns its runtime handle.
    fn init(&self, ctx: &BayContext<'_>) -> Result<Box<dyn BayDevice>, DriverError>;
}

/// Runtime handle of an initialized module.
pub trait BayDevice: Send {
    fn name(&self) -> &str;

    fn attach(&mut self, port: u32, nio: &NioRef) -> Result<(), DriverError>;

    fn detach(&mut self, port: u32) -> Result<(), DriverError>;

    /// Starts traffic on an attached port.
    fn enable(&mut self, _port: u32) -> Result<(), DriverError> {
        Ok(())
    }

    fn disable(&mut self, _port: u32) -> Result<(), DriverError> {
        Ok(())
    }

    /// Tears the module down. Consumes the handle.
    fn shutdown(self: Box<Self>) -> Result<(), DriverError>;

    /// Human readable state, one line per entry.
    fn describe(&self) -> Option<String> {
        None
    }
}

/// Registry of known module drivers, looked up by device type.
#[derive(Clone, Default)]
pub struct DriverTable {
    drivers: Vec<Arc<dyn BayDriver>>,
}

impl DriverTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a driver. A driver with the same device type is replaced.
    pub fn register(&mut self, driver: Arc<dyn BayDriver>) {
        match self
            .drivers
            .iter_mut()
            .find(|d| d.dev_type() == driver.dev_type())
        {
            Some(existing) => *existing = driver,
            None => self.drivers.push(driver),
        }
    }

    pub fn with(mut self, driver: impl BayDriver + 'static) -> Self {
        self.register(Arc::new(driver));
        self
    }

    pub fn find(&self, dev_type: &str) -> Option<Arc<dyn BayDriver>> {
        self.drivers
            .iter()
            .find(|d| d.dev_type() == dev_type)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Driver listing, flagging the modules that are not emulated.
    pub fn show_drivers(&self) -> Vec<String> {
        self.drivers
            .iter()
            .map(|d| {
                if d.supported() {
                    d.dev_type().to_string()
                } else {
                    format!("{} (NOT WORKING)", d.dev_type())
                }
            })
            .collect()
    }
}

impl fmt::Debug for DriverTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.drivers.iter().map(|d| d.dev_type()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Stub {
        name: &'static str,
        supported: bool,
    }

    impl BayDriver for Stub {
        fn dev_type(&self) -> &str {
            self.name
        }

        fn supported(&self) -> bool {
            self.supported
        }

        fn init(&self, _ctx: &BayContext<'_>) -> Result<Box<dyn BayDevice>, DriverError> {
            Err(DriverError::Failed("stub".to_string()))
        }
    }

    #[test]
    fn test_find_and_list() {
        let table = DriverTable::new()
            .with(Stub {
                name: "NM-A",
                supported: true,
            })
            .with(Stub {
                name: "NM-B",
                supported: false,
            });

        assert_eq!(table.len(), 2);
        assert!(table.find("NM-A").is_some());
        assert!(table.find("NM-C").is_none());
        assert_eq!(
            table.show_drivers(),
            vec!["NM-A".to_string(), "NM-B (NOT WORKING)".to_string()]
        );
    }

    #[test]
    fn test_register_replaces_same_type() {
        let table = DriverTable::new()
            .with(Stub {
                name: "NM-A",
                supported: false,
            })
            .with(Stub {
                name: "NM-A",
                supported: true,
            });
        assert_eq!(table.len(), 1);
        assert_eq!(table.show_drivers(), vec!["NM-A".to_string()]);
    }

    #[test]
    fn test_pci_mapping_display() {
        assert_eq!(PciMapping { bus: 1, device: 0x0a }.to_string(), "01:0a");
    }
}
