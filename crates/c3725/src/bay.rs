//! Bay slots and their port bindings.

use crate::driver::{BayDevice, BayDriver, PciMapping};
use cisco_nio::NioRef;
use cisco_nvram::CiscoEeprom;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A port bound to a NIO.
#[derive(Debug, Clone)]
pub struct NioBinding {
    pub port: u32,
    pub nio: NioRef,
}

/// Per-bay port bindings, at most one per port, iterated in port order.
#[derive(Debug, Clone, Default)]
pub struct NioBindingList {
    bindings: BTreeMap<u32, NioBinding>,
}

impl NioBindingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, port: u32) -> Option<&NioBinding> {
        self.bindings.get(&port)
    }

    pub fn contains(&self, port: u32) -> bool {
        self.bindings.contains_key(&port)
    }

    /// Adds a binding unless the port is already bound.
    ///
    /// Returns false and leaves the list unchanged if it is.
    pub fn insert(&mut self, port: u32, nio: NioRef) -> bool {
        if self.bindings.contains_key(&port) {
            return false;
        }
        self.bindings.insert(port, NioBinding { port, nio });
        true
    }

    pub fn remove(&mut self, port: u32) -> Option<NioBinding> {
        self.bindings.remove(&port)
    }

    pub fn ports(&self) -> Vec<u32> {
        self.bindings.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NioBinding> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Lifecycle state of a bay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BayState {
    Empty,
    Bound,
    Active,
}

impl fmt::Display for BayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BayState::Empty => "empty",
            BayState::Bound => "bound",
            BayState::Active => "active",
        };
        f.write_str(s)
    }
}

/// One chassis bay.
///
/// `device_type` and `driver` are set together; `device` is only set while
/// the bay is active. `eeprom` holds the identification EEPROM a network
/// module exposes to the chassis while it is installed.
#[derive(Default)]
pub struct BaySlot {
    pub(crate) device_type: Option<String>,
    pub(crate) driver: Option<Arc<dyn BayDriver>>,
    pub(crate) device: Option<Box<dyn BayDevice>>,
    pub(crate) pci: Option<PciMapping>,
    pub(crate) eeprom: Option<CiscoEeprom>,
    pub(crate) bindings: NioBindingList,
}

impl BaySlot {
    pub fn state(&self) -> BayState {
        match (&self.driver, &self.device) {
            (None, _) => BayState::Empty,
            (Some(_), None) => BayState::Bound,
            (Some(_), Some(_)) => BayState::Active,
        }
    }

    pub fn device_type(&self) -> Option<&str> {
        self.device_type.as_deref()
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device.as_ref().map(|d| d.name())
    }

    pub fn pci(&self) -> Option<PciMapping> {
        self.pci
    }

    pub fn eeprom(&self) -> Option<&CiscoEeprom> {
        self.eeprom.as_ref()
    }

    pub fn bindings(&self) -> &NioBindingList {
        &self.bindings
    }
}

impl fmt::Debug for BaySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaySlot")
            .field("device_type", &self.device_type)
            .field("state", &self.state())
            .field("pci", &self.pci)
            .field("eeprom", &self.eeprom.as_ref().map(|e| e.name()))
            .field("bindings", &self.bindings.ports())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cisco_nio::{NetIo, NioKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_binding_list_rejects_duplicates() {
        let mut list = NioBindingList::new();
        let a = Arc::new(NetIo::new("a", NioKind::Null));
        let b = Arc::new(NetIo::new("b", NioKind::Null));

        assert!(list.insert(3, a));
        assert!(!list.insert(3, b));
        assert_eq!(list.find(3).map(|b| b.nio.name()), Some("a"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_binding_list_port_order() {
        let mut list = NioBindingList::new();
        for port in [7, 0, 3] {
            list.insert(port, Arc::new(NetIo::new(format!("n{}", port), NioKind::Null)));
        }
        assert_eq!(list.ports(), vec![0, 3, 7]);
        assert_eq!(list.remove(3).map(|b| b.port), Some(3));
        assert!(list.remove(3).is_none());
        assert_eq!(list.ports(), vec![0, 7]);
    }

    #[test]
    fn test_empty_slot_state() {
        let slot = BaySlot::default();
        assert_eq!(slot.state(), BayState::Empty);
        assert_eq!(slot.device_type(), None);
        assert!(slot.eeprom().is_none());
        assert_eq!(slot.state().to_string(), "empty");
    }
}
