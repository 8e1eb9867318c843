//! Bay manager: driver binding, activation and NIO bindings of every bay.
//!
//! Each bay follows `Empty -> Bound -> Active -> Bound -> Empty`:
//!
//! | Operation    | From   | To     |
//! |--------------|--------|--------|
//! | `bind`       | Empty  | Bound  |
//! | `activate`   | Bound  | Active |
//! | `deactivate` | Active | Bound  |
//! | `unbind`     | Bound  | Empty  |
//!
//! Port bindings can be added in any state. While a bay is active they are
//! forwarded to its runtime device as they come and go.

use crate::bay::{BaySlot, BayState};
use crate::driver::{BayContext, BayDevice, DriverTable, PciMapping};
use crate::error::{BayError, BayResult};
use cisco_nio::NioRegistry;
use cisco_nvram::CiscoEeprom;
use cisco_types::MacAddress;
use std::io;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Bays of one router instance.
pub struct BayManager {
    router_name: String,
    instance_id: u32,
    base_mac: MacAddress,
    slots: Vec<BaySlot>,
    drivers: Arc<DriverTable>,
    registry: Arc<dyn NioRegistry>,
}

impl BayManager {
    /// Creates `slot_count` empty bays.
    pub fn new(
        router_name: impl Into<String>,
        instance_id: u32,
        slot_count: u32,
        drivers: Arc<DriverTable>,
        registry: Arc<dyn NioRegistry>,
    ) -> Self {
        Self {
            router_name: router_name.into(),
            instance_id,
            base_mac: MacAddress::ZERO,
            slots: (0..slot_count).map(|_| BaySlot::default()).collect(),
            drivers,
            registry,
        }
    }

    pub fn slot_count(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn drivers(&self) -> &DriverTable {
        &self.drivers
    }

    /// MAC address handed to modules at activation.
    pub fn set_base_mac(&mut self, mac: MacAddress) {
        self.base_mac = mac;
    }

    pub fn get(&self, slot: u32) -> Option<&BaySlot> {
        self.slots.get(slot as usize)
    }

    /// Panics on an out of range slot; callers validate with `check_slot`.
    fn slot_mut(&mut self, slot: u32) -> &mut BaySlot {
        &mut self.slots[slot as usize]
    }

    fn check_slot(&self, slot: u32) -> BayResult<()> {
        if (slot as usize) < self.slots.len() {
            Ok(())
        } else {
            Err(BayError::invalid_slot(slot))
        }
    }

    pub fn state(&self, slot: u32) -> BayResult<BayState> {
        self.check_slot(slot)?;
        Ok(self.slots[slot as usize].state())
    }

    pub fn device_type(&self, slot: u32) -> BayResult<Option<&str>> {
        self.check_slot(slot)?;
        Ok(self.slots[slot as usize].device_type())
    }

    /// Wires a bay to its PCI location.
    pub fn set_pci_mapping(&mut self, slot: u32, pci: PciMapping) -> BayResult<()> {
        self.check_slot(slot)?;
        self.slot_mut(slot).pci = Some(pci);
        Ok(())
    }

    fn check_module_bay(&self, slot: u32) -> BayResult<()> {
        if slot == 0 {
            return Err(BayError::invalid_slot(slot));
        }
        self.check_slot(slot)
    }

    /// Installs the identification EEPROM of a network module bay.
    ///
    /// Bay 0 has none; its module is described by the mainboard EEPROM.
    pub fn set_eeprom(&mut self, slot: u32, eeprom: CiscoEeprom) -> BayResult<()> {
        self.check_module_bay(slot)?;
        debug!(slot, eeprom = eeprom.name(), "Set module EEPROM");
        self.slot_mut(slot).eeprom = Some(eeprom);
        Ok(())
    }

    /// Removes the EEPROM of a network module bay, leaving it reading as empty.
    pub fn unset_eeprom(&mut self, slot: u32) -> BayResult<()> {
        self.check_module_bay(slot)?;
        self.slot_mut(slot).eeprom = None;
        Ok(())
    }

    /// Whether a network module bay holds a usable EEPROM.
    pub fn has_eeprom(&self, slot: u32) -> BayResult<bool> {
        self.check_module_bay(slot)?;
        Ok(self.slots[slot as usize]
            .eeprom
            .as_ref()
            .is_some_and(|e| !e.is_empty()))
    }

    /// Binds a network module type to a user bay.
    ///
    /// Bay 0 holds the onboard module and is managed by the router itself.
    ///
    /// # Errors
    ///
    /// * `InvalidSlot` - bay 0 or out of range
    /// * `SlotOccupied` - a module is already bound
    /// * `UnknownDriver` - no driver for `device_type`
    #[instrument(skip(self), fields(router = %self.router_name))]
    pub fn bind(&mut self, slot: u32, device_type: &str) -> BayResult<()> {
        if slot == 0 {
            return Err(BayError::invalid_slot(slot));
        }
        self.bind_any(slot, device_type)
    }

    /// Binds the onboard module to bay 0.
    pub(crate) fn bind_onboard(&mut self, device_type: &str) -> BayResult<()> {
        self.bind_any(0, device_type)
    }

    fn bind_any(&mut self, slot: u32, device_type: &str) -> BayResult<()> {
        self.check_slot(slot)?;

        if let Some(current) = self.slots[slot as usize].device_type() {
            return Err(BayError::SlotOccupied {
                slot,
                device_type: current.to_string(),
            });
        }

        let driver = self
            .drivers
            .find(device_type)
            .ok_or_else(|| BayError::unknown_driver(device_type))?;

        if !driver.supported() {
            warn!(slot, device_type, "Binding a module that is not fully emulated");
        }

        let bay = self.slot_mut(slot);
        bay.device_type = Some(device_type.to_string());
        bay.driver = Some(driver);
        info!(slot, device_type, "Bound network module");
        Ok(())
    }

    /// Removes the module from a bay, releasing all its port bindings.
    #[instrument(skip(self), fields(router = %self.router_name))]
    pub fn unbind(&mut self, slot: u32) -> BayResult<()> {
        if slot == 0 {
            return Err(BayError::invalid_slot(slot));
        }
        self.check_slot(slot)?;

        match self.slots[slot as usize].state() {
            BayState::Active => return Err(BayError::SlotActive { slot }),
            BayState::Empty => return Err(BayError::SlotEmpty { slot }),
            BayState::Bound => {}
        }

        self.detach_all_backends(slot)?;

        let bay = self.slot_mut(slot);
        bay.device_type = None;
        bay.driver = None;
        info!(slot, "Unbound network module");
        Ok(())
    }

    /// Initializes the bound module and attaches every registered binding.
    ///
    /// A network module bay also gets the module's EEPROM. A failing
    /// initialization leaves the bay bound. Attach failures are logged; the
    /// bay still becomes active.
    #[instrument(skip(self), fields(router = %self.router_name))]
    pub fn activate(&mut self, slot: u32) -> BayResult<()> {
        self.check_slot(slot)?;

        let bay = &self.slots[slot as usize];
        let (driver, device_type) = match (bay.state(), &bay.driver, &bay.device_type) {
            (BayState::Active, _, _) => return Err(BayError::SlotActive { slot }),
            (BayState::Bound, Some(driver), Some(device_type)) => {
                (Arc::clone(driver), device_type.clone())
            }
            _ => return Err(BayError::SlotEmpty { slot }),
        };

        let dev_name = format!("{}({})", device_type, slot);
        let ctx = BayContext {
            router_name: &self.router_name,
            instance_id: self.instance_id,
            slot,
            dev_name: &dev_name,
            pci: bay.pci,
            base_mac: self.base_mac,
        };

        let mut device = driver.init(&ctx).map_err(|source| {
            error!(slot, device = %dev_name, %source, "Unable to initialize network module");
            BayError::DriverInitFailed {
                slot,
                device_type: device_type.clone(),
                source,
            }
        })?;

        for binding in bay.bindings.iter() {
            if let Err(e) = device.attach(binding.port, &binding.nio) {
                warn!(
                    slot,
                    port = binding.port,
                    nio = binding.nio.name(),
                    error = %e,
                    "Unable to attach NIO"
                );
            }
        }

        let eeprom = if slot != 0 { driver.eeprom() } else { None };
        let bay = self.slot_mut(slot);
        bay.device = Some(device);
        bay.eeprom = eeprom;
        info!(slot, device = %dev_name, "Activated network module");
        Ok(())
    }

    /// Detaches every binding and shuts the runtime device down.
    ///
    /// The bay is back to bound even when the shutdown itself fails.
    #[instrument(skip(self), fields(router = %self.router_name))]
    pub fn deactivate(&mut self, slot: u32) -> BayResult<()> {
        self.check_slot(slot)?;

        let bay = self.slot_mut(slot);
        let Some(mut device) = bay.device.take() else {
            return Err(BayError::SlotNotActive { slot });
        };
        bay.eeprom = None;

        for port in bay.bindings.ports() {
            if let Err(e) = device.detach(port) {
                warn!(slot, port, error = %e, "Unable to detach NIO");
            }
        }

        let name = device.name().to_string();
        match device.shutdown() {
            Ok(()) => {
                info!(slot, device = %name, "Deactivated network module");
                Ok(())
            }
            Err(source) => {
                error!(slot, device = %name, %source, "Unable to shut down network module");
                Err(BayError::DriverShutdownFailed { slot, source })
            }
        }
    }

    /// Binds a port to a registered NIO.
    ///
    /// If the bay is active the device attach happens right away; a failing
    /// attach is logged and the binding is kept.
    #[instrument(skip(self), fields(router = %self.router_name))]
    pub fn attach_backend(&mut self, slot: u32, port: u32, nio_name: &str) -> BayResult<()> {
        self.check_slot(slot)?;

        if self.slots[slot as usize].bindings.contains(port) {
            return Err(BayError::DuplicatePort { slot, port });
        }

        let nio = self
            .registry
            .acquire(nio_name)
            .ok_or_else(|| BayError::backend_not_found(nio_name))?;

        let bay = self.slot_mut(slot);
        if let Some(device) = bay.device.as_mut() {
            if let Err(e) = device.attach(port, &nio) {
                warn!(slot, port, nio = nio_name, error = %e, "Unable to attach NIO");
            }
        }
        bay.bindings.insert(port, nio);
        debug!(slot, port, nio = nio_name, "Added NIO binding");
        Ok(())
    }

    /// Unbinds a port and releases its NIO reference.
    #[instrument(skip(self), fields(router = %self.router_name))]
    pub fn detach_backend(&mut self, slot: u32, port: u32) -> BayResult<()> {
        self.check_slot(slot)?;

        let bay = self.slot_mut(slot);
        if !bay.bindings.contains(port) {
            return Err(BayError::PortNotBound { slot, port });
        }

        if let Some(device) = bay.device.as_mut() {
            if let Err(e) = device.detach(port) {
                warn!(slot, port, error = %e, "Unable to detach NIO");
            }
        }

        if let Some(binding) = bay.bindings.remove(port) {
            self.registry.release(binding.nio.name());
            debug!(slot, port, nio = binding.nio.name(), "Removed NIO binding");
        }
        Ok(())
    }

    /// Unbinds every port of a bay.
    pub fn detach_all_backends(&mut self, slot: u32) -> BayResult<()> {
        self.check_slot(slot)?;
        for port in self.slots[slot as usize].bindings.ports() {
            self.detach_backend(slot, port)?;
        }
        Ok(())
    }

    fn active_device(&mut self, slot: u32) -> BayResult<&mut Box<dyn BayDevice>> {
        self.check_slot(slot)?;
        self.slot_mut(slot)
            .device
            .as_mut()
            .ok_or(BayError::SlotNotActive { slot })
    }

    /// Starts traffic on a bound port of an active bay.
    pub fn enable_nio(&mut self, slot: u32, port: u32) -> BayResult<()> {
        self.check_slot(slot)?;
        if !self.slots[slot as usize].bindings.contains(port) {
            return Err(BayError::PortNotBound { slot, port });
        }
        self.active_device(slot)?
            .enable(port)
            .map_err(|source| BayError::Driver { slot, port, source })
    }

    pub fn disable_nio(&mut self, slot: u32, port: u32) -> BayResult<()> {
        self.active_device(slot)?
            .disable(port)
            .map_err(|source| BayError::Driver { slot, port, source })
    }

    /// Activates every bound bay that is not active yet.
    ///
    /// Stops at the first failure.
    pub fn activate_all(&mut self) -> BayResult<()> {
        for slot in 0..self.slot_count() {
            if self.slots[slot as usize].state() == BayState::Bound {
                self.activate(slot)?;
            }
        }
        Ok(())
    }

    /// Deactivates every active bay.
    ///
    /// Keeps going past failures and reports the first one.
    pub fn deactivate_all(&mut self) -> BayResult<()> {
        let mut first_error = None;
        for slot in 0..self.slot_count() {
            if self.slots[slot as usize].state() != BayState::Active {
                continue;
            }
            if let Err(e) = self.deactivate(slot) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Releases every port binding and shuts every module down.
    ///
    /// Modules stay bound. Runs again when the manager is dropped, where it
    /// finds nothing left to release.
    pub fn teardown(&mut self) {
        for slot in 0..self.slot_count() {
            if let Err(e) = self.detach_all_backends(slot) {
                warn!(slot, error = %e, "Unable to remove NIO bindings");
            }
        }
        if let Err(e) = self.deactivate_all() {
            warn!(error = %e, "Unable to shut down all network modules");
        }
    }

    /// `"<slot>: <device_type>"` for every bound bay.
    pub fn bay_bindings(&self) -> Vec<String> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, bay)| bay.device_type().map(|t| format!("{}: {}", i, t)))
            .collect()
    }

    /// `"<port>: <nio>"` for every binding of a bay.
    pub fn nio_bindings(&self, slot: u32) -> BayResult<Vec<String>> {
        self.check_slot(slot)?;
        Ok(self.slots[slot as usize]
            .bindings
            .iter()
            .map(|b| format!("{}: {}", b.port, b.nio.name()))
            .collect())
    }

    /// Description of every active module.
    pub fn show_all_info(&self) -> String {
        let mut out = String::new();
        for bay in &self.slots {
            if let Some(info) = bay.device.as_ref().and_then(|d| d.describe()) {
                out.push_str(&info);
            }
        }
        out
    }

    /// Writes the bay configuration as replayable commands.
    ///
    /// One `bind <slot> <device_type>` line per user bay, then one
    /// `attach <slot> <port> <nio>` line per binding. Bay 0 is bound by the
    /// router itself so only its attachments are written.
    pub fn save_config<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        for (slot, bay) in self.slots.iter().enumerate() {
            match bay.device_type() {
                Some(device_type) if slot != 0 => writeln!(out, "bind {} {}", slot, device_type)?,
                _ => {}
            }
            for binding in bay.bindings.iter() {
                writeln!(out, "attach {} {} {}", slot, binding.port, binding.nio.name())?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for BayManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BayManager")
            .field("router_name", &self.router_name)
            .field("instance_id", &self.instance_id)
            .field("slots", &self.slots)
            .finish()
    }
}

impl Drop for BayManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
