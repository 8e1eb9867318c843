//! Built-in network modules.
//!
//! | Device type  | Ports | Interfaces        | Placement          |
//! |--------------|-------|-------------------|--------------------|
//! | `GT96100-FE` | 2     | FastEthernet0/x   | onboard, bay 0     |
//! | `NM-1FE-TX`  | 1     | FastEthernetN/0   | network module bay |
//! | `NM-16ESW`   | 16    | FastEthernetN/x   | network module bay |
//! | `NM-4T`      | 4     | SerialN/x         | network module bay |
//!
//! Register-level device models are not part of this crate; a module's
//! runtime handle tracks which NIO each port is attached to and toggles the
//! NIO receive path when ports are enabled.

use crate::driver::{BayContext, BayDevice, BayDriver, DriverTable, PciMapping};
use crate::error::DriverError;
use cisco_nio::NioRef;
use cisco_nvram::CiscoEeprom;
use std::fmt;
use tracing::{debug, info};

/// Where a module may be installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Soldered on the mainboard, only valid in bay 0.
    Onboard,
    /// Network module behind the PCI bridge, bays 1 and up.
    NetworkModule,
}

/// Static description of a module type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleSpec {
    pub dev_type: &'static str,
    pub ports: u32,
    pub interface: &'static str,
    pub placement: Placement,
    pub supported: bool,
    /// Identification EEPROM contents; onboard modules have none.
    pub eeprom: Option<&'static [u16]>,
}

static NM_1FE_TX_EEPROM: [u16; 16] = [
    0x0143, 0x0100, 0x0075, 0xcd81, 0x500d, 0xa201, 0x0000, 0x0000,
    0x5800, 0x0000, 0x9803, 0x2000, 0x0000, 0x0000, 0xffff, 0xffff,
];

static NM_16ESW_EEPROM: [u16; 32] = [
    0x04ff, 0x4002, 0xa941, 0x0100, 0xc046, 0x0320, 0x003b, 0x3401,
    0x4245, 0x3080, 0x0000, 0x0000, 0x0203, 0xc18b, 0x3030, 0x3030,
    0x3030, 0x3030, 0x3030, 0x3003, 0x0081, 0x0000, 0x0000, 0x0400,
    0xcf06, 0x0013, 0x1a1d, 0x0bd1, 0x4300, 0x11ff, 0xffff, 0xffff,
];

static NM_4T_EEPROM: [u16; 16] = [
    0x0154, 0x0101, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000,
    0x5800, 0x0000, 0x9811, 0x0300, 0x0000, 0x0000, 0xffff, 0xffff,
];

pub const GT96100_FE: ModuleSpec = ModuleSpec {
    dev_type: "GT96100-FE",
    ports: 2,
    interface: "FastEthernet",
    placement: Placement::Onboard,
    supported: true,
    eeprom: None,
};

pub const NM_1FE_TX: ModuleSpec = ModuleSpec {
    dev_type: "NM-1FE-TX",
    ports: 1,
    interface: "FastEthernet",
    placement: Placement::NetworkModule,
    supported: true,
    eeprom: Some(&NM_1FE_TX_EEPROM),
};

pub const NM_16ESW: ModuleSpec = ModuleSpec {
    dev_type: "NM-16ESW",
    ports: 16,
    interface: "FastEthernet",
    placement: Placement::NetworkModule,
    supported: true,
    eeprom: Some(&NM_16ESW_EEPROM),
};

pub const NM_4T: ModuleSpec = ModuleSpec {
    dev_type: "NM-4T",
    ports: 4,
    interface: "Serial",
    placement: Placement::NetworkModule,
    supported: true,
    eeprom: Some(&NM_4T_EEPROM),
};

/// Driver for any module described by a [`ModuleSpec`].
#[derive(Debug, Clone, Copy)]
pub struct ModuleDriver {
    spec: ModuleSpec,
}

impl ModuleDriver {
    pub const fn new(spec: ModuleSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &ModuleSpec {
        &self.spec
    }
}

impl BayDriver for ModuleDriver {
    fn dev_type(&self) -> &str {
        self.spec.dev_type
    }

    fn supported(&self) -> bool {
        self.spec.supported
    }

    fn eeprom(&self) -> Option<CiscoEeprom> {
        self.spec
            .eeprom
            .map(|words| CiscoEeprom::from_template(self.spec.dev_type, words))
    }

    fn init(&self, ctx: &BayContext<'_>) -> Result<Box<dyn BayDevice>, DriverError> {
        let pci = match self.spec.placement {
            Placement::Onboard if ctx.slot != 0 => {
                return Err(DriverError::UnsupportedBay {
                    device_type: self.spec.dev_type.to_string(),
                    slot: ctx.slot,
                })
            }
            Placement::Onboard => ctx.pci,
            Placement::NetworkModule if ctx.slot == 0 => {
                return Err(DriverError::UnsupportedBay {
                    device_type: self.spec.dev_type.to_string(),
                    slot: ctx.slot,
                })
            }
            Placement::NetworkModule => Some(
                ctx.pci
                    .ok_or(DriverError::NoPciMapping { slot: ctx.slot })?,
            ),
        };

        info!(
            router = ctx.router_name,
            device = ctx.dev_name,
            pci = ?pci,
            ports = self.spec.ports,
            "Initialized network module"
        );

        Ok(Box::new(ModuleDevice {
            spec: self.spec,
            name: ctx.dev_name.to_string(),
            slot: ctx.slot,
            pci,
            ports: vec![PortState::default(); self.spec.ports as usize],
        }))
    }
}

#[derive(Debug, Clone, Default)]
struct PortState {
    nio: Option<NioRef>,
    enabled: bool,
}

/// Runtime handle of a [`ModuleDriver`] module.
#[derive(Debug)]
pub struct ModuleDevice {
    spec: ModuleSpec,
    name: String,
    slot: u32,
    pci: Option<PciMapping>,
    ports: Vec<PortState>,
}

impl ModuleDevice {
    fn port_mut(&mut self, port: u32) -> Result<&mut PortState, DriverError> {
        let count = self.spec.ports;
        self.ports
            .get_mut(port as usize)
            .ok_or(DriverError::InvalidPort { port, count })
    }

    fn interface_name(&self, port: u32) -> String {
        format!("{}{}/{}", self.spec.interface, self.slot, port)
    }
}

impl BayDevice for ModuleDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&mut self, port: u32, nio: &NioRef) -> Result<(), DriverError> {
        let state = self.port_mut(port)?;
        if state.nio.is_some() {
            return Err(DriverError::PortInUse { port });
        }
        state.nio = Some(NioRef::clone(nio));
        debug!(device = %self.name, port, nio = nio.name(), "Attached NIO");
        Ok(())
    }

    fn detach(&mut self, port: u32) -> Result<(), DriverError> {
        let state = self.port_mut(port)?;
        let nio = state
            .nio
            .take()
            .ok_or(DriverError::PortNotAttached { port })?;
        if state.enabled {
            nio.disable();
            state.enabled = false;
        }
        debug!(device = %self.name, port, nio = nio.name(), "Detached NIO");
        Ok(())
    }

    fn enable(&mut self, port: u32) -> Result<(), DriverError> {
        let state = self.port_mut(port)?;
        let nio = state
            .nio
            .as_ref()
            .ok_or(DriverError::PortNotAttached { port })?;
        nio.enable();
        state.enabled = true;
        Ok(())
    }

    fn disable(&mut self, port: u32) -> Result<(), DriverError> {
        let state = self.port_mut(port)?;
        if let Some(nio) = &state.nio {
            nio.disable();
        }
        state.enabled = false;
        Ok(())
    }

    fn shutdown(self: Box<Self>) -> Result<(), DriverError> {
        for state in self.ports.iter().filter(|s| s.enabled) {
            if let Some(nio) = &state.nio {
                nio.disable();
            }
        }
        info!(device = %self.name, "Shut down network module");
        Ok(())
    }

    fn describe(&self) -> Option<String> {
        Some(self.to_string())
    }
}

/// PCI location header, then one line per port with its NIO.
impl fmt::Display for ModuleDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pci {
            Some(pci) => writeln!(f, "{} (PCI {}):", self.name, pci)?,
            None => writeln!(f, "{}:", self.name)?,
        }
        for (port, state) in self.ports.iter().enumerate() {
            let iface = self.interface_name(port as u32);
            match &state.nio {
                Some(nio) => writeln!(
                    f,
                    "  {} -> {}{}",
                    iface,
                    nio.name(),
                    if state.enabled { " (enabled)" } else { "" }
                )?,
                None => writeln!(f, "  {} -> not connected", iface)?,
            }
        }
        Ok(())
    }
}

/// Driver table with every built-in module.
pub fn builtin_drivers() -> DriverTable {
    DriverTable::new()
        .with(ModuleDriver::new(GT96100_FE))
        .with(ModuleDriver::new(NM_1FE_TX))
        .with(ModuleDriver::new(NM_16ESW))
        .with(ModuleDriver::new(NM_4T))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cisco_nio::{NetIo, NioKind};
    use cisco_types::MacAddress;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn ctx(slot: u32, dev_name: &str, pci: Option<PciMapping>) -> BayContext<'_> {
        BayContext {
            router_name: "R1",
            instance_id: 0,
            slot,
            dev_name,
            pci,
            base_mac: MacAddress::ZERO,
        }
    }

    fn nio(name: &str) -> NioRef {
        Arc::new(NetIo::new(name, NioKind::Null))
    }

    const PCI: Option<PciMapping> = Some(PciMapping { bus: 1, device: 6 });

    #[test]
    fn test_builtin_table() {
        let table = builtin_drivers();
        assert_eq!(
            table.show_drivers(),
            vec!["GT96100-FE", "NM-1FE-TX", "NM-16ESW", "NM-4T"]
        );
    }

    #[test]
    fn test_module_eeproms() {
        let eeprom = ModuleDriver::new(NM_16ESW).eeprom().unwrap();
        assert_eq!(eeprom.name(), "NM-16ESW");
        assert_eq!(eeprom.len(), 64);
        assert_eq!(eeprom.version(), Some(4));

        assert_eq!(ModuleDriver::new(NM_4T).eeprom().unwrap().words()[0], 0x0154);
        assert!(ModuleDriver::new(GT96100_FE).eeprom().is_none());
    }

    #[test]
    fn test_network_module_requires_pci() {
        let driver = ModuleDriver::new(NM_1FE_TX);
        let err = driver.init(&ctx(1, "NM-1FE-TX(1)", None)).err().expect("expected init to fail");
        assert_eq!(err, DriverError::NoPciMapping { slot: 1 });
        assert!(driver.init(&ctx(1, "NM-1FE-TX(1)", PCI)).is_ok());
    }

    #[test]
    fn test_placement_rules() {
        let onboard = ModuleDriver::new(GT96100_FE);
        assert!(onboard.init(&ctx(0, "GT96100-FE(0)", None)).is_ok());
        assert!(matches!(
            onboard.init(&ctx(1, "GT96100-FE(1)", PCI)),
            Err(DriverError::UnsupportedBay { slot: 1, .. })
        ));

        let nm = ModuleDriver::new(NM_4T);
        assert!(matches!(
            nm.init(&ctx(0, "NM-4T(0)", PCI)),
            Err(DriverError::UnsupportedBay { slot: 0, .. })
        ));
    }

    #[test]
    fn test_port_lifecycle() {
        let driver = ModuleDriver::new(NM_16ESW);
        let mut dev = driver.init(&ctx(2, "NM-16ESW(2)", PCI)).unwrap();
        let tap = nio("tap0");

        dev.attach(15, &tap).unwrap();
        assert_eq!(dev.attach(15, &tap), Err(DriverError::PortInUse { port: 15 }));
        assert_eq!(
            dev.attach(16, &tap),
            Err(DriverError::InvalidPort { port: 16, count: 16 })
        );

        dev.enable(15).unwrap();
        assert!(tap.is_enabled());
        dev.detach(15).unwrap();
        assert!(!tap.is_enabled());
        assert_eq!(dev.detach(15), Err(DriverError::PortNotAttached { port: 15 }));
        assert_eq!(dev.enable(15), Err(DriverError::PortNotAttached { port: 15 }));

        dev.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_disables_nios() {
        let driver = ModuleDriver::new(NM_1FE_TX);
        let mut dev = driver.init(&ctx(1, "NM-1FE-TX(1)", PCI)).unwrap();
        let tap = nio("tap0");
        dev.attach(0, &tap).unwrap();
        dev.enable(0).unwrap();
        dev.shutdown().unwrap();
        assert!(!tap.is_enabled());
    }

    #[test]
    fn test_describe() {
        let driver = ModuleDriver::new(NM_4T);
        let mut dev = driver.init(&ctx(1, "NM-4T(1)", PCI)).unwrap();
        dev.attach(1, &nio("udp0")).unwrap();
        dev.enable(1).unwrap();
        assert_eq!(
            dev.describe().unwrap(),
            "NM-4T(1) (PCI 01:06):\n\
             \x20 Serial1/0 -> not connected\n\
             \x20 Serial1/1 -> udp0 (enabled)\n\
             \x20 Serial1/2 -> not connected\n\
             \x20 Serial1/3 -> not connected\n"
        );
    }
}
