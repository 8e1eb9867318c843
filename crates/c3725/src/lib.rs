//! Cisco 3725 chassis emulation.
//!
//! This crate models the parts of a 3725 router that sit between the CPU
//! core and the outside world: the network module bays, the binding of
//! module ports to NIO backends, and the startup configuration stored in
//! NVRAM.
//!
//! # Responsibilities
//!
//! - Bind, activate, deactivate and unbind network modules per bay
//! - Keep per-port NIO bindings and forward them to active modules
//! - Burn the chassis MAC address into the mainboard EEPROM
//! - Push and extract the IOS startup configuration
//! - Save and replay the bay configuration
//!
//! # Bays
//!
//! | Bay | Content | PCI |
//! |-----|---------|-----|
//! | 0 | GT96100-FE onboard Ethernet | - |
//! | 1 | Network module | 01:06 |
//! | 2 | Network module | 01:0a |
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use c3725::{builtin_drivers, BayState, Router};
//! use cisco_nio::NetIoRegistry;
//! use cisco_nvram::MemoryStore;
//!
//! let registry = Arc::new(NetIoRegistry::new());
//! let mut router = Router::new("R1", 1, Arc::new(builtin_drivers()), registry);
//! router.add_bay_binding("1:NM-1FE-TX").unwrap();
//! router.add_nio_binding("1:0:null").unwrap();
//!
//! let store = MemoryStore::new();
//! router.start(&store).unwrap();
//! assert_eq!(router.bays().state(1), Ok(BayState::Active));
//! router.stop().unwrap();
//! ```

mod bay;
mod config;
mod driver;
mod drivers;
mod error;
mod manager;
mod model;
mod router;
mod script;

pub use bay::{BaySlot, BayState, NioBinding, NioBindingList};
pub use config::{AttachSection, NioSection, RouterConfig, RouterSection};
pub use driver::{BayContext, BayDevice, BayDriver, DriverTable, PciMapping};
pub use drivers::{
    builtin_drivers, ModuleDevice, ModuleDriver, ModuleSpec, Placement, GT96100_FE, NM_16ESW,
    NM_1FE_TX, NM_4T,
};
pub use error::{BayError, BayResult, DriverError, RouterError, RouterResult};
pub use manager::BayManager;
pub use model::{ChassisModel, C3725, CONF_REG_IGNORE_NVRAM, ROM_REGION};
pub use router::{default_mac, Router, RouterStatus};
pub use script::apply_config_script;
