//! Router instance: chassis identity, NVRAM access and the bay manager.

use crate::config::RouterConfig;
use crate::driver::DriverTable;
use crate::error::{RouterError, RouterResult};
use crate::manager::BayManager;
use crate::model::{ChassisModel, C3725, CONF_REG_IGNORE_NVRAM, ROM_REGION};
use cisco_nio::{NetIoRegistry, NioKind, NioRegistry};
use cisco_nvram::{
    extract_config, is_config_empty, push_config, CiscoEeprom, NvramError, RegionStore,
};
use cisco_types::{BayDescription, MacAddress};
use std::fmt;
use std::fs;
use std::io;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Run state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterStatus {
    Halted,
    Running,
}

/// One emulated C3725.
pub struct Router {
    name: String,
    instance_id: u32,
    model: &'static ChassisModel,
    status: RouterStatus,
    eeprom: CiscoEeprom,
    mac: MacAddress,
    ram_mb: u32,
    rom_mb: u32,
    nvram_kb: u32,
    clock_div: u32,
    iomem_percent: u32,
    disk0_mb: u32,
    disk1_mb: u32,
    /// Value loaded into `conf_reg` at platform init.
    conf_reg_setup: u16,
    conf_reg: u16,
    startup_config: Option<Vec<u8>>,
    registry: Arc<NetIoRegistry>,
    /// NIOs created on behalf of this instance, deleted with it.
    owned_nios: Vec<String>,
    bays: BayManager,
}

/// Chassis MAC derived from the instance id and the emulator's process id.
pub fn default_mac(model: &ChassisModel, instance_id: u32) -> MacAddress {
    let pid = std::process::id() as u16;
    MacAddress::new([
        model.mac_msb,
        (instance_id & 0xff) as u8,
        (pid >> 8) as u8,
        (pid & 0xff) as u8,
        0x00,
        0x00,
    ])
}

impl Router {
    /// Creates an instance with the chassis defaults and a generated MAC.
    pub fn new(
        name: impl Into<String>,
        instance_id: u32,
        drivers: Arc<DriverTable>,
        registry: Arc<NetIoRegistry>,
    ) -> Self {
        let name = name.into();
        let model = &C3725;
        let mac = default_mac(model, instance_id);

        let mut eeprom = CiscoEeprom::from_template(model.eeprom_name, model.eeprom_template);
        if let Err(e) = eeprom.burn_mac(&mac) {
            warn!(router = %name, error = %e, "Unable to burn chassis MAC address");
        }

        let mut bays = BayManager::new(
            name.clone(),
            instance_id,
            model.bays,
            drivers,
            Arc::clone(&registry) as Arc<dyn NioRegistry>,
        );
        bays.set_base_mac(mac);

        Self {
            name,
            instance_id,
            model,
            status: RouterStatus::Halted,
            eeprom,
            mac,
            ram_mb: model.default_ram_mb,
            rom_mb: model.default_rom_mb,
            nvram_kb: model.default_nvram_kb,
            clock_div: model.default_clock_div,
            iomem_percent: model.default_iomem_percent,
            disk0_mb: model.default_disk0_mb,
            disk1_mb: model.default_disk1_mb,
            conf_reg_setup: model.default_conf_reg,
            conf_reg: model.default_conf_reg,
            startup_config: None,
            registry,
            owned_nios: Vec::new(),
            bays,
        }
    }

    /// Builds an instance from a configuration file.
    ///
    /// NIOs are created first, then modules are bound, then ports attached.
    /// On failure the partly built instance is dropped and the NIOs declared
    /// by the file are deleted again, so the registry is left as it was.
    pub fn from_config(
        config: &RouterConfig,
        drivers: Arc<DriverTable>,
        registry: Arc<NetIoRegistry>,
    ) -> RouterResult<Self> {
        config.validate()?;
        let section = &config.router;

        let mut router = Self::new(
            section.name.clone(),
            section.instance_id,
            drivers,
            Arc::clone(&registry),
        );
        let mut declared = Vec::new();

        if let Err(e) = router.apply_config(config, &mut declared) {
            drop(router);
            for name in &declared {
                if let Err(del) = registry.delete(name) {
                    warn!(nio = %name, error = %del, "Unable to delete NIO");
                }
            }
            return Err(e);
        }
        Ok(router)
    }

    fn apply_config(
        &mut self,
        config: &RouterConfig,
        declared: &mut Vec<String>,
    ) -> RouterResult<()> {
        let section = &config.router;
        self.ram_mb = section.ram_mb;
        self.rom_mb = section.rom_mb;
        self.nvram_kb = section.nvram_kb;
        self.clock_div = section.clock_div;
        self.iomem_percent = section.iomem_percent;
        self.disk0_mb = section.disk0_mb;
        self.disk1_mb = section.disk1_mb;
        self.set_conf_reg(section.conf_reg);

        if let Some(mac) = section.mac_addr {
            self.burn_mac_addr(mac)?;
        }

        if let Some(path) = &section.startup_config {
            let text = fs::read(path).map_err(|e| RouterError::io(path, e))?;
            self.set_startup_config(text);
        }

        for nio in &config.nios {
            self.registry.create(&nio.name, nio.kind.clone())?;
            declared.push(nio.name.clone());
        }

        for bay in &config.bays {
            self.bays.bind(bay.slot, &bay.device_type)?;
        }

        for desc in &config.nio_bindings {
            self.add_nio_binding(desc)?;
        }

        for attach in &config.attachments {
            self.bays
                .attach_backend(attach.slot, attach.port, &attach.nio)?;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }

    pub fn model(&self) -> &'static ChassisModel {
        self.model
    }

    pub fn status(&self) -> RouterStatus {
        self.status
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn eeprom(&self) -> &CiscoEeprom {
        &self.eeprom
    }

    pub fn conf_reg(&self) -> u16 {
        self.conf_reg
    }

    pub fn conf_reg_setup(&self) -> u16 {
        self.conf_reg_setup
    }

    /// Sets the configuration register applied at the next platform init.
    pub fn set_conf_reg(&mut self, value: u16) {
        self.conf_reg_setup = value;
    }

    pub fn set_startup_config(&mut self, text: Vec<u8>) {
        self.startup_config = Some(text);
    }

    pub fn bays(&self) -> &BayManager {
        &self.bays
    }

    pub fn bays_mut(&mut self) -> &mut BayManager {
        &mut self.bays
    }

    pub fn registry(&self) -> &Arc<NetIoRegistry> {
        &self.registry
    }

    /// Prefix of this instance's storage files (`c3725_i<id>`).
    pub fn file_prefix(&self) -> String {
        format!("{}_i{}", self.model.platform, self.instance_id)
    }

    /// Parses a MAC address and burns it into the mainboard EEPROM.
    pub fn set_mac_addr(&mut self, mac: &str) -> RouterResult<()> {
        let mac: MacAddress = mac.parse()?;
        self.burn_mac_addr(mac)
    }

    fn burn_mac_addr(&mut self, mac: MacAddress) -> RouterResult<()> {
        self.eeprom.burn_mac(&mac)?;
        self.mac = mac;
        self.bays.set_base_mac(mac);
        info!(router = %self.name, mac = %mac, "Set chassis MAC address");
        Ok(())
    }

    /// Binds a module from a `"<slot>:<device_type>"` description.
    pub fn add_bay_binding(&mut self, desc: &str) -> RouterResult<()> {
        let desc: BayDescription = desc.parse()?;
        self.bays.bind(desc.slot, &desc.device_type)?;
        Ok(())
    }

    /// Creates a NIO and binds it from a `"<slot>:<port>:<kind>[:<args>]"`
    /// description, e.g. `"1:0:tap:tap0"`.
    ///
    /// The NIO is named `<platform>-i<id>/<slot>/<port>` and removed again if
    /// the binding cannot be made.
    #[instrument(skip(self), fields(router = %self.name))]
    pub fn add_nio_binding(&mut self, desc: &str) -> RouterResult<()> {
        let invalid = |reason: &str| RouterError::InvalidNioBinding {
            desc: desc.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = desc.splitn(3, ':');
        let slot = parts
            .next()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .ok_or_else(|| invalid("bad slot number"))?;
        let port = parts
            .next()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .ok_or_else(|| invalid("bad port number"))?;
        let kind: NioKind = parts
            .next()
            .ok_or_else(|| invalid("missing NIO type"))?
            .parse()?;

        let nio_name = format!(
            "{}-i{}/{}/{}",
            self.model.platform, self.instance_id, slot, port
        );
        self.registry.create(&nio_name, kind)?;

        if let Err(e) = self.bays.attach_backend(slot, port, &nio_name) {
            if let Err(del) = self.registry.delete(&nio_name) {
                warn!(nio = %nio_name, error = %del, "Unable to remove NIO");
            }
            return Err(e.into());
        }

        self.owned_nios.push(nio_name);
        Ok(())
    }

    fn rom_len(&self) -> usize {
        self.model.rom_region_len(self.rom_mb)
    }

    /// Stores `text` as the startup configuration in NVRAM.
    pub fn nvram_push_config(&self, store: &dyn RegionStore, text: &[u8]) -> RouterResult<()> {
        let mut region = store.create_region(ROM_REGION, self.rom_len())?;
        push_config(region.as_mut_slice(), &self.model.nvram, text)?;
        store.close_region(region)?;
        info!(router = %self.name, bytes = text.len(), "Pushed startup configuration to NVRAM");
        Ok(())
    }

    /// Reads the startup configuration back from NVRAM.
    ///
    /// The region is only read, so it is dropped rather than written back.
    pub fn nvram_extract_config(&self, store: &dyn RegionStore) -> RouterResult<Vec<u8>> {
        let region = store.open_region(ROM_REGION)?;
        Ok(extract_config(region.as_slice(), &self.model.nvram)?)
    }

    /// Sets the ignore-NVRAM bit of the configuration register when NVRAM
    /// holds nothing, so the router boots into setup mode.
    ///
    /// Returns true if NVRAM is empty.
    pub fn check_empty_config(&mut self, store: &dyn RegionStore) -> RouterResult<bool> {
        let empty = match store.open_region(ROM_REGION) {
            Ok(region) => is_config_empty(region.as_slice(), &self.model.nvram),
            Err(NvramError::RegionNotFound { .. }) => true,
            Err(e) => return Err(e.into()),
        };

        if empty {
            self.conf_reg |= CONF_REG_IGNORE_NVRAM;
            info!(router = %self.name, conf_reg = self.conf_reg, "NVRAM is empty");
        }
        Ok(empty)
    }

    /// Wires the chassis: configuration register, PCI mappings, onboard
    /// module, NVRAM contents, then initializes every bound bay.
    ///
    /// A startup configuration replaces whatever NVRAM held and clears the
    /// ignore-NVRAM bit again.
    #[instrument(skip(self, store), fields(router = %self.name))]
    pub fn init_platform(&mut self, store: &dyn RegionStore) -> RouterResult<()> {
        self.conf_reg = self.conf_reg_setup;

        for slot in 1..self.model.bays {
            if let Some(pci) = self.model.pci_for(slot) {
                self.bays.set_pci_mapping(slot, pci)?;
            }
        }

        if self.bays.device_type(0)?.is_none() {
            self.bays.bind_onboard(self.model.onboard_module)?;
        }

        self.check_empty_config(store)?;

        if let Some(text) = &self.startup_config {
            self.nvram_push_config(store, text)?;
            self.conf_reg &= !CONF_REG_IGNORE_NVRAM;
        }

        self.bays.activate_all()?;
        Ok(())
    }

    /// Initializes the platform and marks the instance running.
    pub fn start(&mut self, store: &dyn RegionStore) -> RouterResult<()> {
        self.init_platform(store)?;
        self.status = RouterStatus::Running;
        info!(router = %self.name, id = self.instance_id, "Instance started");
        Ok(())
    }

    /// Shuts every module down. Bindings are kept for the next start.
    pub fn stop(&mut self) -> RouterResult<()> {
        let result = self.bays.deactivate_all();
        self.status = RouterStatus::Halted;
        info!(router = %self.name, "Instance stopped");
        result.map_err(Into::into)
    }

    /// Releases every binding, shuts modules down and deletes the NIOs this
    /// instance created. Dropping the instance has the same effect.
    pub fn delete(self) {
        info!(router = %self.name, "Deleting instance");
    }

    fn release_resources(&mut self) {
        self.bays.teardown();
        for name in self.owned_nios.drain(..) {
            if let Err(e) = self.registry.delete(&name) {
                warn!(nio = %name, error = %e, "Unable to delete NIO");
            }
        }
    }

    /// Writes the bay configuration as replayable commands.
    pub fn save_config<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        self.bays.save_config(out)
    }

    pub fn show_hardware(&self) -> String {
        self.to_string()
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.release_resources();
    }
}

/// Chassis summary, one line per setting followed by the bound bays.
impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} instance '{}' (id {}):",
            self.model.display_name, self.name, self.instance_id
        )?;
        writeln!(f, "  VM Status  : {:?}", self.status)?;
        writeln!(f, "  RAM size   : {} Mb", self.ram_mb)?;
        writeln!(f, "  NVRAM size : {} Kb", self.nvram_kb)?;
        writeln!(f, "  ROM size   : {} Mb", self.rom_mb)?;
        writeln!(f, "  I/O memory : {}%", self.iomem_percent)?;
        writeln!(f, "  Clock div  : {}", self.clock_div)?;
        writeln!(f, "  Conf. reg  : 0x{:04x}", self.conf_reg)?;
        writeln!(f, "  MAC addr   : {}", self.mac.cisco_notation())?;
        writeln!(f, "  disk0      : {} Mb", self.disk0_mb)?;
        writeln!(f, "  disk1      : {} Mb", self.disk1_mb)?;
        for slot in 0..self.bays.slot_count() {
            let Ok(Some(device_type)) = self.bays.device_type(slot) else {
                continue;
            };
            writeln!(f, "  Bay {}: {}", slot, device_type)?;
            for binding in self.bays.nio_bindings(slot).unwrap_or_default() {
                writeln!(f, "    {}", binding)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("name", &self.name)
            .field("instance_id", &self.instance_id)
            .field("status", &self.status)
            .field("mac", &self.mac)
            .field("conf_reg", &self.conf_reg)
            .field("bays", &self.bays)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bay::BayState;
    use crate::drivers::builtin_drivers;
    use crate::error::BayError;
    use cisco_nvram::{MappedRegion, MemoryStore};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts the regions handed back for persisting.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        closes: AtomicUsize,
    }

    impl RegionStore for CountingStore {
        fn open_region(&self, tag: &str) -> cisco_nvram::Result<MappedRegion> {
            self.inner.open_region(tag)
        }

        fn create_region(&self, tag: &str, size: usize) -> cisco_nvram::Result<MappedRegion> {
            self.inner.create_region(tag, size)
        }

        fn close_region(&self, region: MappedRegion) -> cisco_nvram::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.inner.close_region(region)
        }
    }

    fn test_router() -> Router {
        Router::new(
            "R1",
            3,
            Arc::new(builtin_drivers()),
            Arc::new(NetIoRegistry::new()),
        )
    }

    #[test]
    fn test_defaults() {
        let router = test_router();
        assert_eq!(router.conf_reg_setup(), 0x2102);
        assert_eq!(router.status(), RouterStatus::Halted);
        assert_eq!(router.mac().as_bytes()[0], 0xc2);
        assert_eq!(router.mac().as_bytes()[1], 3);
        assert_eq!(router.eeprom().mac().unwrap(), router.mac());
        assert_eq!(router.file_prefix(), "c3725_i3");
    }

    #[test]
    fn test_set_mac_addr() {
        let mut router = test_router();
        router.set_mac_addr("c203.1234.0001").unwrap();
        assert_eq!(router.mac().to_string(), "c2:03:12:34:00:01");
        assert_eq!(router.eeprom().mac().unwrap(), router.mac());

        let before = router.eeprom().clone();
        assert!(matches!(
            router.set_mac_addr("not-a-mac"),
            Err(RouterError::Parse(_))
        ));
        assert_eq!(router.eeprom(), &before);
    }

    #[test]
    fn test_add_nio_binding() {
        let mut router = test_router();
        router.add_bay_binding("1:NM-1FE-TX").unwrap();
        router.add_nio_binding("1:0:tap:tap0").unwrap();

        assert_eq!(
            router.bays().nio_bindings(1).unwrap(),
            vec!["0: c3725-i3/1/0".to_string()]
        );
        assert_eq!(router.registry().ref_count("c3725-i3/1/0"), Some(1));
    }

    #[test]
    fn test_add_nio_binding_failure_removes_nio() {
        let mut router = test_router();
        router.add_nio_binding("1:0:null").unwrap();

        let err = router.add_nio_binding("9:0:null").unwrap_err();
        assert!(matches!(err, RouterError::Bay(BayError::InvalidSlot { slot: 9 })));
        assert!(router.registry().get("c3725-i3/9/0").is_none());

        assert!(matches!(
            router.add_nio_binding("1:x:null"),
            Err(RouterError::InvalidNioBinding { .. })
        ));
        assert!(matches!(
            router.add_nio_binding("1:1:bogus"),
            Err(RouterError::Nio(_))
        ));
    }

    #[test]
    fn test_start_with_empty_nvram() {
        let store = MemoryStore::new();
        let mut router = test_router();
        router.add_bay_binding("2:NM-4T").unwrap();
        router.start(&store).unwrap();

        assert_eq!(router.status(), RouterStatus::Running);
        assert_eq!(router.conf_reg(), 0x2142);
        assert_eq!(router.bays().state(0), Ok(BayState::Active));
        assert_eq!(router.bays().state(1), Ok(BayState::Empty));
        assert_eq!(router.bays().state(2), Ok(BayState::Active));

        router.stop().unwrap();
        assert_eq!(router.bays().state(2), Ok(BayState::Bound));
        assert_eq!(router.status(), RouterStatus::Halted);
    }

    #[test]
    fn test_start_pushes_startup_config() {
        let store = MemoryStore::new();
        let mut router = test_router();
        router.set_startup_config(b"hostname R1\n".to_vec());
        router.start(&store).unwrap();

        assert_eq!(router.conf_reg(), 0x2102);
        assert_eq!(router.nvram_extract_config(&store).unwrap(), b"hostname R1\n");

        // A restart finds the configuration already in place.
        router.stop().unwrap();
        let mut again = test_router();
        again.init_platform(&store).unwrap();
        assert_eq!(again.conf_reg(), 0x2102);
    }

    #[test]
    fn test_extract_without_region() {
        let router = test_router();
        assert!(matches!(
            router.nvram_extract_config(&MemoryStore::new()),
            Err(RouterError::Nvram(NvramError::RegionNotFound { .. }))
        ));
    }

    #[test]
    fn test_extract_does_not_write_back() {
        let store = CountingStore::default();
        let router = test_router();
        router.nvram_push_config(&store, b"hostname R1\n").unwrap();
        assert_eq!(store.closes.load(Ordering::SeqCst), 1);

        assert_eq!(router.nvram_extract_config(&store).unwrap(), b"hostname R1\n");
        assert_eq!(store.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_registry_references() {
        let registry = Arc::new(NetIoRegistry::new());
        registry.create("tapA", NioKind::Tap { device: "tap0".to_string() }).unwrap();

        let mut router = Router::new(
            "R1",
            3,
            Arc::new(builtin_drivers()),
            Arc::clone(&registry),
        );
        router.add_bay_binding("1:NM-16ESW").unwrap();
        router.bays_mut().attach_backend(1, 0, "tapA").unwrap();
        router.add_nio_binding("1:1:null").unwrap();
        router.start(&MemoryStore::new()).unwrap();
        assert_eq!(registry.ref_count("tapA"), Some(1));

        drop(router);
        assert_eq!(registry.ref_count("tapA"), Some(0));
        assert_eq!(registry.names(), vec!["tapA".to_string()]);
    }

    #[test]
    fn test_start_installs_module_eeproms() {
        let mut router = test_router();
        router.add_bay_binding("2:NM-4T").unwrap();
        assert_eq!(router.bays().has_eeprom(2), Ok(false));

        router.start(&MemoryStore::new()).unwrap();
        assert_eq!(router.bays().has_eeprom(2), Ok(true));
        assert_eq!(router.bays().has_eeprom(1), Ok(false));
        assert_eq!(
            router.bays().get(2).and_then(|b| b.eeprom()).map(|e| e.name()),
            Some("NM-4T")
        );
        assert!(router.bays().get(0).unwrap().eeprom().is_none());

        router.stop().unwrap();
        assert_eq!(router.bays().has_eeprom(2), Ok(false));
    }

    #[test]
    fn test_show_hardware() {
        let mut router = test_router();
        router.set_mac_addr("c203.0000.0000").unwrap();
        router.add_bay_binding("1:NM-16ESW").unwrap();
        router.add_nio_binding("1:4:null").unwrap();
        assert_eq!(
            router.show_hardware(),
            "C3725 instance 'R1' (id 3):\n\
             \x20 VM Status  : Halted\n\
             \x20 RAM size   : 128 Mb\n\
             \x20 NVRAM size : 112 Kb\n\
             \x20 ROM size   : 2 Mb\n\
             \x20 I/O memory : 5%\n\
             \x20 Clock div  : 8\n\
             \x20 Conf. reg  : 0x2102\n\
             \x20 MAC addr   : c203.0000.0000\n\
             \x20 disk0      : 16 Mb\n\
             \x20 disk1      : 0 Mb\n\
             \x20 Bay 1: NM-16ESW\n\
             \x20   4: c3725-i3/1/4\n"
        );
    }
}
