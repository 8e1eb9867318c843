//! Router instance configuration file.
//!
//! ```toml
//! [router]
//! name = "R1"
//! instance_id = 1
//! ram_mb = 128
//! conf_reg = 0x2102
//! mac_addr = "c201.0000.0000"
//! startup_config = "R1.cfg"
//! working_dir = "/var/lib/c3725"
//!
//! bays = ["1:NM-1FE-TX", "2:NM-4T"]
//! nio_bindings = ["1:0:tap:tap0"]
//!
//! [[nio]]
//! name = "uplink"
//! kind = "udp:10000:127.0.0.1:10001"
//!
//! [[attach]]
//! slot = 2
//! port = 0
//! nio = "uplink"
//! ```

use crate::error::{RouterError, RouterResult};
use crate::model::C3725;
use cisco_nio::NioKind;
use cisco_types::{BayDescription, MacAddress};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Instance settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterSection {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub instance_id: u32,

    #[serde(default = "default_ram_mb")]
    pub ram_mb: u32,

    #[serde(default = "default_rom_mb")]
    pub rom_mb: u32,

    #[serde(default = "default_nvram_kb")]
    pub nvram_kb: u32,

    /// Configuration register loaded at platform init.
    #[serde(default = "default_conf_reg")]
    pub conf_reg: u16,

    #[serde(default = "default_clock_div")]
    pub clock_div: u32,

    /// Share of RAM used as I/O memory, in percent.
    #[serde(default = "default_iomem")]
    pub iomem_percent: u32,

    /// PCMCIA disk sizes in MB; 0 leaves the slot empty.
    #[serde(default = "default_disk0_mb")]
    pub disk0_mb: u32,

    #[serde(default = "default_disk1_mb")]
    pub disk1_mb: u32,

    /// Chassis MAC; generated from the instance id when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_addr: Option<MacAddress>,

    /// Configuration pushed to NVRAM at platform init.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_config: Option<PathBuf>,

    /// Directory holding the instance's region files.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
}

/// A named NIO to create before bays are populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NioSection {
    pub name: String,
    pub kind: NioKind,
}

/// A port binding to a NIO declared in a `[[nio]]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachSection {
    pub slot: u32,
    pub port: u32,
    pub nio: String,
}

/// Complete instance configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub router: RouterSection,

    /// Modules for user bays (`"<slot>:<device_type>"`).
    #[serde(default)]
    pub bays: Vec<BayDescription>,

    /// Inline NIO bindings (`"<slot>:<port>:<kind>[:<args>]"`).
    #[serde(default)]
    pub nio_bindings: Vec<String>,

    #[serde(default, rename = "nio")]
    pub nios: Vec<NioSection>,

    #[serde(default, rename = "attach")]
    pub attachments: Vec<AttachSection>,
}

fn default_name() -> String {
    "R1".to_string()
}

fn default_ram_mb() -> u32 {
    C3725.default_ram_mb
}

fn default_rom_mb() -> u32 {
    C3725.default_rom_mb
}

fn default_nvram_kb() -> u32 {
    C3725.default_nvram_kb
}

fn default_conf_reg() -> u16 {
    C3725.default_conf_reg
}

fn default_clock_div() -> u32 {
    C3725.default_clock_div
}

fn default_iomem() -> u32 {
    C3725.default_iomem_percent
}

fn default_disk0_mb() -> u32 {
    C3725.default_disk0_mb
}

fn default_disk1_mb() -> u32 {
    C3725.default_disk1_mb
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            instance_id: 0,
            ram_mb: default_ram_mb(),
            rom_mb: default_rom_mb(),
            nvram_kb: default_nvram_kb(),
            conf_reg: default_conf_reg(),
            clock_div: default_clock_div(),
            iomem_percent: default_iomem(),
            disk0_mb: default_disk0_mb(),
            disk1_mb: default_disk1_mb(),
            mac_addr: None,
            startup_config: None,
            working_dir: default_working_dir(),
        }
    }
}

impl RouterConfig {
    /// Loads a configuration file, falling back to defaults if it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> RouterResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).map_err(|e| match e {
                RouterError::InvalidConfig { message, .. } => {
                    RouterError::invalid_config(path.display().to_string(), message)
                }
                other => other,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(RouterError::io(path, e)),
        }
    }

    /// Parses and validates TOML text.
    pub fn parse(content: &str) -> RouterResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| RouterError::invalid_config("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> RouterResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| RouterError::invalid_config("config", e.to_string()))?;
        fs::write(path, content).map_err(|e| RouterError::io(path, e))
    }

    pub fn validate(&self) -> RouterResult<()> {
        let router = &self.router;
        if router.name.trim().is_empty() {
            return Err(RouterError::invalid_config("router.name", "must not be empty"));
        }
        if router.ram_mb == 0 {
            return Err(RouterError::invalid_config("router.ram_mb", "must be > 0"));
        }
        if !C3725.rom_holds_nvram(router.rom_mb) {
            return Err(RouterError::invalid_config(
                "router.rom_mb",
                format!("{} MB cannot hold the NVRAM area", router.rom_mb),
            ));
        }
        if router.iomem_percent > 100 {
            return Err(RouterError::invalid_config(
                "router.iomem_percent",
                "must be 0-100",
            ));
        }
        if router.clock_div == 0 {
            return Err(RouterError::invalid_config("router.clock_div", "must be > 0"));
        }
        for bay in &self.bays {
            if bay.slot == 0 || bay.slot >= C3725.bays {
                return Err(RouterError::invalid_config(
                    "bays",
                    format!("slot {} is not a network module bay", bay.slot),
                ));
            }
        }
        for attach in &self.attachments {
            if !self.nios.iter().any(|n| n.name == attach.nio) {
                return Err(RouterError::invalid_config(
                    "attach",
                    format!("NIO '{}' is not declared", attach.nio),
                ));
            }
        }
        Ok(())
    }
}
