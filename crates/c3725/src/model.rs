//! Chassis model constants.

use crate::driver::PciMapping;
use cisco_nvram::NvramGeometry;

/// Static description of a chassis model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChassisModel {
    /// Platform name, used in file names and NIO names (`c3725`).
    pub platform: &'static str,
    pub display_name: &'static str,
    pub bays: u32,
    /// Module bound to bay 0 at platform init.
    pub onboard_module: &'static str,
    /// PCI location of each network module bay.
    pub pci_map: &'static [(u32, PciMapping)],
    /// Configuration area inside the ROM region.
    pub nvram: NvramGeometry,
    /// Bytes of ROM kept free after the NVRAM area.
    pub nvram_rom_space: usize,
    pub default_ram_mb: u32,
    pub default_rom_mb: u32,
    pub default_nvram_kb: u32,
    pub default_conf_reg: u16,
    pub default_clock_div: u32,
    pub default_iomem_percent: u32,
    pub default_disk0_mb: u32,
    pub default_disk1_mb: u32,
    /// Most significant byte of generated chassis MAC addresses.
    pub mac_msb: u8,
    pub eeprom_name: &'static str,
    pub eeprom_template: &'static [u16],
}

/// Configuration register bit making the boot ROM ignore NVRAM contents.
pub const CONF_REG_IGNORE_NVRAM: u16 = 0x0040;

/// Storage region tag holding the ROM (and the NVRAM inside it).
pub const ROM_REGION: &str = "rom";

/// Mainboard EEPROM of the 3725 (version 4 layout).
static C3725_MAINBOARD_EEPROM: [u16; 64] = [
    0x04ff, 0xc18b, 0x5858, 0x5858, 0x5858, 0x5858, 0x5858, 0x5809,
    0x6140, 0x0259, 0xc046, 0x0320, 0x003f, 0x1302, 0x4244, 0x3085,
    0x1c10, 0x8206, 0x80ff, 0xffff, 0xffc4, 0x08ff, 0xffff, 0xffff,
    0xffff, 0xff81, 0xffff, 0xffff, 0x03ff, 0x04ff, 0xc28b, 0x5858,
    0x5858, 0x5858, 0x5858, 0x5858, 0x58c3, 0x0600, 0x1319, 0x5c6f,
    0x7043, 0x0030, 0xc508, 0xffff, 0xffff, 0xffff, 0xffff, 0x4100,
    0x0101, 0x02ff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff,
    0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff,
];

static C3725_PCI_MAP: [(u32, PciMapping); 2] = [
    (1, PciMapping { bus: 1, device: 0x06 }),
    (2, PciMapping { bus: 1, device: 0x0a }),
];

pub static C3725: ChassisModel = ChassisModel {
    platform: "c3725",
    display_name: "C3725",
    bays: 3,
    onboard_module: "GT96100-FE",
    pci_map: &C3725_PCI_MAP,
    nvram: NvramGeometry::new(0xe0000, 0x1c000),
    nvram_rom_space: 2048,
    default_ram_mb: 128,
    default_rom_mb: 2,
    default_nvram_kb: 112,
    default_conf_reg: 0x2102,
    default_clock_div: 8,
    default_iomem_percent: 5,
    default_disk0_mb: 16,
    default_disk1_mb: 0,
    mac_msb: 0xc2,
    eeprom_name: "C3725 Backplane",
    eeprom_template: &C3725_MAINBOARD_EEPROM,
};

impl ChassisModel {
    /// PCI location of a bay, if it has one.
    pub fn pci_for(&self, slot: u32) -> Option<PciMapping> {
        self.pci_map
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, pci)| *pci)
    }

    /// Size of the ROM region for `rom_mb` megabytes.
    pub fn rom_region_len(&self, rom_mb: u32) -> usize {
        rom_mb as usize * 1024 * 1024
    }

    /// Whether a ROM of `rom_mb` megabytes holds the NVRAM area plus its
    /// reserved tail.
    pub fn rom_holds_nvram(&self, rom_mb: u32) -> bool {
        self.nvram.required_len() + self.nvram_rom_space <= self.rom_region_len(rom_mb)
    }
}
