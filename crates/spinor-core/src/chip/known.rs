//! Built-in descriptors for common parts
//!
//! Usable without `alloc`. The std chip database can extend this table from
//! RON files at runtime.

use super::ChipDescriptor;
use crate::spi::{opcodes, AddressWidth};

/// A named built-in descriptor
#[derive(Debug, Clone, Copy)]
pub struct KnownChip {
    /// Vendor name
    pub vendor: &'static str,
    /// Chip model name
    pub name: &'static str,
    /// JEDEC manufacturer ID
    pub jedec_manufacturer: u8,
    /// JEDEC device ID
    pub jedec_device: u16,
    /// Geometry and command set
    pub descriptor: ChipDescriptor,
}

/// Generic 32 Mbit 25-series part with 4 KiB sectors (W25Q32 class)
pub const GENERIC_25Q32: KnownChip = KnownChip {
    vendor: "Winbond",
    name: "W25Q32",
    jedec_manufacturer: 0xEF,
    jedec_device: 0x4016,
    descriptor: ChipDescriptor {
        sector_count: 1024,
        sector_size: 4096,
        page_size: 256,
        page_alignment: 1,
        address_width: AddressWidth::ThreeByte,
        opcode_page_program: opcodes::PP,
        opcode_sector_erase: opcodes::SE_20,
        opcode_block_erase: opcodes::BE_D8,
        block_size: 64 * 1024,
        opcode_chip_erase: opcodes::CE_C7,
    },
};

/// 256 Mbit part driven with 4-byte addresses (MX25L25645 class)
pub const MX25L256: KnownChip = KnownChip {
    vendor: "Macronix",
    name: "MX25L25645G",
    jedec_manufacturer: 0xC2,
    jedec_device: 0x2019,
    descriptor: ChipDescriptor {
        sector_count: 8192,
        sector_size: 4096,
        page_size: 256,
        page_alignment: 1,
        address_width: AddressWidth::FourByte,
        opcode_page_program: opcodes::PP,
        opcode_sector_erase: opcodes::SE_20,
        opcode_block_erase: opcodes::BE_D8,
        block_size: 64 * 1024,
        opcode_chip_erase: opcodes::CE_C7,
    },
};

/// SST part programmed in AAI mode, driven with 32 KiB erase sectors
pub const SST25VF016B: KnownChip = KnownChip {
    vendor: "SST",
    name: "SST25VF016B",
    jedec_manufacturer: 0xBF,
    jedec_device: 0x2541,
    descriptor: ChipDescriptor {
        sector_count: 64,
        sector_size: 32 * 1024,
        page_size: 256,
        page_alignment: 2,
        address_width: AddressWidth::ThreeByte,
        opcode_page_program: opcodes::AAI_WP,
        opcode_sector_erase: opcodes::BE_52,
        opcode_block_erase: opcodes::BE_D8,
        block_size: 64 * 1024,
        opcode_chip_erase: opcodes::CE_60,
    },
};

/// Legacy 64 Mbit part with 64 KiB sectors and no 4 KiB erase
pub const M25P64: KnownChip = KnownChip {
    vendor: "ST",
    name: "M25P64",
    jedec_manufacturer: 0x20,
    jedec_device: 0x2017,
    descriptor: ChipDescriptor {
        sector_count: 128,
        sector_size: 64 * 1024,
        page_size: 256,
        page_alignment: 1,
        address_width: AddressWidth::ThreeByte,
        opcode_page_program: opcodes::PP,
        opcode_sector_erase: opcodes::BE_D8,
        opcode_block_erase: opcodes::BE_D8,
        block_size: 64 * 1024,
        opcode_chip_erase: opcodes::CE_C7,
    },
};

/// 4 Mbit part that only accepts program addresses on 16-byte boundaries
pub const AT25SF041: KnownChip = KnownChip {
    vendor: "Adesto",
    name: "AT25SF041",
    jedec_manufacturer: 0x1F,
    jedec_device: 0x8401,
    descriptor: ChipDescriptor {
        sector_count: 128,
        sector_size: 4096,
        page_size: 256,
        page_alignment: 16,
        address_width: AddressWidth::ThreeByte,
        opcode_page_program: opcodes::PP,
        opcode_sector_erase: opcodes::SE_20,
        opcode_block_erase: opcodes::BE_D8,
        block_size: 64 * 1024,
        opcode_chip_erase: opcodes::CE_60,
    },
};

/// Page-erasable 4 Mbit part without sector erase, page writes replace data
/// (AT45/M45PE class); erase is emulated by programming 0xFF
pub const M45PE40: KnownChip = KnownChip {
    vendor: "Micron",
    name: "M45PE40",
    jedec_manufacturer: 0x20,
    jedec_device: 0x4013,
    descriptor: ChipDescriptor {
        sector_count: 8,
        sector_size: 64 * 1024,
        page_size: 256,
        page_alignment: 1,
        address_width: AddressWidth::ThreeByte,
        opcode_page_program: opcodes::PP,
        opcode_sector_erase: 0,
        opcode_block_erase: 0,
        block_size: 0,
        opcode_chip_erase: 0,
    },
};

/// All built-in chips
pub const ALL: &[KnownChip] = &[
    GENERIC_25Q32,
    MX25L256,
    SST25VF016B,
    M25P64,
    AT25SF041,
    M45PE40,
];

/// Find a built-in chip by name (case-insensitive exact match)
pub fn find_by_name(name: &str) -> Option<&'static KnownChip> {
    ALL.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// Find a built-in chip by JEDEC ID
pub fn find_by_jedec_id(manufacturer: u8, device: u16) -> Option<&'static KnownChip> {
    ALL.iter()
        .find(|c| c.jedec_manufacturer == manufacturer && c.jedec_device == device)
}
