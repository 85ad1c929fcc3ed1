//! Chip database for runtime loading and lookup
//!
//! Chip definitions live in RON files, one vendor per file. Every loaded
//! entry is checked with [`ChipDescriptor::validate`] before it is accepted.

use alloc::{format, string::String, vec::Vec};
use std::fs;
use std::io;
use std::path::Path;

use super::known;
use super::ChipDescriptor;
use crate::spi::AddressWidth;

/// Error type for chip database operations
#[derive(Debug, thiserror::Error)]
pub enum ChipDbError {
    /// I/O error reading files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// RON parsing error
    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Entry failed geometry validation
    #[error("chip {chip}: {reason}")]
    Validation {
        /// Chip name
        chip: String,
        /// Rejection reason
        reason: String,
    },
}

// ============================================================================
// RON deserialization types (intermediate format)
// ============================================================================

/// Size specification with human-readable units (for RON parsing)
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub enum Size {
    /// Size in bytes
    B(u32),
    /// Size in kibibytes (1024 bytes)
    KiB(u32),
    /// Size in mebibytes (1024 * 1024 bytes)
    MiB(u32),
}

impl Size {
    /// Convert to bytes, `None` if the size does not fit in 32 bits
    pub fn to_bytes(self) -> Option<u32> {
        match self {
            Size::B(n) => Some(n),
            Size::KiB(n) => n.checked_mul(1024),
            Size::MiB(n) => n.checked_mul(1024 * 1024),
        }
    }
}

/// Erase command and the size it covers
#[derive(Debug, Clone, Copy, serde::Deserialize)]
struct EraseDef {
    opcode: u8,
    size: Size,
}

/// Single chip definition in RON format
#[derive(Debug, Clone, serde::Deserialize)]
struct ChipDef {
    name: String,
    device_id: u16,
    total_size: Size,
    #[serde(default = "default_page_size")]
    page_size: Size,
    #[serde(default = "default_page_alignment")]
    page_alignment: u32,
    #[serde(default)]
    four_byte_addr: bool,
    #[serde(default = "default_program_opcode")]
    program_opcode: u8,
    /// Smallest erase unit; omitted for parts where erase is emulated
    #[serde(default)]
    sector_erase: Option<EraseDef>,
    /// Sector size when `sector_erase` is omitted
    #[serde(default)]
    sector_size: Option<Size>,
    #[serde(default)]
    block_erase: Option<EraseDef>,
    #[serde(default)]
    chip_erase: Option<u8>,
}

fn default_page_size() -> Size {
    Size::B(256)
}

fn default_page_alignment() -> u32 {
    1
}

fn default_program_opcode() -> u8 {
    crate::spi::opcodes::PP
}

/// Vendor definition containing multiple chips
#[derive(Debug, Clone, serde::Deserialize)]
struct VendorDef {
    vendor: String,
    manufacturer_id: u8,
    chips: Vec<ChipDef>,
}

impl ChipDef {
    fn to_descriptor(&self) -> Result<ChipDescriptor, ChipDbError> {
        let invalid = |reason: String| ChipDbError::Validation {
            chip: self.name.clone(),
            reason,
        };

        let bytes = |field: &str, size: Size| {
            size.to_bytes()
                .ok_or_else(|| invalid(format!("{} {:?} does not fit in 32 bits", field, size)))
        };

        let sector_size = match (self.sector_erase, self.sector_size) {
            (Some(se), _) => bytes("sector size", se.size)?,
            (None, Some(size)) => bytes("sector size", size)?,
            (None, None) => {
                return Err(invalid(String::from(
                    "either sector_erase or sector_size is required",
                )))
            }
        };
        if sector_size == 0 {
            return Err(invalid(String::from("sector size is zero")));
        }
        let total = bytes("total_size", self.total_size)?;
        if total % sector_size != 0 {
            return Err(invalid(format!(
                "total size {} is not a multiple of the sector size {}",
                total, sector_size
            )));
        }

        let descriptor = ChipDescriptor {
            sector_count: total / sector_size,
            sector_size,
            page_size: bytes("page_size", self.page_size)?,
            page_alignment: self.page_alignment,
            address_width: if self.four_byte_addr {
                AddressWidth::FourByte
            } else {
                AddressWidth::ThreeByte
            },
            opcode_page_program: self.program_opcode,
            opcode_sector_erase: self.sector_erase.map_or(0, |e| e.opcode),
            opcode_block_erase: self.block_erase.map_or(0, |e| e.opcode),
            block_size: match self.block_erase {
                Some(e) => bytes("block size", e.size)?,
                None => 0,
            },
            opcode_chip_erase: self.chip_erase.unwrap_or(0),
        };
        descriptor
            .validate()
            .map_err(|e| invalid(format!("{}", e)))?;
        Ok(descriptor)
    }
}

// ============================================================================
// Chip database
// ============================================================================

/// One chip known to the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipEntry {
    /// Vendor name
    pub vendor: String,
    /// Chip model name
    pub name: String,
    /// JEDEC manufacturer ID
    pub jedec_manufacturer: u8,
    /// JEDEC device ID
    pub jedec_device: u16,
    /// Geometry and command set
    pub descriptor: ChipDescriptor,
}

impl ChipEntry {
    /// Check if this chip matches the given JEDEC ID
    pub fn matches_jedec_id(&self, manufacturer: u8, device: u16) -> bool {
        self.jedec_manufacturer == manufacturer && self.jedec_device == device
    }
}

impl From<&known::KnownChip> for ChipEntry {
    fn from(chip: &known::KnownChip) -> Self {
        Self {
            vendor: String::from(chip.vendor),
            name: String::from(chip.name),
            jedec_manufacturer: chip.jedec_manufacturer,
            jedec_device: chip.jedec_device,
            descriptor: chip.descriptor,
        }
    }
}

/// Runtime chip database
#[derive(Debug, Clone, Default)]
pub struct ChipDatabase {
    chips: Vec<ChipEntry>,
}

impl ChipDatabase {
    /// Create an empty chip database
    pub fn new() -> Self {
        Self { chips: Vec::new() }
    }

    /// Create a database holding the built-in chips
    pub fn with_builtin() -> Self {
        Self {
            chips: known::ALL.iter().map(ChipEntry::from).collect(),
        }
    }

    /// Load chip definitions from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ChipDbError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load chip definitions from a RON string
    ///
    /// Either all entries of the file are added or none are.
    pub fn load_ron(&mut self, content: &str) -> Result<usize, ChipDbError> {
        // optional erase entries are written without `Some(..)`
        let vendor_def: VendorDef = ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .from_str(content)?;

        let mut loaded = Vec::with_capacity(vendor_def.chips.len());
        for chip_def in &vendor_def.chips {
            loaded.push(ChipEntry {
                vendor: vendor_def.vendor.clone(),
                name: chip_def.name.clone(),
                jedec_manufacturer: vendor_def.manufacturer_id,
                jedec_device: chip_def.device_id,
                descriptor: chip_def.to_descriptor()?,
            });
        }

        let count = loaded.len();
        log::debug!("loaded {} chips from vendor {}", count, vendor_def.vendor);
        self.chips.extend(loaded);
        Ok(count)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ChipDbError> {
        let mut total = 0;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "ron") {
                total += self.load_file(&path)?;
            }
        }

        Ok(total)
    }

    /// Get all chips in the database
    pub fn chips(&self) -> &[ChipEntry] {
        &self.chips
    }

    /// Get the number of chips in the database
    pub fn len(&self) -> usize {
        self.chips.len()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// Find a chip by its JEDEC ID
    ///
    /// Later entries win, as in [`find_by_name`](Self::find_by_name).
    pub fn find_by_jedec_id(&self, manufacturer: u8, device: u16) -> Option<&ChipEntry> {
        self.chips
            .iter()
            .rev()
            .find(|c| c.matches_jedec_id(manufacturer, device))
    }

    /// Find a chip by exact name (case-insensitive)
    ///
    /// Later entries win, so files loaded after the built-ins override them.
    pub fn find_by_name(&self, name: &str) -> Option<&ChipEntry> {
        self.chips
            .iter()
            .rev()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Iterate over all chips
    pub fn iter(&self) -> impl Iterator<Item = &ChipEntry> {
        self.chips.iter()
    }
}
