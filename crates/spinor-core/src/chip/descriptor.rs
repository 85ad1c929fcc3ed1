//! Flash chip descriptor

use core::fmt;

use crate::spi::{opcodes, AddressWidth};

/// Geometry and variable command set of one flash part
///
/// Descriptors are immutable once handed to the driver. All size fields
/// must be powers of two and `page_alignment <= page_size`; see
/// [`ChipDescriptor::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct ChipDescriptor {
    /// Number of erase sectors
    pub sector_count: u32,
    /// Sector (smallest erase unit) size in bytes
    pub sector_size: u32,
    /// Program page size in bytes
    pub page_size: u32,
    /// Alignment the chip requires for program addresses
    ///
    /// 1 for parts that accept any start address.
    pub page_alignment: u32,
    /// Address bytes sent per command
    pub address_width: AddressWidth,
    /// Page program opcode ([`opcodes::AAI_WP`] selects AAI termination)
    pub opcode_page_program: u8,
    /// Sector erase opcode, 0 if the part has none (erase is emulated)
    pub opcode_sector_erase: u8,
    /// Block erase opcode, 0 if the part has none
    pub opcode_block_erase: u8,
    /// Block size erased by `opcode_block_erase`
    pub block_size: u32,
    /// Chip erase opcode, 0 if the part has none
    pub opcode_chip_erase: u8,
}

/// Reasons a descriptor is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    /// A size field is zero or not a power of two
    NotPowerOfTwo {
        /// Name of the offending field
        field: &'static str,
        /// Its value
        value: u32,
    },
    /// `page_alignment` exceeds `page_size`
    AlignmentExceedsPage,
    /// The page size exceeds the sector size
    PageExceedsSector,
    /// The block size is smaller than the sector size
    BlockSmallerThanSector,
    /// The capacity cannot be addressed with the configured address width
    CapacityExceedsAddressWidth,
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPowerOfTwo { field, value } => {
                write!(f, "{} = {} is not a power of two", field, value)
            }
            Self::AlignmentExceedsPage => write!(f, "page_alignment exceeds page_size"),
            Self::PageExceedsSector => write!(f, "page_size exceeds sector_size"),
            Self::BlockSmallerThanSector => write!(f, "block_size is smaller than sector_size"),
            Self::CapacityExceedsAddressWidth => {
                write!(f, "capacity exceeds the range of the address width")
            }
        }
    }
}

fn check_pow2(field: &'static str, value: u32) -> Result<(), GeometryError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(GeometryError::NotPowerOfTwo { field, value })
    }
}

impl ChipDescriptor {
    /// Total addressable capacity in bytes
    pub const fn capacity(&self) -> u64 {
        self.sector_count as u64 * self.sector_size as u64
    }

    /// Check the geometry invariants
    pub fn validate(&self) -> Result<(), GeometryError> {
        check_pow2("sector_count", self.sector_count)?;
        check_pow2("sector_size", self.sector_size)?;
        check_pow2("page_size", self.page_size)?;
        check_pow2("page_alignment", self.page_alignment)?;
        if self.page_alignment > self.page_size {
            return Err(GeometryError::AlignmentExceedsPage);
        }
        if self.page_size > self.sector_size {
            return Err(GeometryError::PageExceedsSector);
        }
        if self.has_block_erase() {
            check_pow2("block_size", self.block_size)?;
            if self.block_size < self.sector_size {
                return Err(GeometryError::BlockSmallerThanSector);
            }
        }
        if self.capacity() > self.address_width.max_size() {
            return Err(GeometryError::CapacityExceedsAddressWidth);
        }
        Ok(())
    }

    /// Returns true if a page program needs a trailing write-disable
    pub const fn uses_aai(&self) -> bool {
        self.opcode_page_program == opcodes::AAI_WP
    }

    /// Returns true if the part has a native sector erase command
    pub const fn has_sector_erase(&self) -> bool {
        self.opcode_sector_erase != 0
    }

    /// Returns true if the part has a block erase command
    pub const fn has_block_erase(&self) -> bool {
        self.opcode_block_erase != 0
    }

    /// Returns true if the part has a chip erase command
    pub const fn has_chip_erase(&self) -> bool {
        self.opcode_chip_erase != 0
    }

    /// Check that `[addr, addr + len)` lies within the chip
    pub fn contains_range(&self, addr: u32, len: u64) -> bool {
        addr as u64 + len <= self.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::known;

    fn base() -> ChipDescriptor {
        known::GENERIC_25Q32.descriptor
    }

    #[test]
    fn test_known_chips_are_valid() {
        for chip in known::ALL {
            assert_eq!(chip.descriptor.validate(), Ok(()), "{}", chip.name);
        }
    }

    #[test]
    fn test_capacity() {
        let d = base();
        assert_eq!(d.capacity(), 4 * 1024 * 1024);
        assert!(d.contains_range(0, d.capacity()));
        assert!(!d.contains_range(1, d.capacity()));
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        let mut d = base();
        d.page_size = 200;
        assert_eq!(
            d.validate(),
            Err(GeometryError::NotPowerOfTwo {
                field: "page_size",
                value: 200
            })
        );

        let mut d = base();
        d.sector_count = 0;
        assert!(matches!(
            d.validate(),
            Err(GeometryError::NotPowerOfTwo { field: "sector_count", .. })
        ));
    }

    #[test]
    fn test_rejects_alignment_above_page() {
        let mut d = base();
        d.page_alignment = 512;
        assert_eq!(d.validate(), Err(GeometryError::AlignmentExceedsPage));
    }

    #[test]
    fn test_rejects_capacity_beyond_three_byte_addressing() {
        let mut d = base();
        d.sector_count = 8192; // 32 MiB
        assert_eq!(d.validate(), Err(GeometryError::CapacityExceedsAddressWidth));
        d.address_width = AddressWidth::FourByte;
        assert_eq!(d.validate(), Ok(()));
    }

    #[test]
    fn test_aai_detection() {
        assert!(known::SST25VF016B.descriptor.uses_aai());
        assert!(!base().uses_aai());
    }
}
