//! Standard JEDEC SPI flash opcodes
//!
//! The fixed part of the command set. Opcodes that differ between parts
//! (page program, sector erase, block erase, chip erase) live in the
//! [`ChipDescriptor`](crate::chip::ChipDescriptor).

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before any write/erase operation
pub const WREN: u8 = 0x06;
/// Write Disable - clears WEL bit, also terminates AAI programming
pub const WRDI: u8 = 0x04;

// ============================================================================
// Status register operations
// ============================================================================

/// Read Status Register
pub const RDSR: u8 = 0x05;
/// Write Status Register
pub const WRSR: u8 = 0x01;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer + device ID)
pub const RDID: u8 = 0x9F;
/// JEP106 continuation code preceding manufacturer IDs in higher banks
pub const JEDEC_CONTINUATION: u8 = 0x7F;

// ============================================================================
// Read
// ============================================================================

/// Fast Read (one dummy byte after the address)
pub const FAST_READ: u8 = 0x0B;

// ============================================================================
// Program
// ============================================================================

/// Page Program
pub const PP: u8 = 0x02;
/// Auto Address Increment word program (SST); needs WRDI to terminate
pub const AAI_WP: u8 = 0xAD;

// ============================================================================
// Erase
// ============================================================================

/// Sector Erase 4KB
pub const SE_20: u8 = 0x20;
/// Block Erase 32KB
pub const BE_52: u8 = 0x52;
/// Block Erase 64KB
pub const BE_D8: u8 = 0xD8;
/// Chip Erase (entire chip)
pub const CE_C7: u8 = 0xC7;
/// Chip Erase (alternate opcode)
pub const CE_60: u8 = 0x60;

// ============================================================================
// Status register values
// ============================================================================

/// Status value written by `write_protect`: BP0..BP3 set
pub const SR_PROTECT_ALL: u8 = 0x3C;
/// Status value written by `write_unprotect`
pub const SR_UNPROTECT_ALL: u8 = 0x00;

/// Byte clocked out after the address of a fast read
pub const DUMMY: u8 = 0x00;
/// Value of an erased byte
pub const ERASED: u8 = 0xFF;
