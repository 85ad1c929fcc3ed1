//! Status register decoding

use bitflags::bitflags;

bitflags! {
    /// Status register 1 bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// Write In Progress / busy
        const WIP  = 1 << 0;
        /// Write Enable Latch
        const WEL  = 1 << 1;
        /// Block Protect bit 0
        const BP0  = 1 << 2;
        /// Block Protect bit 1
        const BP1  = 1 << 3;
        /// Block Protect bit 2
        const BP2  = 1 << 4;
        /// Block Protect bit 3 (top/bottom on some parts)
        const BP3  = 1 << 5;
        /// Status Register Write Disable
        const SRWD = 1 << 7;

        /// All block protect bits
        const BP = Self::BP0.bits() | Self::BP1.bits() | Self::BP2.bits() | Self::BP3.bits();
    }
}

impl Status {
    /// Decode a raw status byte, keeping unknown bits
    pub const fn from_raw(raw: u8) -> Self {
        Self::from_bits_retain(raw)
    }

    /// Returns true while a program or erase is still executing
    pub const fn is_busy(&self) -> bool {
        self.contains(Self::WIP)
    }

    /// Returns true if any block protect bit is set
    pub const fn is_protected(&self) -> bool {
        self.intersects(Self::BP)
    }
}
