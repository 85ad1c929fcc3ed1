//! Address width types

/// Number of address bytes sent after an opcode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressWidth {
    /// 3-byte (24-bit) address - legacy addressing, up to 16 MiB
    #[default]
    ThreeByte,
    /// 4-byte (32-bit) address - extended addressing, up to 4 GiB
    FourByte,
}

impl AddressWidth {
    /// Returns the address width for a byte count, if supported
    pub const fn from_bytes(count: u8) -> Option<Self> {
        match count {
            3 => Some(Self::ThreeByte),
            4 => Some(Self::FourByte),
            _ => None,
        }
    }

    /// Returns the number of address bytes
    pub const fn bytes(&self) -> u8 {
        match self {
            Self::ThreeByte => 3,
            Self::FourByte => 4,
        }
    }

    /// Returns the maximum addressable size in bytes
    pub const fn max_size(&self) -> u64 {
        match self {
            Self::ThreeByte => 1 << 24,
            Self::FourByte => 1 << 32,
        }
    }

    /// Returns true if `address` can be expressed with this width
    pub const fn fits(&self, address: u32) -> bool {
        (address as u64) < self.max_size()
    }

    /// Encode an address big-endian into the first `bytes()` bytes of `buf`
    ///
    /// The address must fit the width; higher bits are dropped otherwise.
    pub fn encode(&self, address: u32, buf: &mut [u8]) {
        let be = address.to_be_bytes();
        match self {
            Self::ThreeByte => buf[..3].copy_from_slice(&be[1..]),
            Self::FourByte => buf[..4].copy_from_slice(&be),
        }
    }
}
