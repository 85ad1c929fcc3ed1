//! Command frame construction

use super::AddressWidth;
use heapless::Vec;

/// Longest header: opcode, four address bytes, one dummy byte
pub const MAX_FRAME_LEN: usize = 6;

/// Opcode and address bytes sent at the start of a transaction
///
/// Frames are built per operation on the stack and never persisted.
/// Data, padding and received bytes follow the frame inside the same
/// chip-select window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: Vec<u8, MAX_FRAME_LEN>,
}

impl CommandFrame {
    /// Create a frame holding only an opcode (e.g., WREN, RDSR, RDID)
    pub fn opcode(opcode: u8) -> Self {
        let mut frame = Self { bytes: Vec::new() };
        frame.push(opcode);
        frame
    }

    fn push(&mut self, byte: u8) {
        let pushed = self.bytes.push(byte).is_ok();
        debug_assert!(pushed, "command frame exceeds {} bytes", MAX_FRAME_LEN);
    }

    /// Create a frame with an opcode followed by a big-endian address
    ///
    /// # Panics
    /// If `address` does not fit `width`.
    pub fn addressed(opcode: u8, width: AddressWidth, address: u32) -> Self {
        assert!(
            width.fits(address),
            "address 0x{:08X} does not fit {} address bytes",
            address,
            width.bytes()
        );
        let mut frame = Self::opcode(opcode);
        let mut buf = [0u8; 4];
        width.encode(address, &mut buf);
        for &b in &buf[..width.bytes() as usize] {
            frame.push(b);
        }
        frame
    }

    /// Append one dummy byte (fast read timing)
    pub fn with_dummy(mut self, dummy: u8) -> Self {
        // opcode + 4 address bytes leaves room for exactly one dummy byte
        self.push(dummy);
        self
    }

    /// The opcode byte
    pub fn opcode_byte(&self) -> u8 {
        self.bytes[0]
    }

    /// The encoded frame
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes in the frame
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}
