//! Emulator error types

use std::io;

/// Errors from emulator setup and image handling
#[derive(Debug, thiserror::Error)]
pub enum EmuError {
    /// I/O error on an image file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Image size does not match the chip capacity
    #[error("image is {actual} bytes, chip holds {expected}")]
    ImageSize {
        /// Chip capacity
        expected: usize,
        /// Image length
        actual: usize,
    },
    /// No chip is attached at this chip select
    #[error("no chip on chip select {0}")]
    NoSuchChip(usize),
}
