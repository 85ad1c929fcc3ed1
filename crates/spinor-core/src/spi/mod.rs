//! SPI command encoding
//!
//! This module provides address encoding, command frames, status register
//! decoding and the fixed JEDEC opcodes.

mod address;
mod frame;
pub mod opcodes;
mod status;

pub use address::AddressWidth;
pub use frame::{CommandFrame, MAX_FRAME_LEN};
pub use status::Status;
