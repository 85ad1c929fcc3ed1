//! Bus transport abstraction
//!
//! The transport is consumed, not implemented, by the driver. Hardware
//! backends and the emulator in `spinor-emu` provide implementations.

mod traits;

pub use traits::{transaction, BusTransport};

#[cfg(test)]
pub(crate) mod mock;
