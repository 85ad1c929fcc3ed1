//! spinor-emu - In-memory JEDEC SPI NOR emulator
//!
//! This crate emulates one or more flash chips behind chip selects on a
//! shared, lockable bus. Handles implement
//! [`BusTransport`](spinor_core::transport::BusTransport), so the real
//! driver runs against the emulator unchanged. It is useful for testing
//! and for working on flash images without hardware.
//!
//! ```
//! use spinor_core::chip::known;
//! use spinor_core::flash::{DriverConfig, JedecSpiFlash};
//! use spinor_emu::{ChipModel, EmulatedChip, SharedBus};
//!
//! let bus = SharedBus::new();
//! let cs = bus.attach(EmulatedChip::new(ChipModel::from_known(&known::GENERIC_25Q32)));
//! let mut flash = JedecSpiFlash::new(bus.handle(cs).unwrap(), DriverConfig::default());
//! flash.start(known::GENERIC_25Q32.descriptor).unwrap();
//! flash.write(0x100, b"hi").unwrap();
//! assert_eq!(&bus.chip_data(cs).unwrap()[0x100..0x102], b"hi");
//! assert!(bus.violations().is_empty());
//! ```

mod bus;
mod chip;
mod error;

pub use bus::{BusHandle, SharedBus, Violation};
pub use chip::{ChipModel, EmulatedChip, ProgramMode};
pub use error::EmuError;

#[cfg(test)]
mod tests;
