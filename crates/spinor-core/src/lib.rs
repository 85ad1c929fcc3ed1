//! spinor-core - JEDEC SPI NOR flash driver
//!
//! This crate drives serial NOR flash parts over a chip-select based bus
//! transport. It splits reads, writes and erases across page and sector
//! boundaries, serialises access through the bus lock and exposes a
//! tick-driven erase for callers that must not block for long.
//! It is `no_std` compatible.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`), serde
//!   support for descriptors and configuration, and the RON chip database
//! - `alloc` - Enable heap allocation
//!
//! # Example
//!
//! ```ignore
//! use spinor_core::chip::known;
//! use spinor_core::flash::{DriverConfig, JedecSpiFlash, NvmDevice};
//!
//! fn store<B: spinor_core::transport::BusTransport>(bus: B) -> spinor_core::Result<()> {
//!     let mut flash = JedecSpiFlash::new(bus, DriverConfig::default());
//!     flash.start(known::GENERIC_25Q32.descriptor)?;
//!     flash.erase(0x1000, 0x100)?;
//!     flash.write(0x1000, b"hello")?;
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(feature = "alloc", test))]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod chip;
pub mod error;
pub mod flash;
pub mod protocol;
pub mod spi;
pub mod transport;

pub use error::{Error, Result};
