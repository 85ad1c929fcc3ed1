//! Flash device driver
//!
//! [`JedecSpiFlash`] is the generic JEDEC SPI NOR driver. It implements the
//! [`NvmDevice`] capability trait and adds the tick-driven erase.

mod async_erase;
mod config;
mod device;
mod jedec_spi;
pub mod plan;
mod state;

pub use async_erase::{EraseCursor, EraseStatus};
pub use config::DriverConfig;
pub use device::{DeviceInfo, NvmDevice};
pub use jedec_spi::JedecSpiFlash;
pub use state::DeviceState;
