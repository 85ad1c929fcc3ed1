//! Flash chip descriptors and the chip database

mod descriptor;
pub mod known;

#[cfg(feature = "std")]
mod database;

pub use descriptor::{ChipDescriptor, GeometryError};
pub use known::KnownChip;

#[cfg(feature = "std")]
pub use database::{ChipDatabase, ChipDbError, ChipEntry, Size};
