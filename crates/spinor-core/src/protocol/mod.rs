//! Protocol implementations
//!
//! JEDEC SPI NOR command sequences built on the bus transport.

mod jedec;

pub use jedec::*;
