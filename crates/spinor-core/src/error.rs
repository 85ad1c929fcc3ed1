//! Error types for spinor-core
//!
//! Only recoverable conditions are represented here. Misuse of the driver
//! (operations outside their state, out-of-range requests, invalid geometry)
//! is a programming error and panics instead.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The bus lock could not be acquired within the configured timeout.
    ///
    /// Nothing was sent to the chip; the caller may retry later.
    BusBusy,
    /// A byte transfer on the bus did not complete.
    ///
    /// The operation was aborted mid-sequence. Flash contents in the
    /// targeted range are undefined.
    SpiTransferFailed,
    /// Identification did not yield a plausible JEDEC ID
    ChipNotFound,
}

impl Error {
    /// Returns true if the error only reports contention and can be retried
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::BusBusy)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusBusy => write!(f, "bus busy: lock not acquired in time"),
            Self::SpiTransferFailed => write!(f, "SPI transfer failed"),
            Self::ChipNotFound => write!(f, "flash chip not found"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
