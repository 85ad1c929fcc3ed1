//! Driver state machine states

use core::fmt;

/// Driver state
///
/// `Reading`, `Writing` and `Erasing` are only observable while the bus
/// lock is held by the driver: during a blocking operation, or between
/// `erase_begin` and the final `erase_tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceState {
    /// Constructed, never started
    #[default]
    Uninitialized,
    /// Stopped, no descriptor in use
    Stopped,
    /// Idle and accepting operations
    Ready,
    /// Read in progress
    Reading,
    /// Program in progress
    Writing,
    /// Erase in progress
    Erasing,
}

impl DeviceState {
    /// Returns true once `start` has succeeded and `stop` has not been called
    pub const fn is_started(&self) -> bool {
        matches!(
            self,
            Self::Ready | Self::Reading | Self::Writing | Self::Erasing
        )
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Stopped => "stopped",
            Self::Ready => "ready",
            Self::Reading => "reading",
            Self::Writing => "writing",
            Self::Erasing => "erasing",
        };
        f.write_str(name)
    }
}
