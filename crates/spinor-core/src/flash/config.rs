//! Driver configuration

use core::time::Duration;

use crate::protocol::PollPolicy;

/// Timing knobs of the driver
///
/// Under the `std` feature this can be deserialized, e.g. from TOML:
///
/// ```toml
/// lock_timeout_ms = 100
/// begin_timeout_ms = 1
/// poll_interval_us = 0
/// spin_polls = 16
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(default, deny_unknown_fields))]
pub struct DriverConfig {
    /// Bus lock timeout for blocking operations
    pub lock_timeout_ms: u32,
    /// Bus lock timeout for `erase_begin`
    pub begin_timeout_ms: u32,
    /// Delay between status samples once `spin_polls` is exhausted
    pub poll_interval_us: u32,
    /// Status samples taken back-to-back before delaying
    pub spin_polls: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 100,
            begin_timeout_ms: 1,
            poll_interval_us: 0,
            spin_polls: 16,
        }
    }
}

impl DriverConfig {
    /// Lock timeout for blocking operations
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms as u64)
    }

    /// Lock timeout for `erase_begin`
    pub fn begin_timeout(&self) -> Duration {
        Duration::from_millis(self.begin_timeout_ms as u64)
    }

    /// Status polling policy
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            spin_polls: self.spin_polls,
            interval_us: self.poll_interval_us,
        }
    }

    /// Parse a configuration from TOML
    #[cfg(feature = "std")]
    pub fn from_toml(s: &str) -> core::result::Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
