//! Storage device capability trait

use crate::error::Result;

/// Identification and geometry snapshot returned by `get_info`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Number of erase sectors
    pub sector_count: u32,
    /// Sector size in bytes
    pub sector_size: u32,
    /// JEDEC manufacturer, memory type and capacity bytes
    pub identification: [u8; 3],
    /// Continuation codes that preceded the manufacturer byte
    pub manufacturer_bank: u8,
}

impl DeviceInfo {
    /// Total capacity in bytes
    pub fn capacity(&self) -> u64 {
        self.sector_count as u64 * self.sector_size as u64
    }
}

/// Raw NOR storage device
///
/// Anything that can read, program and erase flash over a bus satisfies
/// this role. Callers above the driver depend on this trait, not on a
/// concrete chip type.
///
/// # Example
///
/// ```ignore
/// use spinor_core::flash::NvmDevice;
///
/// fn replace<D: NvmDevice>(dev: &mut D, addr: u32, data: &[u8]) -> spinor_core::Result<()> {
///     dev.erase(addr, data.len() as u32)?;
///     dev.write(addr, data)?;
///     dev.sync()
/// }
/// ```
pub trait NvmDevice {
    /// Total capacity in bytes
    fn capacity(&self) -> u64;

    /// Read flash contents into `buf`
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Program `data` at `addr`
    ///
    /// Programming only clears bits; the target should be erased first.
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Erase every sector touched by `[addr, addr + len]`
    fn erase(&mut self, addr: u32, len: u32) -> Result<()>;

    /// Erase the whole chip
    fn mass_erase(&mut self) -> Result<()>;

    /// Wait for outstanding operations to finish
    fn sync(&mut self) -> Result<()>;

    /// Read identification and geometry
    fn get_info(&mut self) -> Result<DeviceInfo>;

    /// Set all block protection bits
    fn write_protect(&mut self) -> Result<()>;

    /// Clear all block protection bits
    fn write_unprotect(&mut self) -> Result<()>;

    /// Check if a range is valid for this device
    fn is_valid_range(&self, addr: u32, len: u64) -> bool {
        addr as u64 + len <= self.capacity()
    }
}
