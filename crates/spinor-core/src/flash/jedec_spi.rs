//! Generic JEDEC SPI NOR driver

use super::async_erase::EraseCursor;
use super::config::DriverConfig;
use super::device::{DeviceInfo, NvmDevice};
use super::plan;
use super::state::DeviceState;
use crate::chip::ChipDescriptor;
use crate::error::{Error, Result};
use crate::protocol;
use crate::spi::opcodes;
use crate::transport::BusTransport;

/// JEDEC SPI NOR flash driver
///
/// One instance drives one chip through its bus handle. Every operation
/// takes the bus lock for its whole duration, so several instances may
/// share a bus; an operation that cannot get the lock in time returns
/// [`Error::BusBusy`] and touches nothing.
///
/// Calling an operation before [`start`](Self::start) or with an address
/// range outside the chip is a programming error and panics.
///
/// A tick-driven erase keeps the bus lock across calls. Finish it with
/// [`sync`](Self::sync) or release it with
/// [`erase_cancel`](Self::erase_cancel) before dropping the driver,
/// otherwise the lock stays taken and every other user of the bus sees
/// [`Error::BusBusy`].
pub struct JedecSpiFlash<B> {
    pub(super) bus: B,
    pub(super) config: DriverConfig,
    pub(super) chip: Option<ChipDescriptor>,
    pub(super) state: DeviceState,
    pub(super) cursor: Option<EraseCursor>,
}

impl<B: BusTransport> JedecSpiFlash<B> {
    /// Create a driver in the `Uninitialized` state
    pub fn new(bus: B, config: DriverConfig) -> Self {
        Self {
            bus,
            config,
            chip: None,
            state: DeviceState::Uninitialized,
            cursor: None,
        }
    }

    /// Current state
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Descriptor in use, if started
    pub fn chip(&self) -> Option<&ChipDescriptor> {
        self.chip.as_ref()
    }

    /// Driver configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Borrow the bus handle
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutably borrow the bus handle
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give back the bus handle
    ///
    /// # Panics
    /// If a tick-driven erase still holds the bus lock.
    pub fn into_bus(self) -> B {
        assert!(
            self.cursor.is_none(),
            "into_bus: async erase in progress"
        );
        self.bus
    }

    /// Start the driver with `chip`
    ///
    /// Allowed from `Uninitialized`, `Stopped` and `Ready`. For AAI parts a
    /// possibly interrupted AAI sequence is closed first, which needs the
    /// bus lock; on lock timeout the driver stays in its previous state.
    ///
    /// # Panics
    /// If the state does not allow starting or the geometry is invalid.
    pub fn start(&mut self, chip: ChipDescriptor) -> Result<()> {
        assert!(
            matches!(
                self.state,
                DeviceState::Uninitialized | DeviceState::Stopped | DeviceState::Ready
            ),
            "start: invalid state {}",
            self.state
        );
        if let Err(e) = chip.validate() {
            panic!("start: invalid chip geometry: {}", e);
        }

        if chip.uses_aai() {
            if !self.bus.lock(self.config.lock_timeout()) {
                return Err(Error::BusBusy);
            }
            let result = protocol::terminate_aai(&mut self.bus, self.config.poll_policy());
            self.bus.unlock();
            result?;
        }

        log::debug!(
            "flash started: {} x {} bytes, page {} (align {})",
            chip.sector_count,
            chip.sector_size,
            chip.page_size,
            chip.page_alignment
        );
        self.chip = Some(chip);
        self.state = DeviceState::Ready;
        Ok(())
    }

    /// Stop the driver
    ///
    /// # Panics
    /// Unless the driver is `Stopped` or `Ready`.
    pub fn stop(&mut self) {
        assert!(
            matches!(self.state, DeviceState::Stopped | DeviceState::Ready),
            "stop: invalid state {}",
            self.state
        );
        self.chip = None;
        self.state = DeviceState::Stopped;
    }

    pub(super) fn started_chip(&self, op: &str) -> ChipDescriptor {
        match (self.state.is_started(), self.chip) {
            (true, Some(chip)) => chip,
            _ => panic!("{}: driver not started (state {})", op, self.state),
        }
    }

    /// Take the bus lock, run `f` in `state`, then restore `Ready` and unlock
    fn locked<T, F>(&mut self, state: DeviceState, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        if !self.bus.lock(self.config.lock_timeout()) {
            log::debug!("bus lock timed out");
            return Err(Error::BusBusy);
        }
        let result = self.settle().and_then(|_| {
            self.state = state;
            f(self)
        });
        self.state = DeviceState::Ready;
        self.bus.unlock();
        result
    }

    /// Read `buf.len()` bytes starting at `addr`
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        let chip = self.started_chip("read");
        assert!(
            chip.contains_range(addr, buf.len() as u64),
            "read: 0x{:X}+{} exceeds capacity 0x{:X}",
            addr,
            buf.len(),
            chip.capacity()
        );
        if buf.is_empty() {
            return Ok(());
        }
        log::trace!("read 0x{:X}+{}", addr, buf.len());
        self.locked(DeviceState::Reading, |dev| {
            protocol::fast_read(&mut dev.bus, chip.address_width, addr, buf)
        })
    }

    /// Program `data` starting at `addr`
    ///
    /// The request is split at page boundaries. Each chunk is widened to the
    /// chip's program alignment with 0xFF padding, which leaves the padded
    /// bytes unchanged only if they were erased. A zero-length write returns
    /// immediately without touching the bus.
    ///
    /// A transfer failure aborts the write: chunks already programmed stay
    /// programmed and the failing chunk is undefined. Nothing is retried.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let chip = self.started_chip("write");
        if data.is_empty() {
            return Ok(());
        }
        assert!(
            chip.contains_range(addr, data.len() as u64),
            "write: 0x{:X}+{} exceeds capacity 0x{:X}",
            addr,
            data.len(),
            chip.capacity()
        );
        log::debug!("write 0x{:X}+{}", addr, data.len());
        self.locked(DeviceState::Writing, |dev| {
            let policy = dev.config.poll_policy();
            let mut committed = 0usize;
            for chunk in plan::page_chunks(addr, data.len(), chip.page_size) {
                let (pre, post) = plan::padding(chunk.address, chunk.len, chip.page_alignment);
                log::trace!(
                    "program 0x{:X}+{} (pad {}/{})",
                    chunk.address,
                    chunk.len,
                    pre,
                    post
                );
                let bytes = &data[chunk.offset..chunk.offset + chunk.len];
                if let Err(e) = dev.program_chunk(&chip, chunk.address, bytes, pre, post) {
                    log::warn!(
                        "write aborted at 0x{:X}: {} of {} bytes committed: {}",
                        chunk.address,
                        committed,
                        data.len(),
                        e
                    );
                    return Err(e);
                }
                committed += chunk.len;
            }
            protocol::wait_until_ready(&mut dev.bus, policy)
        })
    }

    fn program_chunk(
        &mut self,
        chip: &ChipDescriptor,
        addr: u32,
        bytes: &[u8],
        pre: u32,
        post: u32,
    ) -> Result<()> {
        let policy = self.config.poll_policy();
        protocol::wait_until_ready(&mut self.bus, policy)?;
        protocol::write_enable(&mut self.bus)?;
        protocol::page_program(&mut self.bus, chip, policy, addr, bytes, pre, post)
    }

    /// Erase every sector touched by `[addr, addr + len]`
    ///
    /// The range is widened down to the sector containing `addr` and up to
    /// the sector containing `addr + len`, so up to one extra sector may be
    /// erased past the end even when `addr + len` is sector aligned. Parts
    /// without a sector erase command are erased by programming 0xFF into
    /// every page. A zero length is a no-op.
    pub fn erase(&mut self, addr: u32, len: u32) -> Result<()> {
        let chip = self.started_chip("erase");
        if len == 0 {
            return Ok(());
        }
        assert!(
            chip.contains_range(addr, len as u64),
            "erase: 0x{:X}+{} exceeds capacity 0x{:X}",
            addr,
            len,
            chip.capacity()
        );
        self.locked(DeviceState::Erasing, |dev| {
            dev.erase_locked(&chip, addr as u64, len as u64)
        })
    }

    fn erase_locked(&mut self, chip: &ChipDescriptor, addr: u64, len: u64) -> Result<()> {
        log::debug!("erase 0x{:X}+{}", addr, len);
        for sector in plan::covered_sectors(addr, len, chip.sector_size, chip.capacity()) {
            if let Err(e) = self.erase_sector(chip, sector) {
                log::warn!("erase aborted at sector 0x{:X}: {}", sector, e);
                return Err(e);
            }
        }
        protocol::wait_until_ready(&mut self.bus, self.config.poll_policy())
    }

    fn erase_sector(&mut self, chip: &ChipDescriptor, sector: u32) -> Result<()> {
        let policy = self.config.poll_policy();
        if chip.has_sector_erase() {
            log::trace!("sector erase 0x{:X}", sector);
            protocol::wait_until_ready(&mut self.bus, policy)?;
            return protocol::erase_command(
                &mut self.bus,
                chip.opcode_sector_erase,
                chip.address_width,
                sector,
            );
        }

        log::trace!("emulated erase 0x{:X}", sector);
        let mut page = sector;
        let end = sector as u64 + chip.sector_size as u64;
        while (page as u64) < end {
            protocol::wait_until_ready(&mut self.bus, policy)?;
            protocol::write_enable(&mut self.bus)?;
            protocol::program_fill(&mut self.bus, chip, policy, page, chip.page_size)?;
            page = page.wrapping_add(chip.page_size);
            if page == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Erase the block containing `addr` with the block erase command
    ///
    /// Parts without block erase fall back to erasing the sector containing
    /// `addr`.
    pub fn erase_block(&mut self, addr: u32) -> Result<()> {
        let chip = self.started_chip("erase_block");
        assert!(
            (addr as u64) < chip.capacity(),
            "erase_block: 0x{:X} exceeds capacity 0x{:X}",
            addr,
            chip.capacity()
        );
        self.locked(DeviceState::Erasing, |dev| {
            let policy = dev.config.poll_policy();
            if chip.has_block_erase() {
                let block = addr - addr % chip.block_size;
                log::debug!("block erase 0x{:X}", block);
                protocol::wait_until_ready(&mut dev.bus, policy)?;
                protocol::erase_command(
                    &mut dev.bus,
                    chip.opcode_block_erase,
                    chip.address_width,
                    block,
                )?;
            } else {
                dev.erase_sector(&chip, addr - addr % chip.sector_size)?;
            }
            protocol::wait_until_ready(&mut dev.bus, policy)
        })
    }

    /// Erase the whole chip
    ///
    /// Uses the chip erase command when the part has one, otherwise erases
    /// every sector.
    pub fn mass_erase(&mut self) -> Result<()> {
        let chip = self.started_chip("mass_erase");
        self.locked(DeviceState::Erasing, |dev| {
            if !chip.has_chip_erase() {
                return dev.erase_locked(&chip, 0, chip.capacity());
            }
            log::debug!("chip erase");
            let policy = dev.config.poll_policy();
            protocol::wait_until_ready(&mut dev.bus, policy)?;
            protocol::chip_erase(&mut dev.bus, chip.opcode_chip_erase)?;
            protocol::wait_until_ready(&mut dev.bus, policy)
        })
    }

    /// Wait for any outstanding operation to complete
    ///
    /// A no-op when `Ready`. With an async erase in flight, the remaining
    /// erase is driven to completion here.
    pub fn sync(&mut self) -> Result<()> {
        self.started_chip("sync");
        self.settle()
    }

    fn settle(&mut self) -> Result<()> {
        if self.cursor.is_some() {
            return self.drain_erase();
        }
        if self.state != DeviceState::Ready {
            protocol::wait_until_ready(&mut self.bus, self.config.poll_policy())?;
            self.state = DeviceState::Ready;
        }
        Ok(())
    }

    /// Read the JEDEC ID and report it with the geometry in use
    pub fn get_info(&mut self) -> Result<DeviceInfo> {
        let chip = self.started_chip("get_info");
        let id = self.locked(DeviceState::Reading, |dev| protocol::read_id(&mut dev.bus))?;
        log::debug!("JEDEC ID {:02X?} (bank {})", id.bytes, id.bank);
        Ok(DeviceInfo {
            sector_count: chip.sector_count,
            sector_size: chip.sector_size,
            identification: id.bytes,
            manufacturer_bank: id.bank,
        })
    }

    /// Set all block protection bits
    pub fn write_protect(&mut self) -> Result<()> {
        self.write_status("write_protect", opcodes::SR_PROTECT_ALL)
    }

    /// Clear all block protection bits
    pub fn write_unprotect(&mut self) -> Result<()> {
        self.write_status("write_unprotect", opcodes::SR_UNPROTECT_ALL)
    }

    fn write_status(&mut self, op: &str, value: u8) -> Result<()> {
        self.started_chip(op);
        log::debug!("{}: status 0x{:02X}", op, value);
        self.locked(DeviceState::Writing, |dev| {
            let policy = dev.config.poll_policy();
            protocol::wait_until_ready(&mut dev.bus, policy)?;
            protocol::write_status(&mut dev.bus, policy, value)
        })
    }
}

impl<B: BusTransport> NvmDevice for JedecSpiFlash<B> {
    fn capacity(&self) -> u64 {
        self.started_chip("capacity").capacity()
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        JedecSpiFlash::read(self, addr, buf)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        JedecSpiFlash::write(self, addr, data)
    }

    fn erase(&mut self, addr: u32, len: u32) -> Result<()> {
        JedecSpiFlash::erase(self, addr, len)
    }

    fn mass_erase(&mut self) -> Result<()> {
        JedecSpiFlash::mass_erase(self)
    }

    fn sync(&mut self) -> Result<()> {
        JedecSpiFlash::sync(self)
    }

    fn get_info(&mut self) -> Result<DeviceInfo> {
        JedecSpiFlash::get_info(self)
    }

    fn write_protect(&mut self) -> Result<()> {
        JedecSpiFlash::write_protect(self)
    }

    fn write_unprotect(&mut self) -> Result<()> {
        JedecSpiFlash::write_unprotect(self)
    }
}
