//! Tick-driven erase
//!
//! `erase_begin` takes the bus lock and leaves it held; each `erase_tick`
//! then does a bounded amount of work. Other users of the bus observe
//! [`Error::BusBusy`] until the final tick releases the lock.

use super::jedec_spi::JedecSpiFlash;
use super::state::DeviceState;
use crate::chip::ChipDescriptor;
use crate::error::{Error, Result};
use crate::protocol;
use crate::transport::BusTransport;

/// Progress of a tick-driven erase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseStatus {
    /// Work remains, call `erase_tick` again later
    InProgress,
    /// The whole range is erased and the bus lock released
    Finished,
}

/// Position of a tick-driven erase, owned by the driver instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseCursor {
    /// Next erase unit to issue
    pub current: u64,
    /// Last address to cover (inclusive)
    pub end: u64,
}

/// Command issued per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EraseUnit {
    Block { opcode: u8, size: u32 },
    Sector { opcode: u8, size: u32 },
    Page { size: u32 },
}

impl EraseUnit {
    fn for_chip(chip: &ChipDescriptor) -> Self {
        if chip.has_block_erase() {
            Self::Block {
                opcode: chip.opcode_block_erase,
                size: chip.block_size,
            }
        } else if chip.has_sector_erase() {
            Self::Sector {
                opcode: chip.opcode_sector_erase,
                size: chip.sector_size,
            }
        } else {
            Self::Page {
                size: chip.page_size,
            }
        }
    }

    fn size(&self) -> u32 {
        match *self {
            Self::Block { size, .. } | Self::Sector { size, .. } | Self::Page { size } => size,
        }
    }
}

impl<B: BusTransport> JedecSpiFlash<B> {
    /// Start erasing `[start, end]` (inclusive) without blocking
    ///
    /// The cursor is aligned down to the erase unit: 64 KiB blocks where the
    /// part supports them, otherwise sectors, otherwise single pages
    /// programmed with 0xFF. Returns [`Error::BusBusy`] if the bus lock is
    /// not available within the short begin timeout; the cursor is left
    /// untouched in that case.
    pub fn erase_begin(&mut self, start: u32, end: u32) -> Result<()> {
        let chip = self.started_chip("erase_begin");
        assert!(
            start <= end && (end as u64) < chip.capacity(),
            "erase_begin: 0x{:X}..=0x{:X} outside capacity 0x{:X}",
            start,
            end,
            chip.capacity()
        );
        if !self.bus.lock(self.config.begin_timeout()) {
            return Err(Error::BusBusy);
        }

        let unit = EraseUnit::for_chip(&chip).size() as u64;
        let start = start as u64;
        self.cursor = Some(EraseCursor {
            current: start - start % unit,
            end: end as u64,
        });
        self.state = DeviceState::Erasing;
        log::debug!("async erase 0x{:X}..=0x{:X} in {} byte units", start, end, unit);
        Ok(())
    }

    /// Advance the erase started by [`erase_begin`](Self::erase_begin)
    ///
    /// Samples the status register once. While the chip is busy this returns
    /// `InProgress` without further work; otherwise it issues the next erase
    /// command, or releases the bus and returns `Finished` once the range is
    /// covered. A transfer failure ends the erase and releases the bus.
    ///
    /// # Panics
    /// If no erase is in progress.
    pub fn erase_tick(&mut self) -> Result<EraseStatus> {
        let mut cursor = match self.cursor {
            Some(cursor) => cursor,
            None => panic!("erase_tick: no erase in progress"),
        };
        let chip = self.started_chip("erase_tick");

        let status = match protocol::read_status(&mut self.bus) {
            Ok(status) => status,
            Err(e) => return Err(self.abort_erase(e)),
        };
        if status.is_busy() {
            return Ok(EraseStatus::InProgress);
        }
        if cursor.current > cursor.end {
            self.finish_erase();
            log::debug!("async erase finished");
            return Ok(EraseStatus::Finished);
        }

        let unit = EraseUnit::for_chip(&chip);
        let address = cursor.current as u32;
        log::trace!("async erase step 0x{:X}", address);
        let result = match unit {
            EraseUnit::Block { opcode, .. } | EraseUnit::Sector { opcode, .. } => {
                protocol::erase_command(&mut self.bus, opcode, chip.address_width, address)
            }
            EraseUnit::Page { size } => {
                let policy = self.config.poll_policy();
                protocol::write_enable(&mut self.bus).and_then(|_| {
                    protocol::program_fill(&mut self.bus, &chip, policy, address, size)
                })
            }
        };
        if let Err(e) = result {
            return Err(self.abort_erase(e));
        }

        cursor.current += unit.size() as u64;
        self.cursor = Some(cursor);
        Ok(EraseStatus::InProgress)
    }

    /// Abandon the erase in progress and release the bus lock
    ///
    /// Waits for the erase command already on the chip, so the bus is handed
    /// over with the chip idle. Units not yet issued keep their contents.
    /// Returns `Ok(false)` if no erase was in progress.
    pub fn erase_cancel(&mut self) -> Result<bool> {
        let Some(cursor) = self.cursor else {
            return Ok(false);
        };
        log::debug!("async erase cancelled at 0x{:X}", cursor.current);
        let result = protocol::wait_until_ready(&mut self.bus, self.config.poll_policy());
        self.finish_erase();
        result.map(|_| true)
    }

    /// Position of the erase in progress, if any
    pub fn erase_cursor(&self) -> Option<&EraseCursor> {
        self.cursor.as_ref()
    }

    /// Tick until the current erase finishes
    pub(super) fn drain_erase(&mut self) -> Result<()> {
        loop {
            match self.erase_tick()? {
                EraseStatus::Finished => return Ok(()),
                EraseStatus::InProgress => {
                    if self.config.poll_interval_us > 0 {
                        self.bus.delay_us(self.config.poll_interval_us);
                    }
                }
            }
        }
    }

    fn finish_erase(&mut self) {
        self.cursor = None;
        self.state = DeviceState::Ready;
        self.bus.unlock();
    }

    fn abort_erase(&mut self, e: Error) -> Error {
        log::warn!("async erase aborted: {}", e);
        self.finish_erase();
        e
    }
}
