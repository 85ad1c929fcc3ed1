//! Shared, lockable SPI bus
//!
//! Any number of [`BusHandle`]s can be taken from one [`SharedBus`]. Each
//! handle addresses one chip select and has its own identity for the bus
//! lock. Protocol misuse is not an error at the transport level; it is
//! recorded as a [`Violation`] for tests to inspect.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use spinor_core::error::{Error, Result};
use spinor_core::transport::BusTransport;

use crate::chip::EmulatedChip;
use crate::error::EmuError;

/// Bus protocol misuse observed by the emulator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// A handle used the bus without holding the lock
    #[error("handle {handle} accessed the bus without holding the lock")]
    NotLockHolder {
        /// Offending handle
        handle: u64,
    },
    /// A handle released a lock it did not hold
    #[error("handle {handle} unlocked without holding the lock")]
    UnlockWithoutLock {
        /// Offending handle
        handle: u64,
    },
    /// A chip was selected while another select was active
    #[error("chip select {cs} asserted while another chip is selected")]
    InterleavedSelect {
        /// Chip select asserted second
        cs: usize,
    },
    /// Transfer on a handle whose chip is not selected
    #[error("transfer on chip select {cs} without select")]
    NotSelected {
        /// Chip select
        cs: usize,
    },
    /// A command other than RDSR reached a busy chip
    #[error("opcode 0x{opcode:02X} sent to busy chip {cs}")]
    CommandWhileBusy {
        /// Chip select
        cs: usize,
        /// Opcode
        opcode: u8,
    },
    /// A command arrived before an AAI sequence was closed
    #[error("opcode 0x{opcode:02X} sent to chip {cs} during an open AAI sequence")]
    AaiNotTerminated {
        /// Chip select
        cs: usize,
        /// Opcode
        opcode: u8,
    },
    /// Program, erase or status write without write enable
    #[error("opcode 0x{opcode:02X} on chip {cs} without write enable")]
    WriteNotEnabled {
        /// Chip select
        cs: usize,
        /// Opcode
        opcode: u8,
    },
    /// Opcode the chip does not implement
    #[error("opcode 0x{opcode:02X} not supported by chip {cs}")]
    UnsupportedOpcode {
        /// Chip select
        cs: usize,
        /// Opcode
        opcode: u8,
    },
    /// Command shorter than its address phase
    #[error("opcode 0x{opcode:02X} on chip {cs} is missing address bytes")]
    TruncatedCommand {
        /// Chip select
        cs: usize,
        /// Opcode
        opcode: u8,
    },
}

#[derive(Debug, Default)]
struct Wire {
    chips: Vec<EmulatedChip>,
    selected: Option<(usize, u64)>,
    violations: Vec<Violation>,
    transfers: u64,
    fail_at: Option<u64>,
    /// (handle, first MOSI byte) per chip-select window
    commands: Vec<(u64, u8)>,
    window_opened: bool,
}

impl Wire {
    fn record(&mut self, violation: Option<Violation>) {
        if let Some(v) = violation {
            log::warn!("bus violation: {}", v);
            self.violations.push(v);
        }
    }

    /// Count a transfer, failing it if a fault was injected for it
    fn transfer(&mut self) -> Result<()> {
        let n = self.transfers;
        self.transfers += 1;
        if self.fail_at == Some(n) {
            self.fail_at = None;
            log::debug!("injected transfer failure #{}", n);
            return Err(Error::SpiTransferFailed);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Inner {
    holder: Mutex<Option<u64>>,
    released: Condvar,
    wire: Mutex<Wire>,
    next_handle: AtomicU64,
}

/// Bus with any number of chips behind individual chip selects
#[derive(Debug, Clone, Default)]
pub struct SharedBus {
    inner: Arc<Inner>,
}

impl SharedBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    fn wire(&self) -> MutexGuard<'_, Wire> {
        // a panicking test thread must not hide the wire from the others
        self.inner.wire.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attach a chip, returning its chip select index
    pub fn attach(&self, chip: EmulatedChip) -> usize {
        let mut wire = self.wire();
        wire.chips.push(chip);
        wire.chips.len() - 1
    }

    /// Create a handle for chip select `cs`
    pub fn handle(&self, cs: usize) -> std::result::Result<BusHandle, EmuError> {
        if cs >= self.wire().chips.len() {
            return Err(EmuError::NoSuchChip(cs));
        }
        Ok(BusHandle {
            bus: self.clone(),
            cs,
            id: self.inner.next_handle.fetch_add(1, Ordering::Relaxed),
        })
    }

    /// Run `f` on the chip at `cs`
    pub fn with_chip<T>(&self, cs: usize, f: impl FnOnce(&mut EmulatedChip) -> T) -> Option<T> {
        self.wire().chips.get_mut(cs).map(f)
    }

    /// Copy of the array of the chip at `cs`
    pub fn chip_data(&self, cs: usize) -> Option<Vec<u8>> {
        self.with_chip(cs, |chip| chip.data().to_vec())
    }

    /// Violations recorded so far
    pub fn violations(&self) -> Vec<Violation> {
        self.wire().violations.clone()
    }

    /// Number of transmit and receive calls so far
    pub fn transfer_count(&self) -> u64 {
        self.wire().transfers
    }

    /// Make the `n`-th transfer from now fail once (0 is the next one)
    pub fn fail_transfer_in(&self, n: u64) {
        let mut wire = self.wire();
        wire.fail_at = Some(wire.transfers + n);
    }

    /// Handle and opcode of every chip-select window so far
    pub fn commands(&self) -> Vec<(u64, u8)> {
        self.wire().commands.clone()
    }

    /// Current lock holder
    pub fn lock_holder(&self) -> Option<u64> {
        *self.inner.holder.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One chip select on a [`SharedBus`]
#[derive(Debug, Clone)]
pub struct BusHandle {
    bus: SharedBus,
    cs: usize,
    id: u64,
}

impl BusHandle {
    /// Lock identity of this handle
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Chip select index
    pub fn cs(&self) -> usize {
        self.cs
    }

    /// The bus this handle belongs to
    pub fn bus(&self) -> &SharedBus {
        &self.bus
    }

    fn holds_lock(&self) -> bool {
        self.bus.lock_holder() == Some(self.id)
    }

    /// Check ownership of the current select window
    fn check_access(&self, wire: &mut Wire) {
        if !self.holds_lock() {
            wire.record(Some(Violation::NotLockHolder { handle: self.id }));
        }
        if wire.selected != Some((self.cs, self.id)) {
            wire.record(Some(Violation::NotSelected { cs: self.cs }));
        }
    }
}

impl BusTransport for BusHandle {
    fn select(&mut self) -> Result<()> {
        let mut wire = self.bus.wire();
        if !self.holds_lock() {
            wire.record(Some(Violation::NotLockHolder { handle: self.id }));
        }
        if wire.selected.is_some() {
            wire.record(Some(Violation::InterleavedSelect { cs: self.cs }));
        }
        wire.selected = Some((self.cs, self.id));
        wire.window_opened = true;
        wire.chips[self.cs].begin();
        Ok(())
    }

    fn deselect(&mut self) -> Result<()> {
        let mut wire = self.bus.wire();
        if wire.selected == Some((self.cs, self.id)) {
            wire.selected = None;
        }
        let v = wire.chips[self.cs].end(self.cs);
        wire.record(v);
        Ok(())
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<()> {
        let mut wire = self.bus.wire();
        wire.transfer()?;
        self.check_access(&mut wire);
        if wire.window_opened {
            if let Some(&opcode) = bytes.first() {
                wire.window_opened = false;
                wire.commands.push((self.id, opcode));
            }
        }
        let v = wire.chips[self.cs].shift_in(bytes, self.cs);
        wire.record(v);
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut wire = self.bus.wire();
        wire.transfer()?;
        self.check_access(&mut wire);
        let v = wire.chips[self.cs].shift_out(buf, self.cs);
        wire.record(v);
        Ok(())
    }

    fn lock(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut holder = self.bus.inner.holder.lock().unwrap_or_else(|e| e.into_inner());
        while holder.is_some() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            holder = match self.bus.inner.released.wait_timeout(holder, deadline - now) {
                Ok((guard, _)) => guard,
                Err(e) => e.into_inner().0,
            };
        }
        *holder = Some(self.id);
        true
    }

    fn unlock(&mut self) {
        let mut holder = self.bus.inner.holder.lock().unwrap_or_else(|e| e.into_inner());
        if *holder != Some(self.id) {
            drop(holder);
            self.bus
                .wire()
                .record(Some(Violation::UnlockWithoutLock { handle: self.id }));
            return;
        }
        *holder = None;
        self.bus.inner.released.notify_all();
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(us as u64));
    }
}
