//! Emulated JEDEC SPI NOR chip
//!
//! The chip collects MOSI bytes for the duration of one chip-select window.
//! Reads are answered while the window is open; program, erase and status
//! writes execute when chip select is released, as on real parts.

use std::fs;
use std::path::Path;

use spinor_core::chip::{ChipDescriptor, KnownChip};
use spinor_core::spi::{opcodes, Status};

use crate::bus::Violation;
use crate::error::EmuError;

/// How a page program changes the array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramMode {
    /// NOR semantics: programming only clears bits
    AndMask,
    /// Page-write parts: programmed bytes replace the array contents
    Overwrite,
}

/// Static description of an emulated part
#[derive(Debug, Clone)]
pub struct ChipModel {
    /// Bytes answered to RDID, continuation codes included
    pub jedec_id: Vec<u8>,
    /// Geometry and command set
    pub descriptor: ChipDescriptor,
    /// Program semantics
    pub program_mode: ProgramMode,
    /// Status samples reporting busy after a page program
    pub program_busy: u32,
    /// Status samples reporting busy after a sector or block erase
    pub erase_busy: u32,
    /// Status samples reporting busy after a chip erase
    pub chip_erase_busy: u32,
    /// Status samples reporting busy after a status register write
    pub status_write_busy: u32,
}

impl ChipModel {
    /// Model for a part answering `jedec_id` to RDID
    ///
    /// Parts without a sector erase command are page-write parts and use
    /// [`ProgramMode::Overwrite`].
    pub fn new(descriptor: ChipDescriptor, jedec_id: &[u8]) -> Self {
        let program_mode = if descriptor.has_sector_erase() {
            ProgramMode::AndMask
        } else {
            ProgramMode::Overwrite
        };
        Self {
            jedec_id: jedec_id.to_vec(),
            descriptor,
            program_mode,
            program_busy: 2,
            erase_busy: 4,
            chip_erase_busy: 8,
            status_write_busy: 1,
        }
    }

    /// Model for a built-in part
    pub fn from_known(chip: &KnownChip) -> Self {
        let [hi, lo] = chip.jedec_device.to_be_bytes();
        Self::new(chip.descriptor, &[chip.jedec_manufacturer, hi, lo])
    }

    /// Replace the RDID answer
    pub fn with_jedec_id(mut self, id: &[u8]) -> Self {
        self.jedec_id = id.to_vec();
        self
    }

    /// Set how many status samples each kind of operation stays busy for
    pub fn with_busy(mut self, program: u32, erase: u32, chip_erase: u32) -> Self {
        self.program_busy = program;
        self.erase_busy = erase;
        self.chip_erase_busy = chip_erase;
        self
    }
}

/// Flash array plus command state of one emulated part
#[derive(Debug, Clone)]
pub struct EmulatedChip {
    model: ChipModel,
    data: Vec<u8>,
    status: Status,
    busy_polls: u32,
    aai_active: bool,
    mosi: Vec<u8>,
    miso_pos: usize,
}

impl EmulatedChip {
    /// Create an erased chip
    pub fn new(model: ChipModel) -> Self {
        let size = model.descriptor.capacity() as usize;
        Self {
            model,
            data: vec![opcodes::ERASED; size],
            status: Status::empty(),
            busy_polls: 0,
            aai_active: false,
            mosi: Vec::new(),
            miso_pos: 0,
        }
    }

    /// Create a chip holding `image`
    pub fn with_data(model: ChipModel, image: &[u8]) -> Result<Self, EmuError> {
        let mut chip = Self::new(model);
        if image.len() != chip.data.len() {
            return Err(EmuError::ImageSize {
                expected: chip.data.len(),
                actual: image.len(),
            });
        }
        chip.data.copy_from_slice(image);
        Ok(chip)
    }

    /// Load the array from an image file
    ///
    /// A missing file yields an erased chip.
    pub fn from_image(model: ChipModel, path: &Path) -> Result<Self, EmuError> {
        match fs::read(path) {
            Ok(image) => Self::with_data(model, &image),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("{} does not exist, starting erased", path.display());
                Ok(Self::new(model))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the array to an image file
    pub fn save_image(&self, path: &Path) -> Result<(), EmuError> {
        fs::write(path, &self.data)?;
        Ok(())
    }

    /// The chip model
    pub fn model(&self) -> &ChipModel {
        &self.model
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Status register as the next RDSR sample would report it
    pub fn status(&self) -> Status {
        let mut status = self.status;
        status.set(Status::WIP, self.busy_polls > 0);
        status
    }

    /// Returns true while an AAI sequence is open
    pub fn aai_active(&self) -> bool {
        self.aai_active
    }

    fn address_len(&self) -> usize {
        self.model.descriptor.address_width.bytes() as usize
    }

    fn address(&self) -> Option<usize> {
        let n = self.address_len();
        let bytes = self.mosi.get(1..1 + n)?;
        let addr = bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize);
        Some(addr % self.data.len())
    }

    pub(crate) fn begin(&mut self) {
        self.mosi.clear();
        self.miso_pos = 0;
    }

    /// Accept MOSI bytes, checking the opcode when it arrives
    pub(crate) fn shift_in(&mut self, bytes: &[u8], cs: usize) -> Option<Violation> {
        let violation = match (self.mosi.is_empty(), bytes.first()) {
            (true, Some(&opcode)) => self.check_opcode(opcode, cs),
            _ => None,
        };
        self.mosi.extend_from_slice(bytes);
        violation
    }

    fn check_opcode(&self, opcode: u8, cs: usize) -> Option<Violation> {
        if opcode == opcodes::RDSR {
            return None;
        }
        if self.busy_polls > 0 {
            return Some(Violation::CommandWhileBusy { cs, opcode });
        }
        if self.aai_active && opcode != opcodes::AAI_WP && opcode != opcodes::WRDI {
            return Some(Violation::AaiNotTerminated { cs, opcode });
        }
        None
    }

    /// Produce MISO bytes for the current command
    pub(crate) fn shift_out(&mut self, buf: &mut [u8], cs: usize) -> Option<Violation> {
        let mut violation = None;
        match self.mosi.first().copied() {
            Some(opcodes::RDSR) => {
                for b in buf.iter_mut() {
                    *b = self.status().bits();
                    self.busy_polls = self.busy_polls.saturating_sub(1);
                }
            }
            Some(opcodes::RDID) => {
                for (i, b) in buf.iter_mut().enumerate() {
                    *b = self
                        .model
                        .jedec_id
                        .get(self.miso_pos + i)
                        .copied()
                        .unwrap_or(0xFF);
                }
            }
            Some(opcodes::FAST_READ) => {
                if self.mosi.len() < 2 + self.address_len() {
                    violation = Some(Violation::TruncatedCommand {
                        cs,
                        opcode: opcodes::FAST_READ,
                    });
                    buf.fill(0xFF);
                } else if let Some(addr) = self.address() {
                    let start = addr + self.miso_pos;
                    for (i, b) in buf.iter_mut().enumerate() {
                        *b = self.data[(start + i) % self.data.len()];
                    }
                }
            }
            _ => buf.fill(0xFF),
        }
        self.miso_pos += buf.len();
        violation
    }

    /// Chip select released: execute the collected command
    pub(crate) fn end(&mut self, cs: usize) -> Option<Violation> {
        let Some(&opcode) = self.mosi.first() else {
            return None;
        };
        let d = self.model.descriptor;
        match opcode {
            opcodes::RDSR | opcodes::RDID | opcodes::FAST_READ => None,
            opcodes::WREN => {
                self.status.insert(Status::WEL);
                None
            }
            opcodes::WRDI => {
                self.status.remove(Status::WEL);
                self.aai_active = false;
                None
            }
            opcodes::WRSR => self.write_status(cs),
            op if op == d.opcode_page_program => self.program(cs, op),
            op if d.has_sector_erase() && op == d.opcode_sector_erase => {
                self.erase_at(cs, op, d.sector_size)
            }
            op if d.has_block_erase() && op == d.opcode_block_erase => {
                self.erase_at(cs, op, d.block_size)
            }
            op if d.has_chip_erase() && op == d.opcode_chip_erase => self.chip_erase(cs, op),
            _ => Some(Violation::UnsupportedOpcode { cs, opcode }),
        }
    }

    fn take_write_enable(&mut self, cs: usize, opcode: u8) -> Result<(), Violation> {
        if !self.status.contains(Status::WEL) {
            return Err(Violation::WriteNotEnabled { cs, opcode });
        }
        self.status.remove(Status::WEL);
        Ok(())
    }

    fn write_status(&mut self, cs: usize) -> Option<Violation> {
        if let Err(v) = self.take_write_enable(cs, opcodes::WRSR) {
            return Some(v);
        }
        let Some(&value) = self.mosi.get(1) else {
            return Some(Violation::TruncatedCommand {
                cs,
                opcode: opcodes::WRSR,
            });
        };
        let writable = Status::BP | Status::SRWD;
        self.status = (self.status - writable) | (Status::from_raw(value) & writable);
        self.busy_polls = self.model.status_write_busy;
        None
    }

    fn program(&mut self, cs: usize, opcode: u8) -> Option<Violation> {
        let aai = opcode == opcodes::AAI_WP;
        // AAI keeps the write enable latch until WRDI
        if aai && self.aai_active {
            if !self.status.contains(Status::WEL) {
                return Some(Violation::WriteNotEnabled { cs, opcode });
            }
        } else if let Err(v) = self.take_write_enable(cs, opcode) {
            return Some(v);
        }
        if aai {
            self.status.insert(Status::WEL);
            self.aai_active = true;
        }
        let Some(addr) = self.address() else {
            return Some(Violation::TruncatedCommand { cs, opcode });
        };
        self.busy_polls = self.model.program_busy;
        if self.status.is_protected() {
            log::debug!("program at 0x{:X} ignored: array protected", addr);
            return None;
        }

        let page = self.model.descriptor.page_size as usize;
        let base = addr - addr % page;
        let payload = &self.mosi[1 + self.address_len()..];
        for (i, &byte) in payload.iter().enumerate() {
            // the page address counter wraps within the page
            let index = base + (addr % page + i) % page;
            match self.model.program_mode {
                ProgramMode::AndMask => self.data[index] &= byte,
                ProgramMode::Overwrite => self.data[index] = byte,
            }
        }
        None
    }

    fn erase_at(&mut self, cs: usize, opcode: u8, size: u32) -> Option<Violation> {
        if let Err(v) = self.take_write_enable(cs, opcode) {
            return Some(v);
        }
        let Some(addr) = self.address() else {
            return Some(Violation::TruncatedCommand { cs, opcode });
        };
        self.busy_polls = self.model.erase_busy;
        if self.status.is_protected() {
            log::debug!("erase at 0x{:X} ignored: array protected", addr);
            return None;
        }
        let size = size as usize;
        let base = addr - addr % size;
        self.data[base..base + size].fill(opcodes::ERASED);
        None
    }

    fn chip_erase(&mut self, cs: usize, opcode: u8) -> Option<Violation> {
        if let Err(v) = self.take_write_enable(cs, opcode) {
            return Some(v);
        }
        self.busy_polls = self.model.chip_erase_busy;
        if self.status.is_protected() {
            log::debug!("chip erase ignored: array protected");
            return None;
        }
        self.data.fill(opcodes::ERASED);
        None
    }
}
