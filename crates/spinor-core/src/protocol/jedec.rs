//! JEDEC SPI NOR command sequences
//!
//! Every function here drives complete chip-select windows on a bus the
//! caller has already locked. None of them take or release the bus lock.

use crate::chip::ChipDescriptor;
use crate::error::{Error, Result};
use crate::spi::{opcodes, AddressWidth, CommandFrame, Status};
use crate::transport::{transaction, BusTransport};

/// JEP106 has 16 banks, so at most 15 continuation codes precede a real ID
pub const MAX_CONTINUATION_CODES: u8 = 16;

const FILL_CHUNK: [u8; 32] = [opcodes::ERASED; 32];

/// Status polling behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Samples taken back-to-back before delaying
    pub spin_polls: u32,
    /// Delay requested between samples after the spin budget, 0 to keep spinning
    pub interval_us: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            spin_polls: 16,
            interval_us: 0,
        }
    }
}

/// JEDEC identification as read by RDID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JedecId {
    /// Continuation codes (0x7F) skipped before the manufacturer byte
    pub bank: u8,
    /// Manufacturer, memory type and capacity bytes
    pub bytes: [u8; 3],
}

impl JedecId {
    /// Manufacturer ID
    pub fn manufacturer(&self) -> u8 {
        self.bytes[0]
    }

    /// Device ID (memory type and capacity)
    pub fn device(&self) -> u16 {
        u16::from_be_bytes([self.bytes[1], self.bytes[2]])
    }
}

/// Send a single-byte command
pub fn send_opcode<B: BusTransport + ?Sized>(bus: &mut B, opcode: u8) -> Result<()> {
    transaction(bus, |bus| bus.transmit(CommandFrame::opcode(opcode).as_bytes()))
}

/// Send the Write Enable command
pub fn write_enable<B: BusTransport + ?Sized>(bus: &mut B) -> Result<()> {
    send_opcode(bus, opcodes::WREN)
}

/// Send the Write Disable command
pub fn write_disable<B: BusTransport + ?Sized>(bus: &mut B) -> Result<()> {
    send_opcode(bus, opcodes::WRDI)
}

/// Take one status register sample
pub fn read_status<B: BusTransport + ?Sized>(bus: &mut B) -> Result<Status> {
    transaction(bus, |bus| {
        bus.transmit(CommandFrame::opcode(opcodes::RDSR).as_bytes())?;
        let mut sr = [0u8; 1];
        bus.receive(&mut sr)?;
        Ok(Status::from_raw(sr[0]))
    })
}

/// Block until the write-in-progress bit clears
///
/// Sends RDSR once and keeps clocking status bytes inside the same
/// chip-select window. There is no iteration bound: a chip that never
/// clears WIP blocks the caller forever. Worst-case latency is the
/// datasheet maximum of the running program or erase operation.
pub fn wait_until_ready<B: BusTransport + ?Sized>(bus: &mut B, policy: PollPolicy) -> Result<()> {
    transaction(bus, |bus| {
        bus.transmit(CommandFrame::opcode(opcodes::RDSR).as_bytes())?;
        let mut samples: u32 = 0;
        loop {
            let mut sr = [0u8; 1];
            bus.receive(&mut sr)?;
            if !Status::from_raw(sr[0]).is_busy() {
                return Ok(());
            }
            samples = samples.saturating_add(1);
            if samples >= policy.spin_polls && policy.interval_us > 0 {
                bus.delay_us(policy.interval_us);
            }
        }
    })
}

fn transmit_fill<B: BusTransport + ?Sized>(bus: &mut B, mut count: u32) -> Result<()> {
    while count > 0 {
        let n = core::cmp::min(count as usize, FILL_CHUNK.len());
        bus.transmit(&FILL_CHUNK[..n])?;
        count -= n as u32;
    }
    Ok(())
}

/// Program one alignment-padded window
///
/// The window starts `pre_pad` bytes before `address` and is followed by
/// `post_pad` bytes; both paddings are sent as 0xFF. The window must lie
/// within a single page. Write enable must already be latched. For AAI
/// parts the sequence is closed with a busy wait and write disable.
pub fn page_program<B: BusTransport + ?Sized>(
    bus: &mut B,
    chip: &ChipDescriptor,
    policy: PollPolicy,
    address: u32,
    data: &[u8],
    pre_pad: u32,
    post_pad: u32,
) -> Result<()> {
    let frame = CommandFrame::addressed(
        chip.opcode_page_program,
        chip.address_width,
        address - pre_pad,
    );
    transaction(bus, |bus| {
        bus.transmit(frame.as_bytes())?;
        transmit_fill(bus, pre_pad)?;
        bus.transmit(data)?;
        transmit_fill(bus, post_pad)
    })?;
    if chip.uses_aai() {
        terminate_aai(bus, policy)?;
    }
    Ok(())
}

/// Program `len` bytes of 0xFF at `address` (one full page for erase emulation)
///
/// Write enable must already be latched.
pub fn program_fill<B: BusTransport + ?Sized>(
    bus: &mut B,
    chip: &ChipDescriptor,
    policy: PollPolicy,
    address: u32,
    len: u32,
) -> Result<()> {
    let frame = CommandFrame::addressed(chip.opcode_page_program, chip.address_width, address);
    transaction(bus, |bus| {
        bus.transmit(frame.as_bytes())?;
        transmit_fill(bus, len)
    })?;
    if chip.uses_aai() {
        terminate_aai(bus, policy)?;
    }
    Ok(())
}

/// Close an auto-address-increment sequence
pub fn terminate_aai<B: BusTransport + ?Sized>(bus: &mut B, policy: PollPolicy) -> Result<()> {
    wait_until_ready(bus, policy)?;
    write_disable(bus)
}

/// Latch write enable and send an addressed erase command
///
/// Returns as soon as the command is on the wire; the erase itself runs
/// until WIP clears.
pub fn erase_command<B: BusTransport + ?Sized>(
    bus: &mut B,
    opcode: u8,
    width: AddressWidth,
    address: u32,
) -> Result<()> {
    write_enable(bus)?;
    let frame = CommandFrame::addressed(opcode, width, address);
    transaction(bus, |bus| bus.transmit(frame.as_bytes()))
}

/// Latch write enable and send a chip erase command
pub fn chip_erase<B: BusTransport + ?Sized>(bus: &mut B, opcode: u8) -> Result<()> {
    write_enable(bus)?;
    send_opcode(bus, opcode)
}

/// Read data with the fast read command
pub fn fast_read<B: BusTransport + ?Sized>(
    bus: &mut B,
    width: AddressWidth,
    address: u32,
    buf: &mut [u8],
) -> Result<()> {
    let frame =
        CommandFrame::addressed(opcodes::FAST_READ, width, address).with_dummy(opcodes::DUMMY);
    transaction(bus, |bus| {
        bus.transmit(frame.as_bytes())?;
        bus.receive(buf)
    })
}

/// Read the JEDEC ID, skipping continuation codes
///
/// Returns `ChipNotFound` if the bus floats (all 0x00 or all 0xFF) or the
/// continuation codes never end.
pub fn read_id<B: BusTransport + ?Sized>(bus: &mut B) -> Result<JedecId> {
    let id = transaction(bus, |bus| {
        bus.transmit(CommandFrame::opcode(opcodes::RDID).as_bytes())?;
        let mut bank = 0u8;
        let mut first = [0u8; 1];
        loop {
            bus.receive(&mut first)?;
            if first[0] != opcodes::JEDEC_CONTINUATION {
                break;
            }
            bank += 1;
            if bank >= MAX_CONTINUATION_CODES {
                return Err(Error::ChipNotFound);
            }
        }
        let mut rest = [0u8; 2];
        bus.receive(&mut rest)?;
        Ok(JedecId {
            bank,
            bytes: [first[0], rest[0], rest[1]],
        })
    })?;

    if id.bytes.iter().all(|&b| b == 0x00) || id.bytes.iter().all(|&b| b == 0xFF) {
        log::debug!("no chip answered RDID: {:02X?}", id.bytes);
        return Err(Error::ChipNotFound);
    }
    Ok(id)
}

/// Write status register 1 and relock it
///
/// WREN, WRSR, wait for completion, WRDI.
pub fn write_status<B: BusTransport + ?Sized>(
    bus: &mut B,
    policy: PollPolicy,
    value: u8,
) -> Result<()> {
    write_enable(bus)?;
    transaction(bus, |bus| bus.transmit(&[opcodes::WRSR, value]))?;
    wait_until_ready(bus, policy)?;
    write_disable(bus)
}
