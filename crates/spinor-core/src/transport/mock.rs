//! Recording transport for unit tests

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::time::Duration;

use super::BusTransport;
use crate::error::{Error, Result};
use crate::spi::opcodes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Lock,
    Unlock,
    Select,
    Deselect,
    Tx(Vec<u8>),
    Rx(usize),
    Delay(u32),
}

/// Transport that records every call and answers from scripted queues
#[derive(Debug, Default)]
pub struct MockBus {
    pub events: Vec<Event>,
    /// Status register samples, idle (0x00) once exhausted
    pub status: VecDeque<u8>,
    /// Bytes returned after RDID
    pub id: VecDeque<u8>,
    /// Byte returned for any other receive
    pub fill: u8,
    pub locked: bool,
    /// Refuse every lock request
    pub contended: bool,
    /// Fail the n-th transmit (0-based)
    pub fail_tx_at: Option<usize>,
    selected: bool,
    window_opcode: Option<u8>,
    tx_count: usize,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transmitted bytes grouped by chip-select window
    pub fn windows(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut current: Option<Vec<u8>> = None;
        for event in &self.events {
            match event {
                Event::Select => current = Some(Vec::new()),
                Event::Tx(bytes) => {
                    if let Some(w) = current.as_mut() {
                        w.extend_from_slice(bytes);
                    }
                }
                Event::Deselect => {
                    if let Some(w) = current.take() {
                        out.push(w);
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// First byte of every chip-select window
    pub fn opcodes(&self) -> Vec<u8> {
        self.windows().iter().filter_map(|w| w.first().copied()).collect()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl BusTransport for MockBus {
    fn select(&mut self) -> Result<()> {
        assert!(!self.selected, "select while selected");
        self.selected = true;
        self.window_opcode = None;
        self.events.push(Event::Select);
        Ok(())
    }

    fn deselect(&mut self) -> Result<()> {
        self.selected = false;
        self.events.push(Event::Deselect);
        Ok(())
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<()> {
        assert!(self.selected, "transmit without select");
        let n = self.tx_count;
        self.tx_count += 1;
        if self.fail_tx_at == Some(n) {
            return Err(Error::SpiTransferFailed);
        }
        if self.window_opcode.is_none() {
            self.window_opcode = bytes.first().copied();
        }
        self.events.push(Event::Tx(bytes.to_vec()));
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<()> {
        assert!(self.selected, "receive without select");
        for b in buf.iter_mut() {
            *b = match self.window_opcode {
                Some(opcodes::RDSR) => self.status.pop_front().unwrap_or(0),
                Some(opcodes::RDID) => self.id.pop_front().unwrap_or(0),
                _ => self.fill,
            };
        }
        self.events.push(Event::Rx(buf.len()));
        Ok(())
    }

    fn lock(&mut self, _timeout: Duration) -> bool {
        if self.contended || self.locked {
            return false;
        }
        self.locked = true;
        self.events.push(Event::Lock);
        true
    }

    fn unlock(&mut self) {
        assert!(self.locked, "unlock without lock");
        self.locked = false;
        self.events.push(Event::Unlock);
    }

    fn delay_us(&mut self, us: u32) {
        self.events.push(Event::Delay(us));
    }
}
