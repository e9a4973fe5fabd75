//! Byte-link abstraction for the receiver hub.
//!
//! Concrete implementations:
//! - USB CDC serial port ([`SerialPortLink`](crate::adapters::serial_port::SerialPortLink))
//! - [`LoopbackLink`], an in-process hub that acknowledges everything
//!
//! The [`SerialManager`](super::manager::SerialManager) is written against
//! this trait only, so tests drive it with scripted links.

use std::collections::VecDeque;
use std::io;

use super::protocol::{Opcode, request};

/// Byte-oriented link to the hub.
pub trait SerialLink: Send {
    /// Read up to `buf.len()` bytes into `buf`.
    ///
    /// Blocks for at most the link's own read timeout and returns `Ok(0)`
    /// when nothing arrived in that window.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `data` to the link.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush any buffered output.
    fn flush(&mut self) -> io::Result<()>;

    /// Discard stale bytes waiting in the input buffer.
    fn clear_input(&mut self) -> io::Result<()>;
}

/// A hub stand-in that answers like healthy firmware.
///
/// `BOOT` gets `BOOTED` then `ACKNOWLEDGE`, `PING` gets `PONG`, and every
/// other request gets `ACKNOWLEDGE`.  Used for dry runs.
#[derive(Debug, Default)]
pub struct LoopbackLink {
    pending: VecDeque<u8>,
    written: Vec<Vec<u8>>,
}

impl LoopbackLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far, one entry per `write_all`.
    pub fn written(&self) -> &[Vec<u8>] {
        &self.written
    }

    fn answer(&mut self, opcode: Opcode) {
        self.pending.extend(request(opcode, &[]));
    }
}

impl SerialLink for LoopbackLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.written.push(data.to_vec());
        match data.first().copied().and_then(Opcode::from_u8) {
            Some(Opcode::Boot) => {
                self.answer(Opcode::Booted);
                self.answer(Opcode::Acknowledge);
            }
            Some(Opcode::Ping) => self.answer(Opcode::Pong),
            _ => self.answer(Opcode::Acknowledge),
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }
}
