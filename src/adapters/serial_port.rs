//! [`SerialLink`] over a real serial device, via the `serialport` crate.

use std::io::{self, Read, Write};
use std::time::Duration;

use log::info;
use serialport::{ClearBuffer, SerialPort};

use crate::error::Result;
use crate::serial::SerialLink;

/// How long one `read` may block.  The manager's ack deadline is checked
/// between reads.
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
}

impl SerialPortLink {
    /// Open `path` at `baud_rate`, 8N1.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .timeout(READ_TIMEOUT)
            .open()?;
        info!("SERIAL | opened {} at {} baud", path, baud_rate);
        Ok(Self { port })
    }
}

impl SerialLink for SerialPortLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            other => other,
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}
