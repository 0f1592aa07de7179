//! Serial port link
//!
//! Opens the USB serial port the display controller enumerates as and
//! exposes it as a [`Link`].

use std::io::{self, Read, Write};
use std::time::Duration;

use inkwire_hal::{Link, LinkConfig};
use log::{debug, info};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

/// Read timeout; reads only happen once input is known to be waiting
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// A serial port carrying the transfer protocol
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    path: String,
}

impl SerialLink {
    /// Open `path` at `baud_rate`, 8N1, and clear both buffers
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, serialport::Error> {
        Self::open_with(path, LinkConfig::with_baudrate(baud_rate))
    }

    /// Open `path` with an explicit line configuration
    pub fn open_with(path: &str, config: LinkConfig) -> Result<Self, serialport::Error> {
        let mut port = serialport::new(path, config.baudrate)
            .data_bits(data_bits(config.data_bits))
            .parity(parity(config.parity))
            .stop_bits(stop_bits(config.stop_bits))
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;
        port.clear(ClearBuffer::All)?;

        info!("{path} connected at {} baud", config.baudrate);
        Ok(Self {
            port,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Link for SerialLink {
    type Error = io::Error;

    fn input_ready(&mut self) -> Result<bool, io::Error> {
        Ok(self.port.bytes_to_read()? > 0)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, io::Error> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), io::Error> {
        Write::write_all(&mut self.port, data)
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        Write::flush(&mut self.port)
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        debug!("{} closed", self.path);
    }
}

fn data_bits(bits: inkwire_hal::link::DataBits) -> DataBits {
    match bits {
        inkwire_hal::link::DataBits::Seven => DataBits::Seven,
        inkwire_hal::link::DataBits::Eight => DataBits::Eight,
    }
}

fn parity(parity: inkwire_hal::link::Parity) -> Parity {
    match parity {
        inkwire_hal::link::Parity::None => Parity::None,
        inkwire_hal::link::Parity::Even => Parity::Even,
        inkwire_hal::link::Parity::Odd => Parity::Odd,
    }
}

fn stop_bits(bits: inkwire_hal::link::StopBits) -> StopBits {
    match bits {
        inkwire_hal::link::StopBits::One => StopBits::One,
        inkwire_hal::link::StopBits::Two => StopBits::Two,
    }
}
