//! Serial link abstraction
//!
//! The transfer protocol only needs four things from the wire: ask whether
//! input is waiting, read what is there, write bytes, and flush. Reads must
//! never block on an empty link; callers poll and back off themselves.

/// Default link speed in bits per second
pub const DEFAULT_BAUDRATE: u32 = 115_200;

/// Duplex byte stream carrying newline-terminated ASCII lines
pub trait Link {
    /// Error type for link operations
    type Error;

    /// Check whether at least one byte can be read without blocking
    fn input_ready(&mut self) -> Result<bool, Self::Error>;

    /// Read available bytes into `buf`
    ///
    /// Returns the number of bytes read. Zero means nothing was available.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write all of `data` to the link
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered output
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Write one protocol line followed by `\n`, then flush
    fn send_line(&mut self, line: &[u8]) -> Result<(), Self::Error> {
        self.write_all(line)?;
        self.write_all(b"\n")?;
        self.flush()
    }
}

/// [`Link`] over any `embedded-io` stream that can report read readiness
///
/// Buffered UARTs on embedded targets implement these traits, which makes
/// this the usual way to hand a peripheral to the transfer server.
pub struct IoLink<T> {
    inner: T,
}

impl<T> IoLink<T> {
    /// Wrap an `embedded-io` stream
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Return the wrapped stream
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> Link for IoLink<T>
where
    T: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady,
{
    type Error = T::Error;

    fn input_ready(&mut self) -> Result<bool, Self::Error> {
        self.inner.read_ready()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.inner.read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush()
    }
}

/// Link configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baudrate: DEFAULT_BAUDRATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl LinkConfig {
    /// 8N1 at the given baud rate
    pub fn with_baudrate(baudrate: u32) -> Self {
        Self {
            baudrate,
            ..Default::default()
        }
    }
}

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}
