//! One transfer session: cursor bookkeeping and chunk acceptance

use inkwire_protocol::hex;
use inkwire_protocol::{HexError, Reply};

/// Reason texts for session errors that have no codec error behind them
pub const REASON_LINE_TOO_LONG: &str = "LINE_TOO_LONG";
pub const REASON_TIMEOUT: &str = "TIMEOUT";

/// Recoverable errors that abort a session
///
/// Each maps to one `ERR:*` reply; the device returns to idle afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError {
    /// Chunk line is not valid hex
    Decode(HexError),
    /// Chunk would write past the end of the frame
    Overflow,
    /// Line exceeded the receive buffer
    LineTooLong,
    /// No input for longer than the session idle timeout
    IdleTimeout,
}

impl SessionError {
    /// The reply that reports this error to the host
    pub fn reply(&self) -> Reply {
        match self {
            SessionError::Decode(error) => Reply::error(error.reason()),
            SessionError::Overflow => Reply::Overflow,
            SessionError::LineTooLong => Reply::error(REASON_LINE_TOO_LONG),
            SessionError::IdleTimeout => Reply::error(REASON_TIMEOUT),
        }
    }
}

/// Write cursor of an active session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Session {
    cursor: usize,
    capacity: usize,
}

impl Session {
    /// Start a session writing into a buffer of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            cursor: 0,
            capacity,
        }
    }

    /// Bytes received so far
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether the whole buffer has been written
    pub fn is_complete(&self) -> bool {
        self.cursor == self.capacity
    }

    /// Decode one hex chunk line into `buffer` at the cursor
    ///
    /// The line is validated and bounds-checked before any byte is written.
    /// On error the buffer and cursor are unchanged. Returns the decoded
    /// length.
    pub fn accept(&mut self, line: &[u8], buffer: &mut [u8]) -> Result<usize, SessionError> {
        let len = hex::validate(line).map_err(SessionError::Decode)?;
        let limit = self.capacity.min(buffer.len());
        let end = self
            .cursor
            .checked_add(len)
            .filter(|&end| end <= limit)
            .ok_or(SessionError::Overflow)?;

        hex::decode_into(line, &mut buffer[self.cursor..end]).map_err(SessionError::Decode)?;
        self.cursor = end;
        Ok(len)
    }
}
