//! Message types for the transfer protocol
//!
//! Message types are divided into two categories:
//! - Host → Device: the `CAN_SEND` query and hex chunk lines
//! - Device → Host: status replies, one per line

use core::fmt::{self, Write};
use heapless::String;

// Host → Device
pub const CAN_SEND: &str = "CAN_SEND";

// Device → Host
pub const YES: &str = "YES";
pub const BUSY: &str = "BUSY";
pub const OK: &str = "OK";
pub const DONE: &str = "DONE";
pub const READY: &str = "READY";
pub const ERR_MEM: &str = "ERR_MEM";
pub const ERR_PREFIX: &str = "ERR:";
pub const ERR_DISP_PREFIX: &str = "ERR_DISP:";
pub const FATAL_PREFIX: &str = "FATAL:";
pub const OVERFLOW_REASON: &str = "OVERFLOW";

/// Longest reason carried in an error reply; longer reasons are cut
pub const MAX_REASON_LEN: usize = 64;

/// Longest encoded reply line
pub const MAX_REPLY_LEN: usize = ERR_DISP_PREFIX.len() + MAX_REASON_LEN;

/// Error or fault reason text
pub type Reason = String<MAX_REASON_LEN>;

/// Lines sent by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request<'a> {
    /// Ask for permission to start a session
    CanSend,
    /// Hex-encoded slice of the frame (not yet validated)
    Chunk(&'a [u8]),
}

impl<'a> Request<'a> {
    /// Classify a trimmed, nonblank line
    pub fn parse(line: &'a [u8]) -> Self {
        if line == CAN_SEND.as_bytes() {
            Request::CanSend
        } else {
            Request::Chunk(line)
        }
    }
}

/// Replies sent by the device
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    /// Handshake granted
    Yes,
    /// A session is already active
    Busy,
    /// Chunk accepted
    Ok,
    /// Session aborted: `ERR:<reason>`
    Err(Reason),
    /// Session aborted: chunk would pass the end of the frame
    Overflow,
    /// Panel refresh failed: `ERR_DISP:<reason>`
    DisplayErr(Reason),
    /// Framebuffer could not be allocated
    MemErr,
    /// Frame shown
    Done,
    /// Device stopped serving: `FATAL:<reason>`
    Fatal(Reason),
    /// Boot signal of the older handshake variant
    Ready,
}

/// Errors from reply parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReplyError {
    /// Line is not a known reply
    Unrecognized,
}

/// Copy `text` into a reason, cutting at a char boundary if too long
pub fn reason(text: &str) -> Reason {
    let mut out = Reason::new();
    for ch in text.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

impl Reply {
    /// `ERR:<reason>`
    pub fn error(text: &str) -> Self {
        Reply::Err(reason(text))
    }

    /// `ERR_DISP:<reason>`
    pub fn display_error(text: &str) -> Self {
        Reply::DisplayErr(reason(text))
    }

    /// `FATAL:<reason>`
    pub fn fatal(text: &str) -> Self {
        Reply::Fatal(reason(text))
    }

    /// Whether this reply ends the host's attempt with a device-side error
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Reply::Err(_) | Reply::Overflow | Reply::DisplayErr(_) | Reply::MemErr | Reply::Fatal(_)
        )
    }

    /// Encode as a line, without the trailing `\n`
    pub fn encode(&self) -> String<MAX_REPLY_LEN> {
        let mut line = String::new();
        // Capacity covers the longest prefix plus a full reason
        let _ = write!(line, "{self}");
        line
    }

    /// Parse a device line
    ///
    /// Matching is lenient the way hosts have always read this device:
    /// `ERR`, `DONE` and `OK` are found anywhere in the line, in that order,
    /// so decorated status lines still classify. An `ERR` line without a
    /// known prefix keeps the whole line as its reason.
    pub fn parse(line: &str) -> Result<Self, ReplyError> {
        let line = line.trim();

        if line == ERR_MEM {
            return Ok(Reply::MemErr);
        }
        if let Some(rest) = line.strip_prefix(ERR_DISP_PREFIX) {
            return Ok(Reply::display_error(rest));
        }
        if let Some(rest) = line.strip_prefix(ERR_PREFIX) {
            if rest == OVERFLOW_REASON {
                return Ok(Reply::Overflow);
            }
            return Ok(Reply::error(rest));
        }
        if let Some(rest) = line.strip_prefix(FATAL_PREFIX) {
            return Ok(Reply::fatal(rest));
        }
        if line.contains("ERR") {
            return Ok(Reply::error(line));
        }

        match line {
            YES => Ok(Reply::Yes),
            BUSY => Ok(Reply::Busy),
            READY => Ok(Reply::Ready),
            _ if line.contains(DONE) => Ok(Reply::Done),
            _ if line.contains(OK) => Ok(Reply::Ok),
            _ => Err(ReplyError::Unrecognized),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Yes => f.write_str(YES),
            Reply::Busy => f.write_str(BUSY),
            Reply::Ok => f.write_str(OK),
            Reply::Err(reason) => write!(f, "{ERR_PREFIX}{reason}"),
            Reply::Overflow => write!(f, "{ERR_PREFIX}{OVERFLOW_REASON}"),
            Reply::DisplayErr(reason) => write!(f, "{ERR_DISP_PREFIX}{reason}"),
            Reply::MemErr => f.write_str(ERR_MEM),
            Reply::Done => f.write_str(DONE),
            Reply::Fatal(reason) => write!(f, "{FATAL_PREFIX}{reason}"),
            Reply::Ready => f.write_str(READY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parse() {
        assert_eq!(Request::parse(b"CAN_SEND"), Request::CanSend);
        assert_eq!(Request::parse(b"00ff"), Request::Chunk(b"00ff"));
        assert_eq!(Request::parse(b"can_send"), Request::Chunk(b"can_send"));
    }

    #[test]
    fn test_reply_encode() {
        assert_eq!(Reply::Yes.encode().as_str(), "YES");
        assert_eq!(Reply::Overflow.encode().as_str(), "ERR:OVERFLOW");
        assert_eq!(
            Reply::error("odd-length string").encode().as_str(),
            "ERR:odd-length string"
        );
        assert_eq!(
            Reply::display_error("busy timeout").encode().as_str(),
            "ERR_DISP:busy timeout"
        );
        assert_eq!(Reply::MemErr.encode().as_str(), "ERR_MEM");
        assert_eq!(Reply::fatal("link write failed").encode().as_str(), "FATAL:link write failed");
    }

    #[test]
    fn test_reply_parse_roundtrip() {
        let replies = [
            Reply::Yes,
            Reply::Busy,
            Reply::Ok,
            Reply::error("TIMEOUT"),
            Reply::Overflow,
            Reply::display_error("bus"),
            Reply::MemErr,
            Reply::Done,
            Reply::fatal("link read failed"),
            Reply::Ready,
        ];
        for reply in replies {
            assert_eq!(Reply::parse(reply.encode().as_str()), Ok(reply));
        }
    }

    #[test]
    fn test_reply_parse_is_lenient() {
        assert_eq!(Reply::parse("  OK\r"), Ok(Reply::Ok));
        assert_eq!(Reply::parse("chunk OK"), Ok(Reply::Ok));
        assert_eq!(Reply::parse(">>> DONE"), Ok(Reply::Done));
        assert_eq!(Reply::parse("ERROR bad"), Ok(Reply::error("ERROR bad")));
        assert_eq!(
            Reply::parse("chunk rejected ERR:OVERFLOW"),
            Ok(Reply::error("chunk rejected ERR:OVERFLOW"))
        );
        assert_eq!(Reply::parse("OK ERR:late"), Ok(Reply::error("OK ERR:late")));
        assert_eq!(Reply::parse("ERR:TOKEN"), Ok(Reply::error("TOKEN")));
        assert_eq!(Reply::parse("hello"), Err(ReplyError::Unrecognized));
    }

    #[test]
    fn test_reason_is_truncated() {
        let long = "x".repeat(200);
        let reply = Reply::error(&long);
        assert!(reply.encode().len() <= MAX_REPLY_LEN);
        assert!(reply.is_error());
    }

    #[test]
    fn test_is_error() {
        assert!(Reply::Overflow.is_error());
        assert!(Reply::MemErr.is_error());
        assert!(!Reply::Busy.is_error());
        assert!(!Reply::Done.is_error());
    }
}
