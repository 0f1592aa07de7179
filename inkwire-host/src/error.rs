//! Error types for the host tools

use std::fmt;
use std::io;
use std::path::PathBuf;

use inkwire_protocol::FrameError;
use thiserror::Error;

/// Where in the transfer a wait ran out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for `YES`/`BUSY` after `CAN_SEND`
    Handshake,
    /// Waiting for the `OK` of chunk `index` (zero-based)
    Chunk { index: usize },
    /// Waiting for `DONE` after the last chunk
    Completion,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Handshake => f.write_str("handshake"),
            Phase::Chunk { index } => write!(f, "chunk {index}"),
            Phase::Completion => f.write_str("completion"),
        }
    }
}

/// Errors that end a transfer attempt
#[derive(Debug, Error)]
pub enum TransferError {
    /// No reply within the allowed time
    #[error("timed out during {phase}")]
    Timeout { phase: Phase },

    /// The device answered `BUSY` on the last allowed handshake attempt
    #[error("device still busy after {attempts} attempts")]
    BusyRetryExhausted { attempts: u32 },

    /// The device reported an error (`ERR:*`, `ERR_DISP:*`, `ERR_MEM`, `FATAL:*`)
    #[error("device rejected transfer: {reply}")]
    DeviceRejected { reply: String },

    /// The device sent a valid reply that makes no sense at this point
    #[error("unexpected reply during {phase}: {line}")]
    Protocol { phase: Phase, line: String },

    /// Reading or writing the link failed
    #[error("link error: {0}")]
    Link(#[from] io::Error),

    /// The payload is not a frame
    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),
}

impl TransferError {
    /// Whether a later attempt may succeed without changing anything
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransferError::Timeout { .. } | TransferError::BusyRetryExhausted { .. }
        )
    }
}

/// Errors loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors turning an image into a frame
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to load image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = TransferError::Timeout {
            phase: Phase::Chunk { index: 7 },
        };
        assert_eq!(err.to_string(), "timed out during chunk 7");

        let err = TransferError::DeviceRejected {
            reply: "ERR:OVERFLOW".into(),
        };
        assert_eq!(err.to_string(), "device rejected transfer: ERR:OVERFLOW");
    }

    #[test]
    fn test_transient() {
        assert!(TransferError::BusyRetryExhausted { attempts: 5 }.is_transient());
        assert!(!TransferError::DeviceRejected {
            reply: "ERR_MEM".into()
        }
        .is_transient());
    }
}
