//! Inkwire Framebuffer Transfer Protocol
//!
//! This crate defines the text protocol a host uses to push one packed
//! e-paper frame to the display controller over a serial link that only
//! reliably carries printable ASCII lines.
//!
//! # Protocol Overview
//!
//! ```text
//! host                                   device
//!  │ CAN_SEND ─────────────────────────────▶ │
//!  │ ◀───────────────────────── YES | BUSY   │
//!  │ <1024 hex chars> ─────────────────────▶ │  × ceil(192000 / 1024)
//!  │ ◀──────────────────────── OK | ERR:...  │
//!  │                      (panel refresh)    │
//!  │ ◀──────────────────── DONE | ERR_DISP:. │
//! ```
//!
//! Every message is one `\n`-terminated line. The frame is
//! [`FRAME_SIZE`] bytes of 2-bit pixels (see [`frame`]), hex encoded
//! (see [`hex`]) and split into [`CHUNK_HEX_LEN`]-character lines.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod frame;
pub mod hex;
pub mod line;
pub mod messages;

pub use frame::{FrameError, Raster};
pub use hex::HexError;
pub use line::{Line, LineAssembler, LineError, LinePoll, LineReader, MAX_LINE_LEN};
pub use messages::{Reply, ReplyError, Request};

/// Panel width in pixels
pub const PANEL_WIDTH: usize = 800;

/// Panel height in pixels
pub const PANEL_HEIGHT: usize = 480;

/// Pixels packed into each frame byte (2 bits per pixel)
pub const PIXELS_PER_BYTE: usize = 4;

/// Size of one packed frame in bytes
pub const FRAME_SIZE: usize = PANEL_WIDTH * PANEL_HEIGHT / PIXELS_PER_BYTE;

/// Raw bytes carried by one full chunk line
pub const CHUNK_SIZE: usize = 512;

/// Hex characters in one full chunk line
pub const CHUNK_HEX_LEN: usize = CHUNK_SIZE * 2;

/// Chunk lines needed for one frame (the last one may be short)
pub const CHUNK_COUNT: usize = (FRAME_SIZE * 2).div_ceil(CHUNK_HEX_LEN);

/// Link speed the device is built for
pub const BAUDRATE: u32 = inkwire_hal::link::DEFAULT_BAUDRATE;

/// Host-side timing contract
pub mod timing {
    /// How long the host waits for `YES`/`BUSY` after each `CAN_SEND`
    pub const HANDSHAKE_TIMEOUT_MS: u64 = 2_000;
    /// Handshake attempts before giving up
    pub const HANDSHAKE_ATTEMPTS: u32 = 5;
    /// Pause between handshake attempts
    pub const HANDSHAKE_BACKOFF_MS: u64 = 2_000;
    /// How long the host waits for each chunk's `OK`
    pub const CHUNK_ACK_TIMEOUT_MS: u64 = 3_000;
}
