//! Host side of the Inkwire frame transfer
//!
//! Turns an image into a packed 4-gray frame and pushes it to the display
//! controller over a serial link:
//!
//! - [`raster`]: image file → 800×480 packed frame
//! - [`client`]: one transfer attempt (handshake, chunks, completion)
//! - [`link`]: serial port [`Link`](inkwire_hal::Link) (feature `serial`)
//! - [`config`]: TOML configuration
//!
//! Each attempt consumes its link and closes it on every exit path. Retrying
//! a failed attempt is the caller's decision.

pub mod client;
pub mod config;
pub mod error;
#[cfg(feature = "serial")]
pub mod link;
pub mod raster;

pub use client::{send_frame, Progress, TransferConfig, TransferReport};
pub use config::HostConfig;
pub use error::{ConfigError, Phase, RasterError, TransferError};
