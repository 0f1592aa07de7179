//! Inkwire Hardware Abstraction Layer
//!
//! This crate defines the two pieces of hardware the transfer protocol
//! touches directly: the serial link and the status indicator. Both the
//! device firmware and the host tool implement these, so the protocol
//! code above them never names a concrete UART or serial port.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐     ┌──────────────────────────┐
//! │  inkwire-host (client)   │     │  inkwire-core (server)   │
//! └──────────────────────────┘     └──────────────────────────┘
//!              │                                │
//!              ▼                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  inkwire-hal (this crate - traits)                          │
//! └─────────────────────────────────────────────────────────────┘
//!              │                                │
//!              ▼                                ▼
//! ┌──────────────────────────┐     ┌──────────────────────────┐
//! │  serialport (host)       │     │  embassy-rp UART (Pico)  │
//! └──────────────────────────┘     └──────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`link::Link`] - Duplex byte stream with an input-availability query
//! - [`indicator::Indicator`] - Single on/off status light

#![no_std]
#![deny(unsafe_code)]

pub mod indicator;
pub mod link;

// Re-export key traits at crate root for convenience
pub use indicator::{Indicator, PinIndicator};
pub use link::{IoLink, Link, LinkConfig};
