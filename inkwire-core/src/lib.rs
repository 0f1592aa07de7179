//! Board-agnostic device side of the frame transfer
//!
//! This crate contains all device logic that does not depend on specific
//! hardware implementations:
//!
//! - Panel driver trait
//! - Server state machine
//! - Transfer server (handshake, chunk reception, refresh)
//! - Poll-with-backoff helper
//! - Server configuration
//!
//! The server owns its hardware through [`server::Hardware`] and is driven
//! one [`server::DeviceServer::step`] at a time, so the same code runs on the
//! Pico and in host tests against mock links and panels.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod config;
pub mod poll;
pub mod server;
pub mod state;
pub mod traits;

pub use config::ServerConfig;
pub use server::{DeviceServer, Fault, Hardware, ServerEvent};
pub use state::{Event, ServerState};
