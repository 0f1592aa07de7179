//! State machine for the transfer server
//!
//! Defines the authoritative runtime behavior of the device.
//! The state machine is explicit, finite, and deterministic.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::ServerState;
