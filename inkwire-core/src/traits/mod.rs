//! Hardware abstraction traits
//!
//! These traits define the interface between the transfer server and
//! hardware-specific implementations. The link and status indicator live in
//! `inkwire-hal`; the panel is defined here because its contract is the
//! packed frame format.

pub mod panel;

pub use panel::{PanelDriver, PanelError};
