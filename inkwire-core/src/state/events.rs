//! Events that trigger state transitions

use crate::server::Fault;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Lifecycle events
    /// Framebuffer allocation attempted (success or not)
    Booted,
    /// Ready indicator sequence finished
    ReadySignalled,

    // Session events
    /// `CAN_SEND` answered with `YES`
    Granted,
    /// Cursor reached the end of the frame
    FrameComplete,
    /// Session ended with an `ERR:*` reply
    SessionAborted,
    /// Panel refresh finished, successfully or not
    RefreshFinished,

    // Safety events
    /// Unclassified failure; the device stops serving
    FaultDetected(Fault),
}

impl Event {
    /// Check if this event ends an active session
    pub fn ends_session(&self) -> bool {
        matches!(self, Event::SessionAborted | Event::RefreshFinished)
    }
}
