//! State machine definition
//!
//! Every reply the server sends is a function of the current state and the
//! line that arrived.

use super::events::Event;
use crate::server::Fault;

/// Server states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServerState {
    /// Power-on; framebuffer allocation
    Boot,
    /// Blinking the ready indicator
    SignalReady,
    /// Idle, waiting for `CAN_SEND`
    WaitQuery,
    /// Session active, accepting chunk lines
    Receiving,
    /// Frame complete, panel refresh pending
    Refresh,
    /// Unclassified fault; the device no longer serves sessions
    Fatal(Fault),
}

impl ServerState {
    /// Check if a session is active
    ///
    /// A `CAN_SEND` arriving in a busy state is answered with `BUSY`.
    pub fn is_busy(&self) -> bool {
        matches!(self, ServerState::Receiving | ServerState::Refresh)
    }

    /// Check if the server can never serve again
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerState::Fatal(_))
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use ServerState::*;

        match (self, event) {
            // Fatal is terminal
            (Fatal(fault), _) => Fatal(fault),
            (_, FaultDetected(fault)) => Fatal(fault),

            // Boot transitions
            (Boot, Booted) => SignalReady,
            (SignalReady, ReadySignalled) => WaitQuery,

            // WaitQuery transitions
            (WaitQuery, Granted) => Receiving,

            // Receiving transitions
            (Receiving, FrameComplete) => Refresh,
            (Receiving, SessionAborted) => WaitQuery,

            // Refresh transitions
            (Refresh, RefreshFinished) => WaitQuery,

            // Default: stay in current state
            _ => self,
        }
    }
}
