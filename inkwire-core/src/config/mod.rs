//! Server configuration
//!
//! Timing knobs for the device side. The defaults match the panel board as
//! shipped; firmware builds construct a [`ServerConfig`] once and hand it to
//! the server.

/// Device transfer server configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServerConfig {
    /// Indicator toggles during the ready signal
    pub ready_blinks: u8,
    /// Time between ready toggles (ms)
    pub ready_blink_ms: u32,
    /// Pause after the ready signal before serving (ms)
    pub ready_settle_ms: u32,
    /// Sleep between polls of an empty link (ms)
    pub poll_backoff_ms: u32,
    /// Abort a session that receives nothing for this long (ms)
    ///
    /// `None` waits for the next line forever.
    pub session_idle_timeout_ms: Option<u32>,
    /// Send the legacy `READY` line once boot completes
    pub announce_ready: bool,
    /// Half-period of the fatal blink (ms)
    pub fatal_blink_ms: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ready_blinks: 5,
            ready_blink_ms: 100,
            ready_settle_ms: 2_000,
            poll_backoff_ms: 10,
            session_idle_timeout_ms: Some(60_000),
            announce_ready: false,
            fatal_blink_ms: 1_000,
        }
    }
}

impl ServerConfig {
    /// Configuration without boot or idle delays, for simulations
    pub fn immediate() -> Self {
        Self {
            ready_blink_ms: 0,
            ready_settle_ms: 0,
            poll_backoff_ms: 1,
            ..Default::default()
        }
    }
}
