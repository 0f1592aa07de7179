//! E-paper panel driver trait

/// Errors that can occur while driving the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelError {
    /// SPI transfer failed
    Bus,
    /// Control pin (DC, RST, BUSY) could not be driven or read
    Pin,
    /// Controller stayed busy past the allowed time
    BusyTimeout,
    /// Frame length does not match the panel
    FrameSize,
}

impl PanelError {
    /// Short reason sent back over the wire in `ERR_DISP:<reason>`
    pub fn reason(&self) -> &'static str {
        match self {
            PanelError::Bus => "spi bus error",
            PanelError::Pin => "control pin error",
            PanelError::BusyTimeout => "busy timeout",
            PanelError::FrameSize => "frame size mismatch",
        }
    }
}

impl core::fmt::Display for PanelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.reason())
    }
}

/// Trait for the display panel
///
/// A refresh is always `init`, then `display`, then `sleep`. The frame passed
/// to `display` is a complete packed frame (see `inkwire_protocol::frame`).
pub trait PanelDriver {
    /// Wake and configure the controller
    fn init(&mut self) -> Result<(), PanelError>;

    /// Load a full packed frame and refresh the panel
    fn display(&mut self, frame: &[u8]) -> Result<(), PanelError>;

    /// Put the controller into deep sleep
    fn sleep(&mut self) -> Result<(), PanelError>;

    /// Run the full init, display, sleep sequence
    ///
    /// Stops at the first failing stage.
    fn refresh(&mut self, frame: &[u8]) -> Result<(), PanelError> {
        self.init()?;
        self.display(frame)?;
        self.sleep()
    }
}
