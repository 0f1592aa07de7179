//! Status indicator abstraction
//!
//! The device has one status light. It reports boot progress, an active
//! session and the fatal state; it carries no protocol meaning.

use embedded_hal::digital::StatefulOutputPin;

/// A single on/off status light
pub trait Indicator {
    /// Switch the light on or off
    fn set(&mut self, on: bool);

    /// Check whether the light is currently on
    fn is_on(&self) -> bool;

    /// Invert the current state
    fn toggle(&mut self) {
        let on = self.is_on();
        self.set(!on);
    }
}

/// Indicator driven by a GPIO pin (active-high)
///
/// Pin errors are ignored: a stuck LED must never take the link down.
pub struct PinIndicator<P> {
    pin: P,
    on: bool,
}

impl<P: StatefulOutputPin> PinIndicator<P> {
    /// Wrap a pin, switching it off
    pub fn new(pin: P) -> Self {
        let mut indicator = Self { pin, on: false };
        indicator.set(false);
        indicator
    }
}

impl<P: StatefulOutputPin> Indicator for PinIndicator<P> {
    fn set(&mut self, on: bool) {
        self.on = on;
        let _ = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
