//! Power management abstraction
//!
//! The box runs from a latching power switch: once the control core decides
//! to power down, the shutdown line cuts the supply.

use embedded_hal::digital::OutputPin;

/// Power switch interface
pub trait PowerControl {
    /// Error type
    type Error: core::fmt::Debug;

    /// Cut the supply. On hardware this does not return.
    fn shutdown(&mut self) -> Result<(), Self::Error>;
}

/// Shutdown via a GPIO driving the latch high.
pub struct ShutdownPin<P> {
    pin: P,
}

impl<P: OutputPin> ShutdownPin<P> {
    /// Take the pin and drive it low (supply held).
    pub fn new(mut pin: P) -> Result<Self, P::Error> {
        pin.set_low()?;
        Ok(Self { pin })
    }

    /// Release the pin.
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> PowerControl for ShutdownPin<P> {
    type Error = P::Error;

    fn shutdown(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high()
    }
}
