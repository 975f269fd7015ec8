//! Button input abstraction
//!
//! The box has three buttons. Gesture detection (short press, long press)
//! lives in the `ui` crate; this layer only reports raw levels.

use embedded_hal::digital::InputPin;

/// Physical buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Play/Pause button (middle)
    Pause,
    /// Up button (next track / volume up)
    Up,
    /// Down button (previous track / volume down)
    Down,
}

impl Button {
    /// All buttons in sampling order.
    pub const ALL: [Button; 3] = [Button::Pause, Button::Up, Button::Down];
}

/// Instantaneous pressed level of every button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonLevels {
    /// Pause button held down
    pub pause: bool,
    /// Up button held down
    pub up: bool,
    /// Down button held down
    pub down: bool,
}

impl ButtonLevels {
    /// No button pressed.
    pub const RELEASED: Self = Self { pause: false, up: false, down: false };

    /// Levels with only `button` pressed.
    pub const fn only(button: Button) -> Self {
        let mut levels = Self::RELEASED;
        match button {
            Button::Pause => levels.pause = true,
            Button::Up => levels.up = true,
            Button::Down => levels.down = true,
        }
        levels
    }

    /// Level of a single button.
    pub const fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::Pause => self.pause,
            Button::Up => self.up,
            Button::Down => self.down,
        }
    }

    /// All three buttons held together.
    pub const fn all(&self) -> bool {
        self.pause && self.up && self.down
    }
}

/// Source of raw button levels, sampled once per control-loop tick.
pub trait ButtonSampler {
    /// Read the current level of every button.
    fn sample(&mut self) -> ButtonLevels;
}

/// Three active-low buttons with pull-ups on GPIO inputs.
pub struct PinButtons<P> {
    pause: P,
    up: P,
    down: P,
}

impl<P: InputPin> PinButtons<P> {
    /// Wrap the three input pins.
    pub fn new(pause: P, up: P, down: P) -> Self {
        Self { pause, up, down }
    }

    /// Release the pins.
    pub fn release(self) -> (P, P, P) {
        (self.pause, self.up, self.down)
    }
}

impl<P: InputPin> ButtonSampler for PinButtons<P> {
    fn sample(&mut self) -> ButtonLevels {
        // A pin read error counts as released so a flaky line never latches a press.
        ButtonLevels {
            pause: self.pause.is_low().unwrap_or(false),
            up: self.up.is_low().unwrap_or(false),
            down: self.down.is_low().unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_sets_single_button() {
        let levels = ButtonLevels::only(Button::Up);
        assert!(levels.is_pressed(Button::Up));
        assert!(!levels.is_pressed(Button::Pause));
        assert!(!levels.is_pressed(Button::Down));
        assert!(!levels.all());
    }

    #[test]
    fn test_all_requires_every_button() {
        let levels = ButtonLevels { pause: true, up: true, down: true };
        assert!(levels.all());
    }
}
