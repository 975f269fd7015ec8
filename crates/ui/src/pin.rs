//! Four-digit PIN entry by button identity (pause = 1, up = 2, down = 3).

use heapless::Vec;
use platform::Button;

use crate::gesture::ButtonGestures;

/// PIN length.
pub const PIN_LEN: usize = 4;

/// Result of one PIN entry step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinEvent {
    /// Waiting for more digits
    Pending,
    /// All digits entered
    Entered([u8; PIN_LEN]),
    /// Pause long press
    Aborted,
}

/// Collects PIN digits from short presses.
#[derive(Debug, Clone, Default)]
pub struct PinEntry {
    digits: Vec<u8, PIN_LEN>,
}

impl PinEntry {
    /// Empty entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Digits entered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    /// `true` before the first digit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    /// Advance with the gestures of the current tick.
    pub fn step(&mut self, gestures: &ButtonGestures) -> PinEvent {
        if gestures.long_press(Button::Pause) {
            return PinEvent::Aborted;
        }
        let digit = [(Button::Pause, 1), (Button::Up, 2), (Button::Down, 3)]
            .into_iter()
            .find(|(button, _)| gestures.short_press(*button))
            .map(|(_, digit)| digit);
        if let Some(digit) = digit {
            // Never full here: a complete PIN is returned below and the entry is dropped.
            self.digits.push(digit).ok();
        }
        match <[u8; PIN_LEN]>::try_from(self.digits.as_slice()) {
            Ok(pin) => PinEvent::Entered(pin),
            Err(_) => PinEvent::Pending,
        }
    }
}
