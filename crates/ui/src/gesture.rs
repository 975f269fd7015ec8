//! Button gesture detection.
//!
//! Each button runs a small state machine over its sampled level:
//!
//! ```text
//! Released ──press──▶ Pressed ──held ≥ long──▶ LongPressEntered ──▶ LongPressHeld
//!    ▲                   │                          │                    │
//!    │                release                    release              release
//!    │                   ▼                          ▼                    ▼
//!    └──── ReleasedAfterShortPress              Released             Released
//! ```
//!
//! `LongPressEntered` and `ReleasedAfterShortPress` last exactly one sample,
//! so each physical gesture is reported once.

use embassy_time::{Duration, Instant};
use platform::{Button, ButtonLevels};

/// Gesture state of one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GestureState {
    /// Not pressed
    Released,
    /// Pressed, long-press threshold not reached yet
    Pressed,
    /// Threshold reached on this sample
    LongPressEntered,
    /// Still held after the long press was reported
    LongPressHeld,
    /// Released before the threshold on this sample
    ReleasedAfterShortPress,
}

/// Gesture state machine for one button.
#[derive(Debug, Clone)]
pub struct GestureDetector {
    state: GestureState,
    long_press: Duration,
    pressed_since: Instant,
    last_sample: Instant,
}

impl GestureDetector {
    /// Create a released detector with the given long-press threshold.
    pub fn new(long_press: Duration) -> Self {
        Self {
            state: GestureState::Released,
            long_press,
            pressed_since: Instant::from_ticks(0),
            last_sample: Instant::from_ticks(0),
        }
    }

    /// Feed one sample; returns the new state.
    pub fn update(&mut self, pressed: bool, now: Instant) -> GestureState {
        self.last_sample = now;
        self.state = match (self.state, pressed) {
            (GestureState::Released | GestureState::ReleasedAfterShortPress, true) => {
                self.pressed_since = now;
                GestureState::Pressed
            }
            (GestureState::Released | GestureState::ReleasedAfterShortPress, false) => {
                GestureState::Released
            }
            (GestureState::Pressed, false) => GestureState::ReleasedAfterShortPress,
            (GestureState::Pressed, true) => {
                if self.held() >= self.long_press {
                    GestureState::LongPressEntered
                } else {
                    GestureState::Pressed
                }
            }
            (GestureState::LongPressEntered | GestureState::LongPressHeld, true) => {
                GestureState::LongPressHeld
            }
            (GestureState::LongPressEntered | GestureState::LongPressHeld, false) => {
                GestureState::Released
            }
        };
        self.state
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Physically held down as of the last sample.
    #[must_use]
    pub fn is_pressed(&self) -> bool {
        matches!(
            self.state,
            GestureState::Pressed | GestureState::LongPressEntered | GestureState::LongPressHeld
        )
    }

    /// A short press completed on the last sample.
    #[must_use]
    pub fn was_released(&self) -> bool {
        self.state == GestureState::ReleasedAfterShortPress
    }

    /// The long-press threshold was crossed on the last sample.
    #[must_use]
    pub fn long_press_started(&self) -> bool {
        self.state == GestureState::LongPressEntered
    }

    /// Held for at least `duration` as of the last sample.
    #[must_use]
    pub fn held_for(&self, duration: Duration) -> bool {
        self.is_pressed() && self.held() >= duration
    }

    fn held(&self) -> Duration {
        self.last_sample
            .checked_duration_since(self.pressed_since)
            .unwrap_or(Duration::from_ticks(0))
    }
}

/// Detectors for the three buttons.
#[derive(Debug, Clone)]
pub struct ButtonGestures {
    pause: GestureDetector,
    up: GestureDetector,
    down: GestureDetector,
}

impl ButtonGestures {
    /// All three released, sharing one long-press threshold.
    pub fn new(long_press: Duration) -> Self {
        Self {
            pause: GestureDetector::new(long_press),
            up: GestureDetector::new(long_press),
            down: GestureDetector::new(long_press),
        }
    }

    /// Feed one sample of every button.
    pub fn update(&mut self, levels: ButtonLevels, now: Instant) {
        self.pause.update(levels.pause, now);
        self.up.update(levels.up, now);
        self.down.update(levels.down, now);
    }

    /// Detector of one button.
    #[must_use]
    pub fn get(&self, button: Button) -> &GestureDetector {
        match button {
            Button::Pause => &self.pause,
            Button::Up => &self.up,
            Button::Down => &self.down,
        }
    }

    /// Short press of `button` completed on the last sample.
    #[must_use]
    pub fn short_press(&self, button: Button) -> bool {
        self.get(button).was_released()
    }

    /// Long press of `button` began on the last sample.
    #[must_use]
    pub fn long_press(&self, button: Button) -> bool {
        self.get(button).long_press_started()
    }

    /// All three buttons are held.
    #[must_use]
    pub fn all_pressed(&self) -> bool {
        Button::ALL.iter().all(|b| self.get(*b).is_pressed())
    }

    /// No button is held.
    #[must_use]
    pub fn all_released(&self) -> bool {
        Button::ALL.iter().all(|b| !self.get(*b).is_pressed())
    }

    /// At least one button has been held for `duration`.
    #[must_use]
    pub fn any_held_for(&self, duration: Duration) -> bool {
        Button::ALL.iter().any(|b| self.get(*b).held_for(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: Duration = Duration::from_millis(1000);

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn test_short_press_reports_release_once() {
        let mut det = GestureDetector::new(LONG);
        assert_eq!(det.update(true, at(0)), GestureState::Pressed);
        assert_eq!(det.update(true, at(300)), GestureState::Pressed);
        assert_eq!(det.update(false, at(310)), GestureState::ReleasedAfterShortPress);
        assert!(det.was_released());
        assert_eq!(det.update(false, at(320)), GestureState::Released);
        assert!(!det.was_released());
    }

    #[test]
    fn test_long_press_enters_exactly_at_threshold() {
        let mut det = GestureDetector::new(LONG);
        det.update(true, at(0));
        assert_eq!(det.update(true, at(999)), GestureState::Pressed);
        assert_eq!(det.update(true, at(1000)), GestureState::LongPressEntered);
        assert_eq!(det.update(true, at(1010)), GestureState::LongPressHeld);
        assert_eq!(det.update(true, at(5000)), GestureState::LongPressHeld);
        assert_eq!(det.update(false, at(5010)), GestureState::Released);
    }

    #[test]
    fn test_release_after_long_press_is_not_short_press() {
        let mut det = GestureDetector::new(LONG);
        det.update(true, at(0));
        det.update(true, at(1000));
        assert_eq!(det.update(false, at(1001)), GestureState::Released);
        assert!(!det.was_released());
    }

    #[test]
    fn test_repress_after_short_release_restarts_timer() {
        let mut det = GestureDetector::new(LONG);
        det.update(true, at(0));
        det.update(false, at(900));
        assert_eq!(det.update(true, at(910)), GestureState::Pressed);
        assert_eq!(det.update(true, at(1500)), GestureState::Pressed);
        assert_eq!(det.update(true, at(1910)), GestureState::LongPressEntered);
    }

    #[test]
    fn test_held_for_tracks_press_duration() {
        let mut det = GestureDetector::new(LONG);
        det.update(true, at(100));
        det.update(true, at(600));
        assert!(det.held_for(Duration::from_millis(500)));
        assert!(!det.held_for(Duration::from_millis(501)));
        det.update(false, at(700));
        assert!(!det.held_for(Duration::from_millis(0)));
    }

    #[test]
    fn test_button_set_combination() {
        let mut buttons = ButtonGestures::new(LONG);
        let all = ButtonLevels { pause: true, up: true, down: true };
        buttons.update(all, at(0));
        assert!(buttons.all_pressed());
        assert!(!buttons.any_held_for(LONG));
        buttons.update(all, at(1000));
        assert!(buttons.any_held_for(LONG));
        assert!(buttons.long_press(Button::Up));
        buttons.update(ButtonLevels::RELEASED, at(1100));
        assert!(buttons.all_released());
        assert!(!buttons.short_press(Button::Pause));
    }
}
