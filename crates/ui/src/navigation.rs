//! Voice menu navigation — a numeric chooser steered by three buttons.
//!
//! The navigator never blocks: [`MenuNavigator::step`] is called once per
//! control-loop tick with the latest gestures and returns
//! [`MenuEvent::Pending`] until the user confirms or cancels. Spoken output
//! goes through the [`PromptQueue`].
//!
//! | Gesture           | Effect                                      |
//! |-------------------|---------------------------------------------|
//! | Up short / long   | +1 / +10, clamped to `option_count`         |
//! | Down short / long | −1 / −10, floor 1                           |
//! | Pause short       | confirm (only once a selection exists)      |
//! | Pause long        | cancel → `default_value` (when cancellable) |

use platform::Button;

use crate::gesture::ButtonGestures;
use crate::prompt::{Prompt, PromptQueue};
use crate::tracks;

/// What to play after announcing a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Preview {
    /// Announcement only
    None,
    /// The selection is a folder; play its first track
    SelectionAsFolder,
    /// The selection is a track of this folder
    TrackOf(u8),
}

/// Parameters of one navigation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MenuRequest {
    /// Highest selectable value
    pub option_count: u8,
    /// Intro prompt, 0 = silent
    pub start_prompt: u16,
    /// Selection `n` is announced as `step_prompt_base + n`
    pub step_prompt_base: u16,
    /// Preview policy
    pub preview: Preview,
    /// Initial selection and result of a cancel
    pub default_value: u8,
    /// Pause long press cancels
    pub cancellable: bool,
}

impl MenuRequest {
    /// A menu with no preview, no default and no cancel.
    pub const fn new(option_count: u8, start_prompt: u16, step_prompt_base: u16) -> Self {
        Self {
            option_count,
            start_prompt,
            step_prompt_base,
            preview: Preview::None,
            default_value: 0,
            cancellable: false,
        }
    }

    /// Builder: set the preview policy.
    #[must_use]
    pub const fn preview(mut self, preview: Preview) -> Self {
        self.preview = preview;
        self
    }

    /// Builder: set the default selection.
    #[must_use]
    pub const fn default_value(mut self, value: u8) -> Self {
        self.default_value = value;
        self
    }

    /// Builder: allow cancelling with a pause long press.
    #[must_use]
    pub const fn cancellable(mut self) -> Self {
        self.cancellable = true;
        self
    }
}

/// Result of one navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuEvent {
    /// Still choosing
    Pending,
    /// Confirmed selection (never 0)
    Selected(u8),
    /// Cancelled; carries the default value
    Cancelled(u8),
}

/// Transient state of one navigation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuNavigator {
    request: MenuRequest,
    current_value: u8,
}

impl MenuNavigator {
    /// Open a menu: queue the intro, then the default selection if any.
    pub fn open(request: MenuRequest, prompts: &mut PromptQueue) -> Self {
        let current_value = request.default_value.min(request.option_count);
        let nav = Self { request, current_value };
        if request.start_prompt != 0 {
            prompts.push(Prompt::Notification(request.start_prompt));
        }
        if current_value != 0 {
            nav.announce(prompts, false);
        }
        nav
    }

    /// Current selection (0 = none yet).
    #[must_use]
    pub fn selection(&self) -> u8 {
        self.current_value
    }

    /// Request this session was opened with.
    #[must_use]
    pub fn request(&self) -> &MenuRequest {
        &self.request
    }

    /// Advance with the gestures of the current tick.
    pub fn step(&mut self, gestures: &ButtonGestures, prompts: &mut PromptQueue) -> MenuEvent {
        let count = self.request.option_count;
        if count == 0 {
            return MenuEvent::Cancelled(self.request.default_value);
        }

        if gestures.long_press(Button::Pause) {
            if self.request.cancellable {
                prompts.replace_pending(Prompt::Notification(tracks::CANCELLED));
                return MenuEvent::Cancelled(self.request.default_value);
            }
            return MenuEvent::Pending;
        }
        if gestures.short_press(Button::Pause) {
            if self.current_value != 0 {
                prompts.clear_pending();
                return MenuEvent::Selected(self.current_value);
            }
            return MenuEvent::Pending;
        }

        let value = self.current_value;
        let next = if gestures.long_press(Button::Up) {
            value.saturating_add(10).min(count)
        } else if gestures.short_press(Button::Up) {
            value.saturating_add(1).min(count)
        } else if gestures.long_press(Button::Down) {
            if value > 10 {
                value.saturating_sub(10)
            } else {
                1
            }
        } else if gestures.short_press(Button::Down) {
            value.saturating_sub(1).max(1)
        } else {
            value
        };

        if next != value {
            self.current_value = next;
            self.announce(prompts, true);
        }
        MenuEvent::Pending
    }

    fn announce(&self, prompts: &mut PromptQueue, replace: bool) {
        let value = self.current_value;
        let id = self.request.step_prompt_base.saturating_add(u16::from(value));
        if replace {
            prompts.replace_pending(Prompt::Notification(id));
        } else {
            prompts.push(Prompt::Notification(id));
        }
        match self.request.preview {
            Preview::None => {}
            Preview::SelectionAsFolder => prompts.push(Prompt::Preview { folder: value, track: 1 }),
            Preview::TrackOf(folder) => {
                prompts.push(Prompt::Preview { folder, track: u16::from(value) });
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use embassy_time::{Duration, Instant};
    use platform::ButtonLevels;

    struct Harness {
        gestures: ButtonGestures,
        prompts: PromptQueue,
        now: u64,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                gestures: ButtonGestures::new(Duration::from_millis(1000)),
                prompts: PromptQueue::new(),
                now: 0,
            }
        }

        fn sample(&mut self, levels: ButtonLevels, ms: u64) {
            self.now = self.now.saturating_add(ms);
            self.gestures.update(levels, Instant::from_millis(self.now));
        }

        fn short(&mut self, nav: &mut MenuNavigator, button: Button) -> MenuEvent {
            self.sample(ButtonLevels::only(button), 10);
            assert_eq!(nav.step(&self.gestures, &mut self.prompts), MenuEvent::Pending);
            self.sample(ButtonLevels::RELEASED, 100);
            nav.step(&self.gestures, &mut self.prompts)
        }

        fn long(&mut self, nav: &mut MenuNavigator, button: Button) -> MenuEvent {
            self.sample(ButtonLevels::only(button), 10);
            nav.step(&self.gestures, &mut self.prompts);
            self.sample(ButtonLevels::only(button), 1000);
            let event = nav.step(&self.gestures, &mut self.prompts);
            for _ in 0..5 {
                self.sample(ButtonLevels::only(button), 200);
                assert_eq!(nav.step(&self.gestures, &mut self.prompts), MenuEvent::Pending);
            }
            self.sample(ButtonLevels::RELEASED, 10);
            nav.step(&self.gestures, &mut self.prompts);
            event
        }

        fn pending(&self) -> Vec<Prompt> {
            self.prompts.pending().collect()
        }
    }

    #[test]
    fn test_open_queues_start_prompt() {
        let mut h = Harness::new();
        let nav = MenuNavigator::open(MenuRequest::new(5, 900, 900), &mut h.prompts);
        assert_eq!(nav.selection(), 0);
        assert_eq!(h.pending(), vec![Prompt::Notification(900)]);
    }

    #[test]
    fn test_open_with_default_announces_it() {
        let mut h = Harness::new();
        let nav =
            MenuNavigator::open(MenuRequest::new(5, 0, 930).default_value(3), &mut h.prompts);
        assert_eq!(nav.selection(), 3);
        assert_eq!(h.pending(), vec![Prompt::Notification(933)]);
    }

    #[test]
    fn test_confirm_requires_selection() {
        let mut h = Harness::new();
        let mut nav = MenuNavigator::open(MenuRequest::new(5, 0, 0), &mut h.prompts);
        assert_eq!(h.short(&mut nav, Button::Pause), MenuEvent::Pending);
        h.short(&mut nav, Button::Up);
        assert_eq!(h.short(&mut nav, Button::Pause), MenuEvent::Selected(1));
    }

    #[test]
    fn test_up_clamps_to_option_count() {
        let mut h = Harness::new();
        let mut nav = MenuNavigator::open(MenuRequest::new(12, 0, 0), &mut h.prompts);
        h.long(&mut nav, Button::Up);
        assert_eq!(nav.selection(), 10);
        h.long(&mut nav, Button::Up);
        assert_eq!(nav.selection(), 12);
        h.short(&mut nav, Button::Up);
        assert_eq!(nav.selection(), 12);
    }

    #[test]
    fn test_long_press_steps_once_while_held() {
        let mut h = Harness::new();
        let mut nav = MenuNavigator::open(MenuRequest::new(99, 0, 0), &mut h.prompts);
        h.long(&mut nav, Button::Up);
        assert_eq!(nav.selection(), 10);
    }

    #[test]
    fn test_down_floors_at_one() {
        let mut h = Harness::new();
        let mut nav =
            MenuNavigator::open(MenuRequest::new(30, 0, 0).default_value(14), &mut h.prompts);
        h.long(&mut nav, Button::Down);
        assert_eq!(nav.selection(), 4);
        h.long(&mut nav, Button::Down);
        assert_eq!(nav.selection(), 1);
        h.short(&mut nav, Button::Down);
        assert_eq!(nav.selection(), 1);
    }

    #[test]
    fn test_change_announces_and_previews_track() {
        let mut h = Harness::new();
        let request = MenuRequest::new(8, 0, 0).preview(Preview::TrackOf(4));
        let mut nav = MenuNavigator::open(request, &mut h.prompts);
        h.short(&mut nav, Button::Up);
        h.short(&mut nav, Button::Up);
        assert_eq!(
            h.pending(),
            vec![Prompt::Notification(2), Prompt::Preview { folder: 4, track: 2 }]
        );
    }

    #[test]
    fn test_folder_preview_plays_first_track() {
        let mut h = Harness::new();
        let request = MenuRequest::new(99, 301, 0).preview(Preview::SelectionAsFolder);
        let mut nav = MenuNavigator::open(request, &mut h.prompts);
        h.short(&mut nav, Button::Up);
        assert_eq!(
            h.pending(),
            vec![Prompt::Notification(1), Prompt::Preview { folder: 1, track: 1 }]
        );
    }

    #[test]
    fn test_cancel_returns_default() {
        let mut h = Harness::new();
        let request = MenuRequest::new(6, 0, 920).default_value(2).cancellable();
        let mut nav = MenuNavigator::open(request, &mut h.prompts);
        h.short(&mut nav, Button::Up);
        assert_eq!(h.long(&mut nav, Button::Pause), MenuEvent::Cancelled(2));
        assert_eq!(h.pending(), vec![Prompt::Notification(tracks::CANCELLED)]);
    }

    #[test]
    fn test_not_cancellable_ignores_pause_long_press() {
        let mut h = Harness::new();
        let mut nav = MenuNavigator::open(MenuRequest::new(6, 0, 0), &mut h.prompts);
        assert_eq!(h.long(&mut nav, Button::Pause), MenuEvent::Pending);
    }

    #[test]
    fn test_empty_menu_cancels_immediately() {
        let mut h = Harness::new();
        let mut nav =
            MenuNavigator::open(MenuRequest::new(0, 0, 0).default_value(4), &mut h.prompts);
        assert_eq!(nav.step(&h.gestures, &mut h.prompts), MenuEvent::Cancelled(4));
    }
}
