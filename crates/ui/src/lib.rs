//! Audio user interface — button gestures, voice menus, PIN entry, prompt queue.
//!
//! The box has no screen: every menu is a numbered voice prompt steered with
//! three buttons. This crate is `no_std`; it only uses `core`, `heapless`
//! and the `embassy-time` clock types.

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod gesture;
pub mod navigation;
pub mod pin;
pub mod prompt;
pub mod tracks;

pub use gesture::{ButtonGestures, GestureDetector, GestureState};
pub use navigation::{MenuEvent, MenuNavigator, MenuRequest, Preview};
pub use pin::{PinEntry, PinEvent};
pub use prompt::{Prompt, PromptQueue};
