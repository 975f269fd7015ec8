//! Persistent record shapes — folder settings, NFC tag blocks, admin settings.
//!
//! # Modules
//!
//! - [`folder`] — `FolderSettings` and the closed `PlayMode` enum
//! - [`tag`] — 16-byte NFC tag block codec and tag classification
//! - [`settings`] — `AdminSettings` and its checksummed EEPROM image

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod folder;
pub mod settings;
pub mod tag;

// Top-level re-exports for convenience
pub use folder::{FolderSettings, PlayMode};
pub use settings::{AdminSettings, MenuLock, RecordError, SETTINGS_VERSION};
pub use tag::{TagKind, TagRecord, CARD_COOKIE, TAG_VERSION};
