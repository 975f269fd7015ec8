//! Control core of the RFID audio box.
//!
//! Ties the pieces together: a [`Controller`] owns the audio player, the tag
//! reader, the settings store and the power switch, and advances gestures,
//! prompts, the active folder, the modifier overlay, admin sessions and the
//! standby timer from one cooperative [`Controller::tick`].
//!
//! ```text
//! tick(now, levels)
//!   ├─ standby poll ──────────────► power down
//!   ├─ prompt queue ──────────────► AudioPlayer
//!   ├─ modifier timers
//!   ├─ gestures / finished track ─► Modifier ─► TrackSequencer
//!   ├─ admin session | buttons
//!   └─ tag reader ────────────────► Modifier ─► folder / setup / admin
//! ```
//!
//! # Features
//!
//! - `defmt` - log through defmt (target builds)
//! - `tracing` - log through tracing (host builds, simulator)
//! - `std` - expose `platform::mocks` to dependants

#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

#[macro_use]
mod log;

pub mod admin;
pub mod controller;
pub mod error;
pub mod modifier;
pub mod standby;
pub mod store;

pub use admin::{AdminFinish, AdminOrigin, AdminSession, Challenge, FlowStatus, Operation};
pub use controller::{Controller, Tick};
pub use error::{ControlError, StoreError};
pub use modifier::{ButtonEvent, Intercept, Modifier, ModifierKind, ModifierTick};
pub use standby::StandbySupervisor;
pub use store::{PersistentStore, SettingsStore};
