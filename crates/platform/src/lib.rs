//! Hardware Abstraction Layer (HAL) for the tag-driven audio box
//!
//! This crate provides the narrow driver interfaces the control core
//! consumes, so the whole control loop runs without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (control crate)
//!         ↓
//! Feature Layers (playback, ui, records)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (MP3 module UART, MFRC522 SPI, GPIO, EEPROM)
//! ```
//!
//! # Abstractions
//!
//! - [`AudioPlayer`] - MP3 module: folder/track playback, notifications, volume
//! - [`TagReader`] - RFID reader: presence detection, 16-byte block read/write
//! - [`ButtonSampler`] - raw level of the three buttons
//! - [`PowerControl`] - latching power switch
//! - [`storage`] - EEPROM geometry for `embedded_storage` backends
//!
//! # Features
//!
//! - `std`: host mocks in [`mocks`] (tests and simulator)
//! - `defmt`: Enable defmt logging
//!
//! # Example
//!
//! ```no_run
//! use platform::{AudioPlayer, TagReader};
//!
//! fn play_scanned<A: AudioPlayer, R: TagReader>(audio: &mut A, reader: &mut R) {
//!     if reader.is_new_tag_present() {
//!         if let Ok(block) = reader.read_block() {
//!             let _ = audio.play(block[5], 1);
//!         }
//!     }
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::must_use_candidate)] // driver accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(all(not(test), feature = "std"))]
extern crate std;

pub mod audio;
pub mod config;
pub mod input;
pub mod power;
pub mod rfid;
pub mod storage;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

pub use audio::{AudioPlayer, Equalizer};
pub use input::{Button, ButtonLevels, ButtonSampler, PinButtons};
pub use power::{PowerControl, ShutdownPin};
pub use rfid::{TagReader, BLOCK_LEN};
