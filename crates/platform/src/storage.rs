//! Non-volatile storage geometry
//!
//! Settings and audiobook progress live in a small byte-addressed EEPROM
//! reached through [`embedded_storage::Storage`]. The layout:
//!
//! ```text
//! 0x000 ..= 0x1FF   progress slots, 2 bytes (u16 LE) per folder 0..=255
//! 0x200 ..          settings image (header + postcard payload)
//! ```

pub use embedded_storage::{ReadStorage, Storage};

/// Total EEPROM size in bytes.
pub const EEPROM_SIZE: usize = 1024;

/// Offset of the first progress slot.
pub const PROGRESS_BASE: u32 = 0;

/// Bytes per progress slot.
pub const PROGRESS_SLOT_LEN: u32 = 2;

/// Offset of the settings image.
pub const SETTINGS_BASE: u32 = 0x200;

/// Maximum size of the settings image.
pub const SETTINGS_MAX_LEN: usize = 96;

/// Offset of the progress slot for `folder`.
// 255 * 2 fits below SETTINGS_BASE.
#[allow(clippy::arithmetic_side_effects, clippy::cast_lossless)]
pub const fn progress_offset(folder: u8) -> u32 {
    PROGRESS_BASE + folder as u32 * PROGRESS_SLOT_LEN
}
