//! NFC tag block codec.
//!
//! Every tag written by the box carries one 16-byte block:
//!
//! ```text
//! [0..4]   cookie    u32 be  (0x1337_B347)
//! [4]      version   u8 = 2
//! [5]      folder    u8
//! [6]      mode      u8  (PlayMode byte)
//! [7]      special   u8
//! [8]      special2  u8
//! [9..16]  reserved, zero
//! ```
//!
//! Decoding is total: any 16 bytes produce a record, and a foreign cookie
//! is an ordinary branch into first-time setup rather than an error.

use crate::folder::{FolderSettings, PlayMode};
use platform::BLOCK_LEN;

/// Magic value identifying tags written by this box.
pub const CARD_COOKIE: u32 = 0x1337_B347;

/// Tag layout version written by this box.
pub const TAG_VERSION: u8 = 2;

/// Decoded tag block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TagRecord {
    /// Magic cookie; anything but [`CARD_COOKIE`] marks a foreign tag
    pub cookie: u32,
    /// Layout version
    pub version: u8,
    /// What the tag selects
    pub settings: FolderSettings,
}

/// What a scanned tag asks the dispatch core to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TagKind {
    /// Cookie mismatch: blank or foreign tag, run first-time setup
    Foreign,
    /// Play a folder
    Folder(FolderSettings),
    /// Cookie matches but no mode was ever chosen
    Unassigned,
    /// Create or remove a modifier (`folder == 0`, mode byte is the modifier id)
    Modifier {
        /// Modifier id
        id: u8,
        /// Modifier parameter (sleep-timer minutes)
        special: u8,
    },
    /// Open the admin menu, bypassing the menu lock
    AdminCard,
}

impl TagRecord {
    /// Size of the encoded block.
    pub const SIZE: usize = BLOCK_LEN;

    /// A record carrying this box's cookie and version.
    pub const fn new(settings: FolderSettings) -> Self {
        Self { cookie: CARD_COOKIE, version: TAG_VERSION, settings }
    }

    /// Encode into a 16-byte block, reserved bytes zeroed.
    ///
    /// # Safety (lint allow)
    /// All range indices are compile-time constants within `[0, SIZE)`.
    /// The buffer is `[u8; Self::SIZE]` so all slices are always valid.
    #[must_use]
    #[allow(clippy::indexing_slicing)]
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.cookie.to_be_bytes());
        buf[4] = self.version;
        buf[5] = self.settings.folder;
        buf[6] = self.settings.mode.as_u8();
        buf[7] = self.settings.special;
        buf[8] = self.settings.special2;
        buf
    }

    /// Decode a 16-byte block. Never fails.
    ///
    /// # Safety (lint allow)
    /// All indices are compile-time constants within `[0, SIZE)`.
    #[must_use]
    #[allow(clippy::indexing_slicing)]
    pub fn decode(buf: &[u8; Self::SIZE]) -> Self {
        Self {
            cookie: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            version: buf[4],
            settings: FolderSettings {
                folder: buf[5],
                mode: PlayMode::from_u8(buf[6]),
                special: buf[7],
                special2: buf[8],
            },
        }
    }

    /// `true` when the tag was written by this box.
    pub const fn is_ours(&self) -> bool {
        self.cookie == CARD_COOKIE
    }

    /// Classify the tag for dispatch.
    pub fn kind(&self) -> TagKind {
        if !self.is_ours() {
            return TagKind::Foreign;
        }
        let settings = self.settings;
        match (settings.folder, settings.mode) {
            (0, PlayMode::Uninitialized | PlayMode::AdminMenu) => TagKind::AdminCard,
            (0, mode) => TagKind::Modifier { id: mode.as_u8(), special: settings.special },
            (_, PlayMode::Uninitialized) => TagKind::Unassigned,
            _ => TagKind::Folder(settings),
        }
    }
}
