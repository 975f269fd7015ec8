//! Folder settings — what a tag (or shortcut) asks the box to play.

use serde::{Deserialize, Serialize};

/// Sequencing policy for a folder.
///
/// Stored as its raw byte on tags and in settings. Bytes without a variant
/// decode to [`PlayMode::Uninitialized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlayMode {
    /// Blank / not configured
    #[default]
    Uninitialized,
    /// One random track, then stop
    RandomTrack,
    /// Whole folder in order
    Album,
    /// Whole folder shuffled, looping
    Party,
    /// One fixed track
    SingleTrack,
    /// In order, remembering progress per folder
    AudioBook,
    /// Admin card (setup-flow choice; stored as [`PlayMode::AdminMenu`])
    Admin,
    /// One random track from a range
    RandomRange,
    /// A range in order
    AlbumRange,
    /// A range shuffled, looping
    PartyRange,
    /// Opens the admin menu
    AdminMenu,
}

impl PlayMode {
    /// Raw tag byte.
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::RandomTrack => 1,
            Self::Album => 2,
            Self::Party => 3,
            Self::SingleTrack => 4,
            Self::AudioBook => 5,
            Self::Admin => 6,
            Self::RandomRange => 7,
            Self::AlbumRange => 8,
            Self::PartyRange => 9,
            Self::AdminMenu => 255,
        }
    }

    /// Decode a raw tag byte; unknown values become `Uninitialized`.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::RandomTrack,
            2 => Self::Album,
            3 => Self::Party,
            4 => Self::SingleTrack,
            5 => Self::AudioBook,
            6 => Self::Admin,
            7 => Self::RandomRange,
            8 => Self::AlbumRange,
            9 => Self::PartyRange,
            255 => Self::AdminMenu,
            _ => Self::Uninitialized,
        }
    }

    /// Modes whose bounds come from `special..=special2`.
    pub const fn is_range(self) -> bool {
        matches!(self, Self::RandomRange | Self::AlbumRange | Self::PartyRange)
    }

    /// Modes that play anything at all.
    pub const fn is_playable(self) -> bool {
        !matches!(self, Self::Uninitialized | Self::Admin | Self::AdminMenu)
    }

    /// Short name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::RandomTrack => "random-track",
            Self::Album => "album",
            Self::Party => "party",
            Self::SingleTrack => "single-track",
            Self::AudioBook => "audiobook",
            Self::Admin => "admin",
            Self::RandomRange => "random-range",
            Self::AlbumRange => "album-range",
            Self::PartyRange => "party-range",
            Self::AdminMenu => "admin-menu",
        }
    }
}

impl From<u8> for PlayMode {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}

impl From<PlayMode> for u8 {
    fn from(mode: PlayMode) -> Self {
        mode.as_u8()
    }
}

/// Folder number, play mode and the two mode-specific parameters.
///
/// `special`/`special2` hold the single-track index, the sleep-timer
/// minutes, or a from/to track range depending on `mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FolderSettings {
    /// Folder number on the SD card (1..=99); 0 marks modifier/admin cards
    pub folder: u8,
    /// Sequencing policy
    pub mode: PlayMode,
    /// First mode-specific parameter
    pub special: u8,
    /// Second mode-specific parameter
    pub special2: u8,
}

impl FolderSettings {
    /// Settings with no parameters.
    pub const fn new(folder: u8, mode: PlayMode) -> Self {
        Self { folder, mode, special: 0, special2: 0 }
    }

    /// Settings for a range mode.
    pub const fn with_range(folder: u8, mode: PlayMode, first: u8, last: u8) -> Self {
        Self { folder, mode, special: first, special2: last }
    }

    /// Empty shortcut slot.
    pub const EMPTY: Self = Self::new(0, PlayMode::Uninitialized);

    /// `true` when this can start playback (shortcut slots, tags).
    pub const fn is_playable(&self) -> bool {
        self.folder != 0 && self.folder != 255 && self.mode.is_playable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_mode_bytes_round_trip() {
        for byte in (0..=9u8).chain(core::iter::once(255)) {
            assert_eq!(PlayMode::from_u8(byte).as_u8(), byte);
        }
    }

    #[test]
    fn test_unknown_mode_byte_is_uninitialized() {
        assert_eq!(PlayMode::from_u8(10), PlayMode::Uninitialized);
        assert_eq!(PlayMode::from_u8(254), PlayMode::Uninitialized);
    }

    #[test]
    fn test_empty_shortcut_is_not_playable() {
        assert!(!FolderSettings::EMPTY.is_playable());
        assert!(FolderSettings::new(4, PlayMode::Album).is_playable());
        assert!(!FolderSettings::new(4, PlayMode::Uninitialized).is_playable());
    }
}
