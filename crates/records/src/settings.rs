//! Admin settings and their EEPROM image.
//!
//! The image is a fixed header followed by a postcard payload:
//!
//! ```text
//! [0..4]   cookie    u32 be  (same magic as tags)
//! [4]      version   u8 = SETTINGS_VERSION
//! [5]      len       u8   payload length
//! [6..10]  crc32     u32 le  over the payload
//! [10..]   payload   postcard(AdminSettings)
//! ```

use crate::folder::FolderSettings;
use crate::tag::CARD_COOKIE;
use platform::config::MAX_VOLUME;
use platform::storage::SETTINGS_MAX_LEN;
use serde::{Deserialize, Serialize};

/// Settings layout version.
pub const SETTINGS_VERSION: u8 = 2;

const HEADER_LEN: usize = 10;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Error variants for settings image encode/decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// Image cookie is not ours (erased or foreign EEPROM)
    #[error("settings cookie mismatch")]
    BadCookie,
    /// Image written by an incompatible layout version
    #[error("unsupported settings version")]
    UnsupportedVersion,
    /// Payload CRC mismatch
    #[error("settings checksum mismatch")]
    Checksum,
    /// Settings do not fit the image
    #[error("settings encode failed")]
    Encode,
    /// postcard decode failed (corrupt or truncated data)
    #[error("settings decode failed")]
    Decode,
}

// ---------------------------------------------------------------------------
// MenuLock
// ---------------------------------------------------------------------------

/// Gate in front of the admin menu when opened by buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuLock {
    /// Open
    #[default]
    None,
    /// Only an admin card opens the menu
    Card,
    /// Four-digit button PIN
    Pin,
    /// Solve an addition or subtraction
    ArithmeticChallenge,
}

impl From<u8> for MenuLock {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Card,
            2 => Self::Pin,
            3 => Self::ArithmeticChallenge,
            _ => Self::None,
        }
    }
}

impl From<MenuLock> for u8 {
    fn from(lock: MenuLock) -> Self {
        match lock {
            MenuLock::None => 0,
            MenuLock::Card => 1,
            MenuLock::Pin => 2,
            MenuLock::ArithmeticChallenge => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// AdminSettings
// ---------------------------------------------------------------------------

/// Everything the admin menu can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdminSettings {
    /// Upper volume bound
    pub max_volume: u8,
    /// Lower volume bound
    pub min_volume: u8,
    /// Volume applied at startup
    pub init_volume: u8,
    /// Equalizer preset, 1..=6
    pub eq: u8,
    /// Minutes of inactivity before power-down; 0 disables standby
    pub standby_minutes: u16,
    /// Short press changes volume, long press skips tracks
    pub invert_volume_buttons: bool,
    /// Pause, up, down and startup shortcuts
    pub shortcuts: [FolderSettings; 4],
    /// Gate for button-opened admin menu
    pub menu_lock: MenuLock,
    /// PIN digits (1 = pause, 2 = up, 3 = down)
    pub pin: [u8; 4],
}

impl AdminSettings {
    /// Shortcut slot played by a pause long press while idle.
    pub const SHORTCUT_PAUSE: usize = 0;
    /// Shortcut slot played by an up long press while idle.
    pub const SHORTCUT_UP: usize = 1;
    /// Shortcut slot played by a down long press while idle.
    pub const SHORTCUT_DOWN: usize = 2;
    /// Shortcut slot played at startup.
    pub const SHORTCUT_STARTUP: usize = 3;

    /// Factory defaults.
    pub const fn new() -> Self {
        Self {
            max_volume: 25,
            min_volume: 5,
            init_volume: 15,
            eq: 1,
            standby_minutes: 0,
            invert_volume_buttons: true,
            shortcuts: [FolderSettings::EMPTY; 4],
            menu_lock: MenuLock::None,
            pin: [1, 1, 1, 1],
        }
    }

    /// Shortcut in `slot`, if the slot exists and is configured.
    pub fn shortcut(&self, slot: usize) -> Option<FolderSettings> {
        self.shortcuts.get(slot).copied().filter(FolderSettings::is_playable)
    }

    /// Pull volume fields back into `min <= init <= max <= MAX_VOLUME`.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.max_volume = self.max_volume.clamp(1, MAX_VOLUME);
        self.min_volume = self.min_volume.min(self.max_volume.saturating_sub(1));
        self.init_volume = self.init_volume.clamp(self.min_volume, self.max_volume);
        if !(1..=6).contains(&self.eq) {
            self.eq = 1;
        }
        self
    }

    /// Encode the header + payload image into `buf`; returns the used length.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Encode`] if the payload does not fit.
    pub fn encode_image(&self, buf: &mut [u8; SETTINGS_MAX_LEN]) -> Result<usize, RecordError> {
        let (header, body) = buf.split_at_mut(HEADER_LEN);
        let payload = postcard::to_slice(self, body).map_err(|_| RecordError::Encode)?;
        let len = u8::try_from(payload.len()).map_err(|_| RecordError::Encode)?;
        let crc = crc32fast::hash(payload);

        let mut fixed = [0u8; HEADER_LEN];
        let (cookie, rest) = fixed.split_at_mut(4);
        cookie.copy_from_slice(&CARD_COOKIE.to_be_bytes());
        let (meta, crc_bytes) = rest.split_at_mut(2);
        meta.copy_from_slice(&[SETTINGS_VERSION, len]);
        crc_bytes.copy_from_slice(&crc.to_le_bytes());
        header.copy_from_slice(&fixed);

        Ok(HEADER_LEN.saturating_add(usize::from(len)))
    }

    /// Decode an image produced by [`AdminSettings::encode_image`].
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::BadCookie`] for erased or foreign contents,
    /// [`RecordError::UnsupportedVersion`] for another layout version,
    /// [`RecordError::Checksum`] when the payload was corrupted, and
    /// [`RecordError::Decode`] when the payload cannot be parsed.
    pub fn decode_image(buf: &[u8]) -> Result<Self, RecordError> {
        let cookie = buf
            .get(0..4)
            .and_then(|b| <[u8; 4]>::try_from(b).ok())
            .map(u32::from_be_bytes)
            .ok_or(RecordError::Decode)?;
        if cookie != CARD_COOKIE {
            return Err(RecordError::BadCookie);
        }
        if buf.get(4).copied() != Some(SETTINGS_VERSION) {
            return Err(RecordError::UnsupportedVersion);
        }
        let len = buf.get(5).copied().map(usize::from).ok_or(RecordError::Decode)?;
        let crc = buf
            .get(6..HEADER_LEN)
            .and_then(|b| <[u8; 4]>::try_from(b).ok())
            .map(u32::from_le_bytes)
            .ok_or(RecordError::Decode)?;
        let payload = buf
            .get(HEADER_LEN..HEADER_LEN.saturating_add(len))
            .ok_or(RecordError::Decode)?;
        if crc32fast::hash(payload) != crc {
            return Err(RecordError::Checksum);
        }
        postcard::from_bytes(payload).map_err(|_| RecordError::Decode)
    }
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self::new()
    }
}
