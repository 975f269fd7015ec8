//! EEPROM-backed persistence for settings and AudioBook progress.
//!
//! Layout (see `platform::storage`):
//!
//! ```text
//! 0x000  progress slots, u16 LE per folder 0..=255
//! 0x200  settings image (header + postcard payload)
//! ```

use embedded_storage::Storage;
use playback::ProgressStore;
use platform::storage::{progress_offset, EEPROM_SIZE, SETTINGS_BASE, SETTINGS_MAX_LEN};
use records::{AdminSettings, RecordError};

use crate::error::StoreError;

/// Settings persistence used by the controller.
pub trait SettingsStore {
    /// Load settings. Invalid or outdated images are replaced by defaults.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if the device cannot be read.
    fn load_settings(&mut self) -> Result<AdminSettings, StoreError>;

    /// Persist `settings`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] on write failure, [`StoreError::Record`] if the image does not fit.
    fn save_settings(&mut self, settings: &AdminSettings) -> Result<(), StoreError>;

    /// Wipe settings and all progress slots.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] on write failure.
    fn erase(&mut self) -> Result<(), StoreError>;
}

const ERASE_CHUNK: usize = 32;

/// [`SettingsStore`] + [`ProgressStore`] over any `embedded-storage` device.
pub struct PersistentStore<E> {
    eeprom: E,
}

impl<E: Storage> PersistentStore<E> {
    /// Wrap an EEPROM driver.
    pub fn new(eeprom: E) -> Self {
        Self { eeprom }
    }

    /// Borrow the underlying device.
    pub fn eeprom(&self) -> &E {
        &self.eeprom
    }

    /// Mutably borrow the underlying device.
    pub fn eeprom_mut(&mut self) -> &mut E {
        &mut self.eeprom
    }

    /// Give the device back.
    pub fn release(self) -> E {
        self.eeprom
    }

    fn reset_to_defaults(&mut self, cause: RecordError) -> Result<AdminSettings, StoreError> {
        warn!("settings image rejected ({}), writing defaults", record_error_name(cause));
        let defaults = AdminSettings::new();
        self.save_settings(&defaults)?;
        Ok(defaults)
    }
}

impl<E: Storage> SettingsStore for PersistentStore<E> {
    fn load_settings(&mut self) -> Result<AdminSettings, StoreError> {
        let mut image = [0u8; SETTINGS_MAX_LEN];
        self.eeprom.read(SETTINGS_BASE, &mut image).map_err(|_| StoreError::Io)?;
        match AdminSettings::decode_image(&image) {
            Ok(settings) => {
                debug!("settings loaded");
                Ok(settings.sanitized())
            }
            Err(cause) => self.reset_to_defaults(cause),
        }
    }

    fn save_settings(&mut self, settings: &AdminSettings) -> Result<(), StoreError> {
        let mut image = [0u8; SETTINGS_MAX_LEN];
        let len = settings.encode_image(&mut image).map_err(StoreError::Record)?;
        let used = image.get(..len).ok_or(StoreError::Record(RecordError::Encode))?;
        self.eeprom.write(SETTINGS_BASE, used).map_err(|_| StoreError::Io)?;
        debug!("settings saved ({} bytes)", len);
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        let zeros = [0u8; ERASE_CHUNK];
        let end = EEPROM_SIZE.min(self.eeprom.capacity());
        let mut offset = 0usize;
        while offset < end {
            let len = ERASE_CHUNK.min(end.saturating_sub(offset));
            let chunk = zeros.get(..len).ok_or(StoreError::Io)?;
            let address = u32::try_from(offset).map_err(|_| StoreError::Io)?;
            self.eeprom.write(address, chunk).map_err(|_| StoreError::Io)?;
            offset = offset.saturating_add(len);
        }
        info!("storage erased");
        Ok(())
    }
}

impl<E: Storage> ProgressStore for PersistentStore<E> {
    fn load_progress(&mut self, folder: u8) -> Option<u16> {
        let mut slot = [0u8; 2];
        match self.eeprom.read(progress_offset(folder), &mut slot) {
            Ok(()) => Some(u16::from_le_bytes(slot)),
            Err(_) => {
                warn!("progress read failed for folder {}", folder);
                None
            }
        }
    }

    fn save_progress(&mut self, folder: u8, track: u16) {
        if self.eeprom.write(progress_offset(folder), &track.to_le_bytes()).is_err() {
            warn!("progress write failed for folder {}", folder);
        }
    }
}

fn record_error_name(err: RecordError) -> &'static str {
    match err {
        RecordError::BadCookie => "cookie",
        RecordError::UnsupportedVersion => "version",
        RecordError::Checksum => "checksum",
        RecordError::Encode => "encode",
        RecordError::Decode => "decode",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use platform::mocks::MockEeprom;
    use records::MenuLock;

    fn store() -> PersistentStore<MockEeprom> {
        PersistentStore::new(MockEeprom::new())
    }

    #[test]
    fn test_blank_eeprom_loads_and_writes_defaults() {
        let mut store = store();
        let settings = store.load_settings().unwrap();
        assert_eq!(settings, AdminSettings::new());
        // second load finds a valid image
        let base = usize::try_from(SETTINGS_BASE).unwrap();
        assert_ne!(store.eeprom().bytes()[base], 0xFF);
        assert_eq!(store.load_settings().unwrap(), AdminSettings::new());
    }

    #[test]
    fn test_settings_round_trip() {
        let mut store = store();
        let mut settings = AdminSettings::new();
        settings.max_volume = 20;
        settings.menu_lock = MenuLock::Pin;
        settings.pin = [3, 2, 1, 1];
        store.save_settings(&settings).unwrap();
        assert_eq!(store.load_settings().unwrap(), settings);
    }

    #[test]
    fn test_corrupted_image_resets_to_defaults() {
        let mut store = store();
        let mut settings = AdminSettings::new();
        settings.standby_minutes = 15;
        store.save_settings(&settings).unwrap();
        let base = usize::try_from(SETTINGS_BASE).unwrap();
        store.eeprom_mut().bytes_mut()[base + 12] ^= 0x5A;
        assert_eq!(store.load_settings().unwrap(), AdminSettings::new());
    }

    #[test]
    fn test_io_failure_is_reported() {
        let mut store = store();
        store.eeprom_mut().set_failing(true);
        assert_eq!(store.load_settings(), Err(StoreError::Io));
        assert_eq!(store.save_settings(&AdminSettings::new()), Err(StoreError::Io));
    }

    #[test]
    fn test_progress_slots_are_per_folder() {
        let mut store = store();
        store.save_progress(3, 7);
        store.save_progress(4, 2);
        assert_eq!(store.load_progress(3), Some(7));
        assert_eq!(store.load_progress(4), Some(2));
    }

    #[test]
    fn test_erase_clears_progress_and_settings() {
        let mut store = store();
        store.save_progress(9, 12);
        let mut settings = AdminSettings::new();
        settings.eq = 4;
        store.save_settings(&settings).unwrap();
        store.erase().unwrap();
        assert_eq!(store.load_progress(9), Some(0));
        assert_eq!(store.load_settings().unwrap(), AdminSettings::new());
    }
}
