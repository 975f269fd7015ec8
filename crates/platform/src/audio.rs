//! Audio player abstraction
//!
//! Models the serial MP3 module: numbered folders of numbered tracks, a
//! separate pool of notification prompts, and short advertisement cues that
//! interrupt the running track and then resume it.

/// MP3 module interface
///
/// Every command is fire-and-forget from the caller's point of view; the
/// driver owns framing, acknowledgements and its own bounded retries.
pub trait AudioPlayer {
    /// Error type
    type Error: core::fmt::Debug;

    /// Start `track` of `folder`, replacing whatever is playing.
    fn play(&mut self, folder: u8, track: u16) -> Result<(), Self::Error>;

    /// Play a notification prompt by its numeric id.
    fn play_notification(&mut self, id: u16) -> Result<(), Self::Error>;

    /// Interrupt the running track with a short cue, then resume it.
    fn play_advertisement(&mut self, id: u16) -> Result<(), Self::Error>;

    /// Pause playback, keeping the position.
    fn pause(&mut self) -> Result<(), Self::Error>;

    /// Resume paused playback.
    fn resume(&mut self) -> Result<(), Self::Error>;

    /// Stop playback.
    fn stop(&mut self) -> Result<(), Self::Error>;

    /// `true` while the module reports busy.
    fn is_playing(&mut self) -> bool;

    /// Set absolute volume (0..=[`MAX_VOLUME`](crate::config::MAX_VOLUME)).
    fn set_volume(&mut self, volume: u8) -> Result<(), Self::Error>;

    /// Raise the volume by one step.
    fn increase_volume(&mut self) -> Result<(), Self::Error>;

    /// Lower the volume by one step.
    fn decrease_volume(&mut self) -> Result<(), Self::Error>;

    /// Select an equalizer preset.
    fn set_equalizer(&mut self, eq: Equalizer) -> Result<(), Self::Error>;

    /// Number of tracks stored in `folder`.
    fn track_count(&mut self, folder: u8) -> Result<u16, Self::Error>;

    /// Put the module into its low-power sleep.
    fn sleep(&mut self) -> Result<(), Self::Error>;

    /// Edge-triggered "track finished" report: returns the finished track
    /// number once, then `None` until the next track ends.
    fn poll_finished(&mut self) -> Option<u16>;
}

/// Equalizer presets supported by the MP3 module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Equalizer {
    /// Flat response
    #[default]
    Normal,
    /// Pop
    Pop,
    /// Rock
    Rock,
    /// Jazz
    Jazz,
    /// Classic
    Classic,
    /// Bass boost
    Bass,
}

impl Equalizer {
    /// Map the 1-based admin setting (1..=6) to a preset.
    ///
    /// Out-of-range values fall back to [`Equalizer::Normal`].
    pub const fn from_setting(value: u8) -> Self {
        match value {
            2 => Self::Pop,
            3 => Self::Rock,
            4 => Self::Jazz,
            5 => Self::Classic,
            6 => Self::Bass,
            _ => Self::Normal,
        }
    }

    /// The 1-based admin setting for this preset.
    pub const fn setting(self) -> u8 {
        match self {
            Self::Normal => 1,
            Self::Pop => 2,
            Self::Rock => 3,
            Self::Jazz => 4,
            Self::Classic => 5,
            Self::Bass => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equalizer_setting_maps_both_ways() {
        for value in 1..=6u8 {
            assert_eq!(Equalizer::from_setting(value).setting(), value);
        }
    }

    #[test]
    fn test_equalizer_unknown_setting_is_normal() {
        assert_eq!(Equalizer::from_setting(0), Equalizer::Normal);
        assert_eq!(Equalizer::from_setting(7), Equalizer::Normal);
    }
}
