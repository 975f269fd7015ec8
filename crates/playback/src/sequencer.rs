//! Track sequencing per play mode.
//!
//! `TrackSequencer` is a pure state machine: it decides which track plays
//! first, next and previous for one active folder. It never talks to the
//! audio driver; the caller turns each [`NextAction`] into driver commands.
//! AudioBook progress goes through the [`ProgressStore`] seam.

use heapless::Vec;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use records::{FolderSettings, PlayMode};

/// Most tracks the MP3 module addresses in one folder.
pub const MAX_TRACKS_PER_FOLDER: u16 = 255;

const QUEUE_CAPACITY: usize = MAX_TRACKS_PER_FOLDER as usize;

/// Per-folder AudioBook progress.
///
/// Implementations log and swallow write failures; progress is best-effort
/// and must never stop playback.
pub trait ProgressStore {
    /// Last persisted track for `folder`, if any.
    fn load_progress(&mut self, folder: u8) -> Option<u16>;

    /// Persist `track` as the progress of `folder`, overwriting.
    fn save_progress(&mut self, folder: u8, track: u16);
}

/// What the caller should do after a next/previous decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NextAction {
    /// Start this track of the active folder
    PlayTrack(u16),
    /// Nothing more to play: stop and arm standby
    StopAndSuspend,
}

/// Errors returned by [`TrackSequencer::begin_folder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequenceError {
    /// The folder holds no tracks
    #[error("folder is empty")]
    EmptyFolder,
    /// Range or single-track parameters point outside the folder
    #[error("track range outside folder")]
    InvalidRange,
    /// The mode does not play anything
    #[error("mode has no sequencing policy")]
    UnsupportedMode,
}

/// Sequencing state for the active folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerState {
    /// Current track; for Party modes the 1-based index into `queue`
    pub current_track: u16,
    /// Lowest playable track
    pub first_track: u16,
    /// Highest playable track
    pub track_count: u16,
    /// Shuffled play order (Party modes only)
    pub queue: Vec<u16, QUEUE_CAPACITY>,
}

/// Sequencer for one active folder.
#[derive(Debug, Clone)]
pub struct TrackSequencer {
    settings: FolderSettings,
    state: SequencerState,
}

impl TrackSequencer {
    /// Start a folder.
    ///
    /// `folder_tracks` is the driver's track count for `settings.folder`.
    /// Range modes use `special..=special2` (clamped to the folder).
    ///
    /// # Errors
    ///
    /// - [`SequenceError::EmptyFolder`] if the folder has no tracks
    /// - [`SequenceError::InvalidRange`] if the range or single track lies outside it
    /// - [`SequenceError::UnsupportedMode`] for modes that play nothing
    pub fn begin_folder<R, P>(
        settings: FolderSettings,
        folder_tracks: u16,
        rng: &mut R,
        progress: &mut P,
    ) -> Result<Self, SequenceError>
    where
        R: RngCore + ?Sized,
        P: ProgressStore + ?Sized,
    {
        if !settings.mode.is_playable() {
            return Err(SequenceError::UnsupportedMode);
        }
        let folder_tracks = folder_tracks.min(MAX_TRACKS_PER_FOLDER);
        if folder_tracks == 0 {
            return Err(SequenceError::EmptyFolder);
        }

        let (first, last) = if settings.mode.is_range() {
            let last = u16::from(settings.special2).min(folder_tracks);
            (u16::from(settings.special), last)
        } else {
            (1, folder_tracks)
        };
        if first == 0 || first > last {
            return Err(SequenceError::InvalidRange);
        }

        let mut state = SequencerState {
            current_track: first,
            first_track: first,
            track_count: last,
            queue: Vec::new(),
        };

        match settings.mode {
            PlayMode::RandomTrack | PlayMode::RandomRange => {
                state.current_track = rng.gen_range(first..=last);
            }
            PlayMode::Party | PlayMode::PartyRange => {
                for track in first..=last {
                    state.queue.push(track).map_err(|_| SequenceError::InvalidRange)?;
                }
                state.queue.as_mut_slice().shuffle(rng);
                state.current_track = 1;
            }
            PlayMode::SingleTrack => {
                let track = u16::from(settings.special);
                if track == 0 || track > last {
                    return Err(SequenceError::InvalidRange);
                }
                state.current_track = track;
            }
            PlayMode::AudioBook => {
                state.current_track = progress
                    .load_progress(settings.folder)
                    .filter(|track| (first..=last).contains(track))
                    .unwrap_or(first);
            }
            // Album/AlbumRange start at `first`; the rest were rejected above.
            _ => {}
        }

        Ok(Self { settings, state })
    }

    /// Settings this session was started with.
    #[must_use]
    pub fn settings(&self) -> &FolderSettings {
        &self.settings
    }

    /// Raw sequencing state.
    #[must_use]
    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    /// Track number to hand to the driver right now.
    #[must_use]
    pub fn current(&self) -> u16 {
        if self.is_party() {
            self.queue_track(self.state.current_track)
        } else {
            self.state.current_track
        }
    }

    /// Track number as announced to the listener (range modes count from 1).
    #[must_use]
    pub fn position_announcement(&self) -> u16 {
        let track = self.current();
        if self.settings.mode.is_range() {
            track.saturating_sub(self.state.first_track).saturating_add(1)
        } else {
            track
        }
    }

    /// Advance after a track finished or the next button was pressed.
    pub fn next<P: ProgressStore + ?Sized>(&mut self, progress: &mut P) -> NextAction {
        let state = &mut self.state;
        match self.settings.mode {
            PlayMode::Album | PlayMode::AlbumRange => {
                if state.current_track < state.track_count {
                    state.current_track = state.current_track.saturating_add(1);
                    NextAction::PlayTrack(state.current_track)
                } else {
                    NextAction::StopAndSuspend
                }
            }
            PlayMode::Party | PlayMode::PartyRange => {
                let len = queue_len(&state.queue);
                state.current_track = if state.current_track < len {
                    state.current_track.saturating_add(1)
                } else {
                    1
                };
                NextAction::PlayTrack(self.current())
            }
            PlayMode::AudioBook => {
                if state.current_track < state.track_count {
                    state.current_track = state.current_track.saturating_add(1);
                    progress.save_progress(self.settings.folder, state.current_track);
                    NextAction::PlayTrack(state.current_track)
                } else {
                    progress.save_progress(self.settings.folder, 1);
                    NextAction::StopAndSuspend
                }
            }
            _ => NextAction::StopAndSuspend,
        }
    }

    /// Step back after the previous button was pressed.
    ///
    /// Returns `None` for the random modes, which keep no history.
    pub fn previous<P: ProgressStore + ?Sized>(&mut self, progress: &mut P) -> Option<NextAction> {
        let state = &mut self.state;
        match self.settings.mode {
            PlayMode::Album | PlayMode::AlbumRange => {
                if state.current_track > state.first_track {
                    state.current_track = state.current_track.saturating_sub(1);
                }
                Some(NextAction::PlayTrack(state.current_track))
            }
            PlayMode::Party | PlayMode::PartyRange => {
                state.current_track = if state.current_track > 1 {
                    state.current_track.saturating_sub(1)
                } else {
                    queue_len(&state.queue)
                };
                Some(NextAction::PlayTrack(self.current()))
            }
            PlayMode::AudioBook => {
                if state.current_track > state.first_track {
                    state.current_track = state.current_track.saturating_sub(1);
                }
                progress.save_progress(self.settings.folder, state.current_track);
                Some(NextAction::PlayTrack(state.current_track))
            }
            PlayMode::SingleTrack => Some(NextAction::PlayTrack(state.current_track)),
            _ => None,
        }
    }

    fn is_party(&self) -> bool {
        matches!(self.settings.mode, PlayMode::Party | PlayMode::PartyRange)
    }

    fn queue_track(&self, index: u16) -> u16 {
        usize::from(index)
            .checked_sub(1)
            .and_then(|i| self.state.queue.get(i))
            .copied()
            .unwrap_or(self.state.first_track)
    }
}

fn queue_len(queue: &[u16]) -> u16 {
    u16::try_from(queue.len()).unwrap_or(MAX_TRACKS_PER_FOLDER)
}
