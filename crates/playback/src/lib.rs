//! Playback sequencing — per-mode track order, AudioBook progress, volume bounds
#![cfg_attr(not(test), no_std)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod sequencer;
pub mod volume;

pub use sequencer::{
    NextAction, ProgressStore, SequenceError, SequencerState, TrackSequencer,
    MAX_TRACKS_PER_FOLDER,
};
pub use volume::VolumeControl;

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::panic
)]
mod tests {
    use std::collections::HashMap;

    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use crate::sequencer::ProgressStore;

    /// In-memory progress store recording every write.
    #[derive(Default)]
    pub(crate) struct MemoryProgress {
        pub slots: HashMap<u8, u16>,
        pub writes: usize,
    }

    impl ProgressStore for MemoryProgress {
        fn load_progress(&mut self, folder: u8) -> Option<u16> {
            self.slots.get(&folder).copied()
        }

        fn save_progress(&mut self, folder: u8, track: u16) {
            self.writes += 1;
            self.slots.insert(folder, track);
        }
    }

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    /// Sequencer policy tests
    mod sequencer_tests {
        use super::*;
        use crate::sequencer::{NextAction, SequenceError, TrackSequencer};
        use records::{FolderSettings, PlayMode};

        fn begin(settings: FolderSettings, tracks: u16, progress: &mut MemoryProgress) -> TrackSequencer {
            TrackSequencer::begin_folder(settings, tracks, &mut rng(), progress)
                .expect("folder should start")
        }

        #[test]
        fn test_album_ten_tracks_plays_through_then_suspends() {
            let mut progress = MemoryProgress::default();
            let mut seq = begin(FolderSettings::new(5, PlayMode::Album), 10, &mut progress);
            assert_eq!(seq.current(), 1);
            for expected in 2..=10 {
                assert_eq!(seq.next(&mut progress), NextAction::PlayTrack(expected));
            }
            assert_eq!(seq.next(&mut progress), NextAction::StopAndSuspend);
            assert_eq!(seq.current(), 10);
        }

        #[test]
        fn test_album_previous_clamps_at_first() {
            let mut progress = MemoryProgress::default();
            let mut seq = begin(FolderSettings::new(5, PlayMode::Album), 10, &mut progress);
            assert_eq!(seq.previous(&mut progress), Some(NextAction::PlayTrack(1)));
            seq.next(&mut progress);
            assert_eq!(seq.previous(&mut progress), Some(NextAction::PlayTrack(1)));
        }

        #[test]
        fn test_album_range_uses_special_bounds() {
            let mut progress = MemoryProgress::default();
            let settings = FolderSettings::with_range(2, PlayMode::AlbumRange, 4, 6);
            let mut seq = begin(settings, 20, &mut progress);
            assert_eq!(seq.current(), 4);
            assert_eq!(seq.position_announcement(), 1);
            assert_eq!(seq.next(&mut progress), NextAction::PlayTrack(5));
            assert_eq!(seq.next(&mut progress), NextAction::PlayTrack(6));
            assert_eq!(seq.position_announcement(), 3);
            assert_eq!(seq.next(&mut progress), NextAction::StopAndSuspend);
            assert_eq!(seq.previous(&mut progress), Some(NextAction::PlayTrack(5)));
        }

        #[test]
        fn test_range_clamped_to_folder() {
            let mut progress = MemoryProgress::default();
            let settings = FolderSettings::with_range(2, PlayMode::AlbumRange, 3, 50);
            let seq = begin(settings, 8, &mut progress);
            assert_eq!(seq.state().track_count, 8);
        }

        #[test]
        fn test_inverted_range_is_rejected() {
            let settings = FolderSettings::with_range(2, PlayMode::PartyRange, 7, 3);
            let result =
                TrackSequencer::begin_folder(settings, 10, &mut rng(), &mut MemoryProgress::default());
            assert_eq!(result.err(), Some(SequenceError::InvalidRange));
        }

        #[test]
        fn test_empty_folder_is_rejected() {
            let result = TrackSequencer::begin_folder(
                FolderSettings::new(3, PlayMode::Album),
                0,
                &mut rng(),
                &mut MemoryProgress::default(),
            );
            assert_eq!(result.err(), Some(SequenceError::EmptyFolder));
        }

        #[test]
        fn test_admin_mode_has_no_sequence() {
            let result = TrackSequencer::begin_folder(
                FolderSettings::new(3, PlayMode::AdminMenu),
                5,
                &mut rng(),
                &mut MemoryProgress::default(),
            );
            assert_eq!(result.err(), Some(SequenceError::UnsupportedMode));
        }

        #[test]
        fn test_random_track_stays_in_range_and_never_advances() {
            let mut progress = MemoryProgress::default();
            let settings = FolderSettings::with_range(1, PlayMode::RandomRange, 10, 12);
            let mut seq = begin(settings, 30, &mut progress);
            assert!((10..=12).contains(&seq.current()));
            assert_eq!(seq.next(&mut progress), NextAction::StopAndSuspend);
            assert_eq!(seq.previous(&mut progress), None);
        }

        #[test]
        fn test_single_track_replays_on_previous() {
            let mut progress = MemoryProgress::default();
            let mut settings = FolderSettings::new(4, PlayMode::SingleTrack);
            settings.special = 3;
            let mut seq = begin(settings, 5, &mut progress);
            assert_eq!(seq.current(), 3);
            assert_eq!(seq.next(&mut progress), NextAction::StopAndSuspend);
            assert_eq!(seq.previous(&mut progress), Some(NextAction::PlayTrack(3)));
        }

        #[test]
        fn test_single_track_outside_folder_is_rejected() {
            let mut settings = FolderSettings::new(4, PlayMode::SingleTrack);
            settings.special = 9;
            let result =
                TrackSequencer::begin_folder(settings, 5, &mut rng(), &mut MemoryProgress::default());
            assert_eq!(result.err(), Some(SequenceError::InvalidRange));
        }

        #[test]
        fn test_party_wraps_without_reshuffle() {
            let mut progress = MemoryProgress::default();
            let mut seq = begin(FolderSettings::new(6, PlayMode::Party), 5, &mut progress);
            let mut first_cycle = vec![seq.current()];
            for _ in 1..5 {
                match seq.next(&mut progress) {
                    NextAction::PlayTrack(t) => first_cycle.push(t),
                    NextAction::StopAndSuspend => panic!("party never suspends"),
                }
            }
            let mut second_cycle = Vec::new();
            for _ in 0..5 {
                if let NextAction::PlayTrack(t) = seq.next(&mut progress) {
                    second_cycle.push(t);
                }
            }
            assert_eq!(first_cycle, second_cycle);
        }

        #[test]
        fn test_party_previous_wraps_to_last() {
            let mut progress = MemoryProgress::default();
            let mut seq = begin(FolderSettings::new(6, PlayMode::Party), 4, &mut progress);
            let last = seq.state().queue[3];
            assert_eq!(seq.previous(&mut progress), Some(NextAction::PlayTrack(last)));
            assert_eq!(seq.state().current_track, 4);
        }

        #[test]
        fn test_audiobook_resumes_persisted_progress() {
            let mut progress = MemoryProgress::default();
            progress.slots.insert(9, 4);
            let mut seq = begin(FolderSettings::new(9, PlayMode::AudioBook), 6, &mut progress);
            assert_eq!(seq.current(), 4);
            assert_eq!(seq.next(&mut progress), NextAction::PlayTrack(5));
            assert_eq!(progress.slots[&9], 5);
        }

        #[test]
        fn test_audiobook_corrupt_progress_falls_back_to_one() {
            let mut progress = MemoryProgress::default();
            progress.slots.insert(9, 0xFFFF);
            let seq = begin(FolderSettings::new(9, PlayMode::AudioBook), 6, &mut progress);
            assert_eq!(seq.current(), 1);
        }

        #[test]
        fn test_audiobook_exhaustion_resets_progress() {
            let mut progress = MemoryProgress::default();
            progress.slots.insert(9, 6);
            let mut seq = begin(FolderSettings::new(9, PlayMode::AudioBook), 6, &mut progress);
            assert_eq!(seq.next(&mut progress), NextAction::StopAndSuspend);
            assert_eq!(progress.slots[&9], 1);
        }

        #[test]
        fn test_audiobook_previous_clamps_and_persists() {
            let mut progress = MemoryProgress::default();
            let mut seq = begin(FolderSettings::new(9, PlayMode::AudioBook), 6, &mut progress);
            assert_eq!(seq.previous(&mut progress), Some(NextAction::PlayTrack(1)));
            assert_eq!(progress.slots[&9], 1);
            assert_eq!(progress.writes, 1);
        }
    }

    /// Volume bound tests
    mod volume_tests {
        use crate::volume::VolumeControl;
        use platform::config::MAX_VOLUME;

        #[test]
        fn test_volume_starts_clamped() {
            assert_eq!(VolumeControl::new(40, 5, 25).level(), 25);
            assert_eq!(VolumeControl::new(1, 5, 25).level(), 5);
        }

        #[test]
        fn test_volume_steps_stop_at_bounds() {
            let mut volume = VolumeControl::new(24, 5, 25);
            assert!(volume.step_up());
            assert!(!volume.step_up());
            assert_eq!(volume.level(), 25);

            let mut volume = VolumeControl::new(5, 5, 25);
            assert!(!volume.step_down());
        }

        #[test]
        fn test_max_capped_to_driver_range() {
            assert_eq!(VolumeControl::new(10, 0, 99).bounds(), (0, MAX_VOLUME));
        }

        #[test]
        fn test_set_bounds_reports_moved_level() {
            let mut volume = VolumeControl::new(20, 5, 25);
            assert!(volume.set_bounds(5, 15));
            assert_eq!(volume.level(), 15);
            assert!(!volume.set_bounds(1, 30));
        }
    }
}
