//! Property tests for per-mode track sequencing.
#![allow(clippy::panic)]
#![allow(clippy::arithmetic_side_effects)]

use std::collections::HashMap;

use playback::{NextAction, ProgressStore, TrackSequencer};
use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use records::{FolderSettings, PlayMode};

#[derive(Default)]
struct MemoryProgress(HashMap<u8, u16>);

impl ProgressStore for MemoryProgress {
    fn load_progress(&mut self, folder: u8) -> Option<u16> {
        self.0.get(&folder).copied()
    }

    fn save_progress(&mut self, folder: u8, track: u16) {
        self.0.insert(folder, track);
    }
}

fn collect_cycle(seq: &mut TrackSequencer, progress: &mut MemoryProgress, len: u16) -> Vec<u16> {
    let mut tracks = vec![seq.current()];
    for _ in 1..len {
        if let NextAction::PlayTrack(track) = seq.next(progress) {
            tracks.push(track);
        }
    }
    tracks
}

proptest! {
    /// Album/AlbumRange: exactly one StopAndSuspend after the last track.
    #[test]
    fn album_suspends_exactly_once(count in 1u16..=60, seed in any::<u64>()) {
        let mut progress = MemoryProgress::default();
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut seq = TrackSequencer::begin_folder(
            FolderSettings::new(1, PlayMode::Album), count, &mut rng, &mut progress,
        ).unwrap_or_else(|e| panic!("album start failed: {e}"));

        let mut suspends = 0;
        for _ in 0..count {
            match seq.next(&mut progress) {
                NextAction::PlayTrack(track) => prop_assert!(track <= count),
                NextAction::StopAndSuspend => suspends += 1,
            }
        }
        prop_assert_eq!(suspends, 1);
    }

    /// Party/PartyRange: one cycle is a permutation; the next cycle repeats it.
    #[test]
    fn party_cycle_is_stable_permutation(
        first in 1u8..=20,
        span in 0u8..=40,
        seed in any::<u64>(),
    ) {
        let last = first.saturating_add(span);
        let settings = FolderSettings::with_range(3, PlayMode::PartyRange, first, last);
        let mut progress = MemoryProgress::default();
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut seq = TrackSequencer::begin_folder(settings, 255, &mut rng, &mut progress)
            .unwrap_or_else(|e| panic!("party start failed: {e}"));

        let len = u16::from(span) + 1;
        let cycle = collect_cycle(&mut seq, &mut progress, len);
        let mut sorted = cycle.clone();
        sorted.sort_unstable();
        let expected: Vec<u16> = (u16::from(first)..=u16::from(last)).collect();
        prop_assert_eq!(sorted, expected);

        let _ = seq.next(&mut progress);
        let again = collect_cycle(&mut seq, &mut progress, len);
        prop_assert_eq!(cycle, again);
    }

    /// AudioBook progress always stays within [1, track_count].
    #[test]
    fn audiobook_progress_in_bounds(
        count in 1u16..=40,
        stored in any::<u16>(),
        steps in 0usize..100,
    ) {
        let mut progress = MemoryProgress::default();
        progress.0.insert(7, stored);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut seq = TrackSequencer::begin_folder(
            FolderSettings::new(7, PlayMode::AudioBook), count, &mut rng, &mut progress,
        ).unwrap_or_else(|e| panic!("audiobook start failed: {e}"));
        prop_assert!((1..=count).contains(&seq.current()));

        for _ in 0..steps {
            let _ = seq.next(&mut progress);
            let saved = progress.0[&7];
            prop_assert!(saved >= 1 && saved <= count);
        }
    }
}
