//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests and by the desktop simulator.

#![cfg(any(test, feature = "std"))]

use crate::storage::{ReadStorage, Storage, EEPROM_SIZE};
use crate::*;
use std::vec;
use std::vec::Vec;

/// Failure injected by a mock driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    /// The mock was told to fail
    Injected,
    /// No tag on the reader
    NoTag,
    /// Access beyond the end of the mock EEPROM
    OutOfBounds,
}

/// One command received by [`MockAudio`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCall {
    /// `play(folder, track)`
    Play(u8, u16),
    /// `play_notification(id)`
    Notification(u16),
    /// `play_advertisement(id)`
    Advertisement(u16),
    /// `pause()`
    Pause,
    /// `resume()`
    Resume,
    /// `stop()`
    Stop,
    /// `set_volume(v)`
    SetVolume(u8),
    /// `increase_volume()`
    VolumeUp,
    /// `decrease_volume()`
    VolumeDown,
    /// `set_equalizer(eq)`
    Equalizer(Equalizer),
    /// `sleep()`
    Sleep,
}

/// Mock MP3 module
///
/// Tracks keep "playing" until [`MockAudio::finish_track`] is called.
/// Notifications and advertisements are recorded but do not touch the busy flag.
/// A notification unloads the current track, as the module does, so a later
/// `resume()` has nothing to continue.
pub struct MockAudio {
    calls: Vec<AudioCall>,
    track_counts: Vec<u16>,
    current: Option<(u8, u16)>,
    playing: bool,
    volume: u8,
    finished: Option<u16>,
    failing: bool,
}

impl MockAudio {
    /// Create new mock with every folder empty
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            track_counts: vec![0; 256],
            current: None,
            playing: false,
            volume: 0,
            finished: None,
            failing: false,
        }
    }

    /// Builder: give `folder` `count` tracks
    #[must_use]
    pub fn with_folder(mut self, folder: u8, count: u16) -> Self {
        self.set_track_count(folder, count);
        self
    }

    /// Set the number of tracks in `folder`
    pub fn set_track_count(&mut self, folder: u8, count: u16) {
        if let Some(slot) = self.track_counts.get_mut(usize::from(folder)) {
            *slot = count;
        }
    }

    /// Make every subsequent command fail
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// End the current track and report it through `poll_finished`
    pub fn finish_track(&mut self) {
        if let Some((_, track)) = self.current {
            self.playing = false;
            self.finished = Some(track);
        }
    }

    /// All commands received so far
    pub fn calls(&self) -> &[AudioCall] {
        &self.calls
    }

    /// Drain the command log
    pub fn take_calls(&mut self) -> Vec<AudioCall> {
        core::mem::take(&mut self.calls)
    }

    /// Notification ids played so far
    pub fn notifications(&self) -> Vec<u16> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                AudioCall::Notification(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Advertisement ids played so far
    pub fn advertisements(&self) -> Vec<u16> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                AudioCall::Advertisement(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// `(folder, track)` pairs started so far
    pub fn played(&self) -> Vec<(u8, u16)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                AudioCall::Play(folder, track) => Some((*folder, *track)),
                _ => None,
            })
            .collect()
    }

    /// Track loaded in the player
    pub fn current(&self) -> Option<(u8, u16)> {
        self.current
    }

    /// Current volume
    pub fn volume(&self) -> u8 {
        self.volume
    }

    fn record(&mut self, call: AudioCall) -> Result<(), MockError> {
        if self.failing {
            return Err(MockError::Injected);
        }
        self.calls.push(call);
        Ok(())
    }
}

impl Default for MockAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlayer for MockAudio {
    type Error = MockError;

    fn play(&mut self, folder: u8, track: u16) -> Result<(), Self::Error> {
        self.record(AudioCall::Play(folder, track))?;
        self.current = Some((folder, track));
        self.playing = true;
        self.finished = None;
        Ok(())
    }

    fn play_notification(&mut self, id: u16) -> Result<(), Self::Error> {
        self.record(AudioCall::Notification(id))?;
        self.current = None;
        Ok(())
    }

    fn play_advertisement(&mut self, id: u16) -> Result<(), Self::Error> {
        self.record(AudioCall::Advertisement(id))
    }

    fn pause(&mut self) -> Result<(), Self::Error> {
        self.record(AudioCall::Pause)?;
        self.playing = false;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), Self::Error> {
        self.record(AudioCall::Resume)?;
        self.playing = self.current.is_some();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.record(AudioCall::Stop)?;
        self.playing = false;
        self.current = None;
        Ok(())
    }

    fn is_playing(&mut self) -> bool {
        self.playing
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), Self::Error> {
        self.record(AudioCall::SetVolume(volume))?;
        self.volume = volume;
        Ok(())
    }

    fn increase_volume(&mut self) -> Result<(), Self::Error> {
        self.record(AudioCall::VolumeUp)?;
        self.volume = self.volume.saturating_add(1);
        Ok(())
    }

    fn decrease_volume(&mut self) -> Result<(), Self::Error> {
        self.record(AudioCall::VolumeDown)?;
        self.volume = self.volume.saturating_sub(1);
        Ok(())
    }

    fn set_equalizer(&mut self, eq: Equalizer) -> Result<(), Self::Error> {
        self.record(AudioCall::Equalizer(eq))
    }

    fn track_count(&mut self, folder: u8) -> Result<u16, Self::Error> {
        if self.failing {
            return Err(MockError::Injected);
        }
        Ok(self.track_counts.get(usize::from(folder)).copied().unwrap_or(0))
    }

    fn sleep(&mut self) -> Result<(), Self::Error> {
        self.record(AudioCall::Sleep)?;
        self.playing = false;
        Ok(())
    }

    fn poll_finished(&mut self) -> Option<u16> {
        self.finished.take()
    }
}

/// Mock RFID reader holding at most one tag
pub struct MockReader {
    block: Option<[u8; BLOCK_LEN]>,
    pending: bool,
    fail_reads: bool,
    fail_writes: bool,
    writes: Vec<[u8; BLOCK_LEN]>,
    halts: usize,
    powered_down: bool,
}

impl MockReader {
    /// Create new reader with no tag
    pub fn new() -> Self {
        Self {
            block: None,
            pending: false,
            fail_reads: false,
            fail_writes: false,
            writes: Vec::new(),
            halts: 0,
            powered_down: false,
        }
    }

    /// Present a tag with the given block contents
    pub fn place(&mut self, block: [u8; BLOCK_LEN]) {
        self.block = Some(block);
        self.pending = true;
    }

    /// Take the tag away
    pub fn remove(&mut self) {
        self.block = None;
        self.pending = false;
    }

    /// Make reads fail (authentication error)
    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Make writes fail
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Blocks written so far
    pub fn writes(&self) -> &[[u8; BLOCK_LEN]] {
        &self.writes
    }

    /// Current tag contents
    pub fn block(&self) -> Option<[u8; BLOCK_LEN]> {
        self.block
    }

    /// Number of `halt()` calls
    pub fn halts(&self) -> usize {
        self.halts
    }

    /// `power_down()` was called
    pub fn is_powered_down(&self) -> bool {
        self.powered_down
    }
}

impl Default for MockReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TagReader for MockReader {
    type Error = MockError;

    fn is_new_tag_present(&mut self) -> bool {
        core::mem::take(&mut self.pending)
    }

    fn read_block(&mut self) -> Result<[u8; BLOCK_LEN], Self::Error> {
        if self.fail_reads {
            return Err(MockError::Injected);
        }
        self.block.ok_or(MockError::NoTag)
    }

    fn write_block(&mut self, block: &[u8; BLOCK_LEN]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MockError::Injected);
        }
        if self.block.is_none() {
            return Err(MockError::NoTag);
        }
        self.block = Some(*block);
        self.writes.push(*block);
        Ok(())
    }

    fn halt(&mut self) {
        self.halts = self.halts.saturating_add(1);
    }

    fn power_down(&mut self) {
        self.powered_down = true;
    }
}

/// Mock EEPROM, erased to `0xFF`
pub struct MockEeprom {
    bytes: Vec<u8>,
    failing: bool,
}

impl MockEeprom {
    /// Create an erased EEPROM of [`EEPROM_SIZE`] bytes
    pub fn new() -> Self {
        Self {
            bytes: vec![0xFF; EEPROM_SIZE],
            failing: false,
        }
    }

    /// Make every access fail
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Raw contents
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Raw contents, writable (corruption tests)
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn range(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, MockError> {
        if self.failing {
            return Err(MockError::Injected);
        }
        let start = usize::try_from(offset).map_err(|_| MockError::OutOfBounds)?;
        let end = start.checked_add(len).ok_or(MockError::OutOfBounds)?;
        if end > self.bytes.len() {
            return Err(MockError::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl Default for MockEeprom {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadStorage for MockEeprom {
    type Error = MockError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        let src = self.bytes.get(range).ok_or(MockError::OutOfBounds)?;
        bytes.copy_from_slice(src);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

impl Storage for MockEeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        let dst = self.bytes.get_mut(range).ok_or(MockError::OutOfBounds)?;
        dst.copy_from_slice(bytes);
        Ok(())
    }
}

/// Mock power switch
#[derive(Default)]
pub struct MockPower {
    shutdowns: usize,
}

impl MockPower {
    /// Create new power switch
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `shutdown()` calls
    pub fn shutdowns(&self) -> usize {
        self.shutdowns
    }
}

impl PowerControl for MockPower {
    type Error = core::convert::Infallible;

    fn shutdown(&mut self) -> Result<(), Self::Error> {
        self.shutdowns = self.shutdowns.saturating_add(1);
        Ok(())
    }
}

/// Mock button bank returning whatever levels were last set
#[derive(Default)]
pub struct MockButtons {
    levels: ButtonLevels,
}

impl MockButtons {
    /// Create with all buttons released
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the levels returned by the next samples
    pub fn set(&mut self, levels: ButtonLevels) {
        self.levels = levels;
    }
}

impl ButtonSampler for MockButtons {
    fn sample(&mut self) -> ButtonLevels {
        self.levels
    }
}
