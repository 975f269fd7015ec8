//! Volume bounds for the MP3 module.
//!
//! The module takes an absolute level 0..=30 plus single-step up/down
//! commands. [`VolumeControl`] mirrors the level so the box can refuse
//! steps outside the admin-configured `[min, max]` window without asking
//! the driver.

use platform::config::MAX_VOLUME;

/// Tracked volume level inside admin bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeControl {
    level: u8,
    min: u8,
    max: u8,
}

impl VolumeControl {
    /// Create with `level` clamped into `[min, max]`.
    ///
    /// `max` is capped at [`MAX_VOLUME`] and `min` at `max`.
    pub fn new(level: u8, min: u8, max: u8) -> Self {
        let max = max.min(MAX_VOLUME);
        let min = min.min(max);
        Self { level: level.clamp(min, max), min, max }
    }

    /// Current level.
    #[must_use]
    pub fn level(&self) -> u8 {
        self.level
    }

    /// `(min, max)` bounds.
    #[must_use]
    pub fn bounds(&self) -> (u8, u8) {
        (self.min, self.max)
    }

    /// Replace the bounds; returns `true` if the level had to move.
    pub fn set_bounds(&mut self, min: u8, max: u8) -> bool {
        let updated = Self::new(self.level, min, max);
        let moved = updated.level != self.level;
        *self = updated;
        moved
    }

    /// One step up; `false` when already at `max`.
    pub fn step_up(&mut self) -> bool {
        if self.level < self.max {
            self.level = self.level.saturating_add(1);
            true
        } else {
            false
        }
    }

    /// One step down; `false` when already at `min`.
    pub fn step_down(&mut self) -> bool {
        if self.level > self.min {
            self.level = self.level.saturating_sub(1);
            true
        } else {
            false
        }
    }
}
