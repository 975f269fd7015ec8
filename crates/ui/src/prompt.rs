//! Prompt queue — spoken output without busy-waiting.
//!
//! The MP3 module plays one thing at a time, so prompts are queued and the
//! control loop calls [`PromptQueue::poll`] every tick. A prompt starts once
//! the previous one is over: the module must have had
//! [`PROMPT_START_GRACE_MS`] to raise its busy flag, and a prompt that never
//! ends is abandoned after [`PROMPT_TIMEOUT_MS`]. Previews are interrupted
//! as soon as something else is queued.

use embassy_time::{Duration, Instant};
use heapless::Deque;
use platform::config::{PROMPT_START_GRACE_MS, PROMPT_TIMEOUT_MS};

const CAPACITY: usize = 8;

/// One queued utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prompt {
    /// Notification prompt by id
    Notification(u16),
    /// Menu preview: a track of a content folder
    Preview {
        /// Folder to preview
        folder: u8,
        /// Track to preview
        track: u16,
    },
}

/// FIFO of prompts gated on the player's busy flag.
#[derive(Debug)]
pub struct PromptQueue {
    pending: Deque<Prompt, CAPACITY>,
    current: Option<(Prompt, Instant)>,
    grace: Duration,
    timeout: Duration,
}

impl PromptQueue {
    /// Empty queue with the configured grace and timeout.
    pub fn new() -> Self {
        Self {
            pending: Deque::new(),
            current: None,
            grace: Duration::from_millis(PROMPT_START_GRACE_MS),
            timeout: Duration::from_millis(PROMPT_TIMEOUT_MS),
        }
    }

    /// Append a prompt; when full the oldest pending prompt is dropped.
    pub fn push(&mut self, prompt: Prompt) {
        if self.pending.is_full() {
            self.pending.pop_front();
        }
        // Cannot fail: a slot was freed above.
        self.pending.push_back(prompt).ok();
    }

    /// Drop everything not yet started, then queue `prompt`.
    pub fn replace_pending(&mut self, prompt: Prompt) {
        self.pending.clear();
        self.push(prompt);
    }

    /// Drop everything not yet started.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Forget pending prompts and the one in flight.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.current = None;
    }

    /// Prompts not yet started, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = Prompt> + '_ {
        self.pending.iter().copied()
    }

    /// `true` when nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Next prompt to hand to the player, if it may start now.
    pub fn poll(&mut self, now: Instant, is_playing: bool) -> Option<Prompt> {
        if self.pending.is_empty() {
            return None;
        }
        if let Some((prompt, started)) = self.current {
            let elapsed = now
                .checked_duration_since(started)
                .unwrap_or(Duration::from_ticks(0));
            let interruptible = matches!(prompt, Prompt::Preview { .. });
            if !interruptible
                && (elapsed < self.grace || (is_playing && elapsed < self.timeout))
            {
                return None;
            }
        }
        let next = self.pending.pop_front()?;
        self.current = Some((next, now));
        Some(next)
    }
}

impl Default for PromptQueue {
    fn default() -> Self {
        Self::new()
    }
}
