//! Standby supervisor: powers the box down after a period of inactivity.

use embassy_time::{Duration, Instant};

/// Inactivity timer.
///
/// Armed whenever playback stops or pauses, disarmed whenever it resumes.
/// Fires once; the caller then runs the power-down sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandbySupervisor {
    deadline: Option<(Instant, Duration)>,
}

impl StandbySupervisor {
    /// Create a disarmed supervisor.
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Start counting `timeout` from `now`. A zero timeout disables the timer.
    pub fn arm(&mut self, now: Instant, timeout: Duration) {
        self.deadline = if timeout.as_ticks() == 0 { None } else { Some((now, timeout)) };
    }

    /// Arm with a timeout given in minutes, as stored in the settings.
    pub fn arm_minutes(&mut self, now: Instant, minutes: u16) {
        self.arm(now, Duration::from_secs(u64::from(minutes).saturating_mul(60)));
    }

    /// Clear the deadline.
    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    /// `true` while a deadline is set.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` exactly once when the timeout has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some((start, timeout)) = self.deadline else {
            return false;
        };
        let elapsed = now.checked_duration_since(start).unwrap_or(Duration::from_ticks(0));
        if elapsed >= timeout {
            self.deadline = None;
            return true;
        }
        false
    }
}
