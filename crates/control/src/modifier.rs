//! Modifier overlay: at most one behaviour that intercepts input.
//!
//! Modifiers are created and removed by modifier cards (`folder == 0`,
//! mode = modifier id). The controller offers every button, finished-track
//! and tag event to the active modifier first; [`Intercept::Pass`] falls
//! through to the default dispatch.

use embassy_time::{Duration, Instant};
use platform::config::{FREEZE_FIRST_CUE_MS, FREEZE_INTERVAL_SECS};
use rand::{Rng, RngCore};
use records::{FolderSettings, TagKind};
use ui::tracks;

/// Modifier identifiers as written to modifier cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModifierKind {
    /// Pause after a number of minutes
    SleepTimer,
    /// Random "freeze" cues while music plays
    FreezeDance,
    /// All buttons and cards ignored
    Locked,
    /// All buttons ignored, cards still work
    ToddlerMode,
    /// New cards are queued behind the current folder
    KindergartenMode,
    /// The current track repeats forever
    RepeatSingle,
}

impl ModifierKind {
    /// Every kind, in card-id order.
    pub const ALL: [Self; 6] = [
        Self::SleepTimer,
        Self::FreezeDance,
        Self::Locked,
        Self::ToddlerMode,
        Self::KindergartenMode,
        Self::RepeatSingle,
    ];

    /// Card id (the tag's mode byte).
    pub const fn id(self) -> u8 {
        match self {
            Self::SleepTimer => 1,
            Self::FreezeDance => 2,
            Self::Locked => 3,
            Self::ToddlerMode => 4,
            Self::KindergartenMode => 5,
            Self::RepeatSingle => 6,
        }
    }

    /// Kind for a card id; `None` for unknown ids.
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::SleepTimer),
            2 => Some(Self::FreezeDance),
            3 => Some(Self::Locked),
            4 => Some(Self::ToddlerMode),
            5 => Some(Self::KindergartenMode),
            6 => Some(Self::RepeatSingle),
            _ => None,
        }
    }

    /// Short name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::SleepTimer => "sleep-timer",
            Self::FreezeDance => "freeze-dance",
            Self::Locked => "locked",
            Self::ToddlerMode => "toddler",
            Self::KindergartenMode => "kindergarten",
            Self::RepeatSingle => "repeat-single",
        }
    }
}

/// Button-originated events a modifier may swallow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    /// Pause short or long press
    Pause,
    /// Skip forward
    NextButton,
    /// Skip back
    PreviousButton,
    /// Louder
    VolumeUp,
    /// Quieter
    VolumeDown,
    /// A shortcut long press while idle
    Shortcut,
}

/// Outcome of offering an event to the modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Intercept {
    /// Not handled; run the default dispatch
    Pass,
    /// Handled; do nothing else
    Consumed,
    /// Handled; start this folder instead
    PlayFolder(FolderSettings),
    /// Handled; play the current track again
    ReplayCurrent,
}

/// What the modifier wants done on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModifierTick {
    /// Nothing to do
    Idle,
    /// Play this advertisement over the running track
    Cue(u16),
    /// Sleep time is up: pause, arm standby, remove the modifier
    SleepExpired,
}

/// The active modifier and its private state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// Expires at `deadline`
    SleepTimer {
        /// When to pause
        deadline: Instant,
    },
    /// Cues at `next_cue`
    FreezeDance {
        /// Time of the next cue
        next_cue: Instant,
        /// `false` until the start cue has been considered
        started: bool,
    },
    /// Full lockout
    Locked,
    /// Button lockout
    ToddlerMode,
    /// Folder waiting to be played after the current one
    KindergartenMode {
        /// Queued folder, if any
        queued: Option<FolderSettings>,
    },
    /// Endless repeat of the current track
    RepeatSingle,
}

impl Modifier {
    /// Build the modifier for `kind`. `special` is the card's extra byte
    /// (minutes for the sleep timer).
    pub fn create<R: RngCore + ?Sized>(
        kind: ModifierKind,
        special: u8,
        now: Instant,
        playing: bool,
        rng: &mut R,
    ) -> Self {
        match kind {
            ModifierKind::SleepTimer => Self::SleepTimer {
                deadline: later(now, Duration::from_secs(u64::from(special).saturating_mul(60))),
            },
            ModifierKind::FreezeDance => {
                if playing {
                    Self::FreezeDance {
                        next_cue: later(now, Duration::from_millis(FREEZE_FIRST_CUE_MS)),
                        started: false,
                    }
                } else {
                    Self::FreezeDance { next_cue: later(now, freeze_interval(rng)), started: true }
                }
            }
            ModifierKind::Locked => Self::Locked,
            ModifierKind::ToddlerMode => Self::ToddlerMode,
            ModifierKind::KindergartenMode => Self::KindergartenMode { queued: None },
            ModifierKind::RepeatSingle => Self::RepeatSingle,
        }
    }

    /// Kind of this modifier.
    pub const fn kind(&self) -> ModifierKind {
        match self {
            Self::SleepTimer { .. } => ModifierKind::SleepTimer,
            Self::FreezeDance { .. } => ModifierKind::FreezeDance,
            Self::Locked => ModifierKind::Locked,
            Self::ToddlerMode => ModifierKind::ToddlerMode,
            Self::KindergartenMode { .. } => ModifierKind::KindergartenMode,
            Self::RepeatSingle => ModifierKind::RepeatSingle,
        }
    }

    /// Offer a button event.
    pub fn on_button(&mut self, event: ButtonEvent) -> Intercept {
        match self {
            Self::Locked | Self::ToddlerMode => Intercept::Consumed,
            Self::KindergartenMode { queued } if event == ButtonEvent::NextButton => {
                queued.take().map_or(Intercept::Pass, Intercept::PlayFolder)
            }
            _ => Intercept::Pass,
        }
    }

    /// Offer the natural end of a track.
    pub fn on_track_finished(&mut self, playing: bool) -> Intercept {
        match self {
            Self::KindergartenMode { queued } => {
                queued.take().map_or(Intercept::Pass, Intercept::PlayFolder)
            }
            Self::RepeatSingle if playing => Intercept::Consumed,
            Self::RepeatSingle => Intercept::ReplayCurrent,
            _ => Intercept::Pass,
        }
    }

    /// Offer a scanned tag. Modifier and admin cards are never offered.
    pub fn on_tag(&mut self, tag: &TagKind, playing: bool) -> Intercept {
        match self {
            Self::Locked => Intercept::Consumed,
            Self::KindergartenMode { queued } => match tag {
                TagKind::Folder(settings) if !playing => {
                    *queued = None;
                    Intercept::PlayFolder(*settings)
                }
                TagKind::Folder(settings) => {
                    *queued = Some(*settings);
                    Intercept::Consumed
                }
                _ => Intercept::Pass,
            },
            _ => Intercept::Pass,
        }
    }

    /// Advance timers.
    pub fn tick<R: RngCore + ?Sized>(&mut self, now: Instant, playing: bool, rng: &mut R) -> ModifierTick {
        match self {
            Self::SleepTimer { deadline } if now >= *deadline => ModifierTick::SleepExpired,
            Self::FreezeDance { next_cue, started } if now >= *next_cue => {
                let cue = if *started { tracks::ADVERT_FREEZE } else { tracks::ADVERT_FREEZE_START };
                *started = true;
                *next_cue = later(now, freeze_interval(rng));
                if playing {
                    ModifierTick::Cue(cue)
                } else {
                    ModifierTick::Idle
                }
            }
            _ => ModifierTick::Idle,
        }
    }
}

fn later(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay).unwrap_or(now)
}

fn freeze_interval<R: RngCore + ?Sized>(rng: &mut R) -> Duration {
    let (min, max) = FREEZE_INTERVAL_SECS;
    Duration::from_secs(rng.gen_range(min..=max))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use records::PlayMode;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn make(kind: ModifierKind) -> Modifier {
        Modifier::create(kind, 0, at(0), true, &mut rng())
    }

    const BUTTONS: [ButtonEvent; 6] = [
        ButtonEvent::Pause,
        ButtonEvent::NextButton,
        ButtonEvent::PreviousButton,
        ButtonEvent::VolumeUp,
        ButtonEvent::VolumeDown,
        ButtonEvent::Shortcut,
    ];

    #[test]
    fn test_ids_round_trip() {
        for kind in ModifierKind::ALL {
            assert_eq!(ModifierKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(ModifierKind::from_id(0), None);
        assert_eq!(ModifierKind::from_id(7), None);
    }

    #[test]
    fn test_locked_consumes_every_button_and_tag() {
        let mut locked = make(ModifierKind::Locked);
        for event in BUTTONS {
            assert_eq!(locked.on_button(event), Intercept::Consumed);
        }
        let folder = TagKind::Folder(FolderSettings::new(3, PlayMode::Album));
        assert_eq!(locked.on_tag(&folder, true), Intercept::Consumed);
        assert_eq!(locked.on_tag(&TagKind::Foreign, false), Intercept::Consumed);
    }

    #[test]
    fn test_toddler_lets_cards_through() {
        let mut toddler = make(ModifierKind::ToddlerMode);
        assert_eq!(toddler.on_button(ButtonEvent::VolumeUp), Intercept::Consumed);
        let folder = TagKind::Folder(FolderSettings::new(3, PlayMode::Album));
        assert_eq!(toddler.on_tag(&folder, true), Intercept::Pass);
    }

    #[test]
    fn test_kindergarten_queues_while_playing() {
        let mut kg = make(ModifierKind::KindergartenMode);
        let next = FolderSettings::new(4, PlayMode::Party);
        assert_eq!(kg.on_tag(&TagKind::Folder(next), true), Intercept::Consumed);
        assert_eq!(kg.on_button(ButtonEvent::PreviousButton), Intercept::Pass);
        assert_eq!(kg.on_track_finished(false), Intercept::PlayFolder(next));
        // queue emptied
        assert_eq!(kg.on_track_finished(false), Intercept::Pass);
    }

    #[test]
    fn test_kindergarten_plays_immediately_when_idle() {
        let mut kg = make(ModifierKind::KindergartenMode);
        let folder = FolderSettings::new(4, PlayMode::Album);
        assert_eq!(kg.on_tag(&TagKind::Folder(folder), false), Intercept::PlayFolder(folder));
        assert_eq!(kg.on_button(ButtonEvent::NextButton), Intercept::Pass);
    }

    #[test]
    fn test_kindergarten_idle_scan_drops_older_queue() {
        let mut kg = make(ModifierKind::KindergartenMode);
        let stale = FolderSettings::new(6, PlayMode::Album);
        let fresh = FolderSettings::new(8, PlayMode::Album);
        kg.on_tag(&TagKind::Folder(stale), true);
        assert_eq!(kg.on_tag(&TagKind::Folder(fresh), false), Intercept::PlayFolder(fresh));
        assert_eq!(kg.on_track_finished(false), Intercept::Pass);
    }

    #[test]
    fn test_kindergarten_next_button_skips_to_queue() {
        let mut kg = make(ModifierKind::KindergartenMode);
        let folder = FolderSettings::new(9, PlayMode::Album);
        kg.on_tag(&TagKind::Folder(folder), true);
        assert_eq!(kg.on_button(ButtonEvent::NextButton), Intercept::PlayFolder(folder));
    }

    #[test]
    fn test_repeat_single_replays_finished_track() {
        let mut repeat = make(ModifierKind::RepeatSingle);
        assert_eq!(repeat.on_track_finished(false), Intercept::ReplayCurrent);
        assert_eq!(repeat.on_track_finished(true), Intercept::Consumed);
        assert_eq!(repeat.on_button(ButtonEvent::NextButton), Intercept::Pass);
    }

    #[test]
    fn test_sleep_timer_expires_after_minutes() {
        let mut sleep = Modifier::create(ModifierKind::SleepTimer, 5, at(0), true, &mut rng());
        let mut r = rng();
        assert_eq!(sleep.tick(at(299_999), true, &mut r), ModifierTick::Idle);
        assert_eq!(sleep.tick(at(300_000), true, &mut r), ModifierTick::SleepExpired);
        for event in BUTTONS {
            assert_eq!(sleep.on_button(event), Intercept::Pass);
        }
    }

    #[test]
    fn test_freeze_dance_start_cue_then_random_interval() {
        let mut r = rng();
        let mut freeze = Modifier::create(ModifierKind::FreezeDance, 0, at(0), true, &mut r);
        assert_eq!(freeze.tick(at(999), true, &mut r), ModifierTick::Idle);
        assert_eq!(freeze.tick(at(1000), true, &mut r), ModifierTick::Cue(tracks::ADVERT_FREEZE_START));
        let Modifier::FreezeDance { next_cue, .. } = freeze else { unreachable!() };
        let gap = next_cue.checked_duration_since(at(1000)).unwrap();
        assert!(gap >= Duration::from_secs(5) && gap <= Duration::from_secs(30));
        assert_eq!(freeze.tick(next_cue, true, &mut r), ModifierTick::Cue(tracks::ADVERT_FREEZE));
    }

    #[test]
    fn test_freeze_dance_silent_while_paused() {
        let mut r = rng();
        let mut freeze = Modifier::create(ModifierKind::FreezeDance, 0, at(0), false, &mut r);
        assert_eq!(freeze.tick(at(30_000), false, &mut r), ModifierTick::Idle);
        assert_eq!(freeze.on_button(ButtonEvent::Pause), Intercept::Pass);
        assert_eq!(freeze.on_tag(&TagKind::Foreign, true), Intercept::Pass);
    }
}
