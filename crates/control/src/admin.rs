//! Admin menu session: entry gate, top menu, leaf flows and the folder
//! setup used for new tags.
//!
//! A session is a small state machine advanced once per control-loop tick
//! with the current gestures. Nothing here blocks; "wait for a card" and
//! "wait for a selection" are stages.
//!
//! ```text
//! buttons ─► AwaitRelease ─► gate (PIN / challenge) ─┐
//! admin card ────────────────────────────────────────┴─► Top ─► leaf ─► Finished
//! foreign tag ─► SetupTag ─► Finished
//! ```

use platform::config::MAX_VOLUME;
use platform::{AudioPlayer, Button, TagReader};
use rand::{Rng, RngCore};
use records::{AdminSettings, FolderSettings, MenuLock, PlayMode, TagRecord};
use ui::{
    tracks, ButtonGestures, MenuEvent, MenuNavigator, MenuRequest, PinEntry, PinEvent, Preview,
    Prompt, PromptQueue,
};

use crate::error::ControlError;
use crate::modifier::ModifierKind;

/// Options in the top-level admin menu.
pub const TOP_MENU_OPTIONS: u8 = 12;

/// Top-level admin menu entries (1-based, as announced).
pub mod leaf {
    /// Reconfigure an existing card
    pub const RESET_CARD: u8 = 1;
    /// Upper volume bound
    pub const MAX_VOLUME: u8 = 2;
    /// Lower volume bound
    pub const MIN_VOLUME: u8 = 3;
    /// Startup volume
    pub const INIT_VOLUME: u8 = 4;
    /// Equalizer preset
    pub const EQUALIZER: u8 = 5;
    /// Write a modifier card
    pub const MODIFIER_CARD: u8 = 6;
    /// Configure a shortcut
    pub const SHORTCUT: u8 = 7;
    /// Standby timeout
    pub const STANDBY: u8 = 8;
    /// Write single-track cards for a range of a folder
    pub const BATCH: u8 = 9;
    /// Swap short/long press meaning of up/down
    pub const INVERT_BUTTONS: u8 = 10;
    /// Erase everything
    pub const FACTORY_RESET: u8 = 11;
    /// Gate in front of the admin menu
    pub const MENU_LOCK: u8 = 12;
}

const SLEEP_MINUTES: [u8; 4] = [5, 15, 30, 60];
const STANDBY_MINUTES: [u16; 5] = [5, 15, 30, 60, 0];

/// Borrowed view of the controller state a session works on.
pub struct FlowContext<'a, A, R, G: ?Sized> {
    /// Gestures of the current tick
    pub gestures: &'a ButtonGestures,
    /// Prompt queue
    pub prompts: &'a mut PromptQueue,
    /// MP3 module (track counts)
    pub audio: &'a mut A,
    /// Tag reader (card authoring)
    pub reader: &'a mut R,
    /// Settings being edited
    pub settings: &'a mut AdminSettings,
    /// Randomness for the arithmetic gate
    pub rng: &'a mut G,
}

impl<A, R, G> FlowContext<'_, A, R, G>
where
    A: AudioPlayer,
    R: TagReader,
    G: RngCore + ?Sized,
{
    fn say(&mut self, id: u16) {
        self.prompts.push(Prompt::Notification(id));
    }

    fn menu(&mut self, request: MenuRequest) -> MenuNavigator {
        MenuNavigator::open(request, self.prompts)
    }

    fn select(&mut self, menu: &mut MenuNavigator) -> MenuEvent {
        menu.step(self.gestures, self.prompts)
    }

    fn track_count(&mut self, folder: u8) -> Result<u8, ControlError> {
        let count = self.audio.track_count(folder).map_err(|_| ControlError::Audio)?;
        Ok(u8::try_from(count).unwrap_or(u8::MAX))
    }

    /// Up/down short press or pause long press while waiting for a card.
    fn wait_cancelled(&self) -> bool {
        self.gestures.short_press(Button::Up)
            || self.gestures.short_press(Button::Down)
            || self.gestures.long_press(Button::Pause)
    }

    fn write_tag(&mut self, settings: FolderSettings) -> bool {
        let block = TagRecord::new(settings).encode();
        let written = self.reader.write_block(&block).is_ok();
        self.reader.halt();
        if written {
            info!("tag written: folder {} mode {}", settings.folder, settings.mode.name());
            self.say(tracks::CARD_CONFIGURED);
        } else {
            warn!("tag write failed");
            self.say(tracks::ERROR);
        }
        written
    }
}

// ---------------------------------------------------------------------------
// Arithmetic gate
// ---------------------------------------------------------------------------

/// Operator of an arithmetic challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
}

/// Two-operand sum the user must solve with the menu navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Challenge {
    /// Left operand, 10..20
    pub a: u8,
    /// Right operand, 1..10 for addition, 1..a for subtraction
    pub b: u8,
    /// Operator
    pub op: Operation,
}

impl Challenge {
    /// Roll a new challenge.
    pub fn generate<G: RngCore + ?Sized>(rng: &mut G) -> Self {
        let a = rng.gen_range(10..20u8);
        let b = rng.gen_range(1..10u8);
        if rng.gen_bool(0.5) {
            Self { a, b, op: Operation::Add }
        } else {
            // re-roll so the difference stays positive
            Self { a, b: rng.gen_range(1..a), op: Operation::Subtract }
        }
    }

    /// The only value that opens the menu.
    pub fn answer(&self) -> u8 {
        match self.op {
            Operation::Add => self.a.saturating_add(self.b),
            Operation::Subtract => self.a.saturating_sub(self.b),
        }
    }

    fn announce(&self, prompts: &mut PromptQueue) {
        let operator = match self.op {
            Operation::Add => tracks::PLUS,
            Operation::Subtract => tracks::MINUS,
        };
        prompts.push(Prompt::Notification(tracks::SUM_OF));
        prompts.push(Prompt::Notification(u16::from(self.a)));
        prompts.push(Prompt::Notification(operator));
        prompts.push(Prompt::Notification(u16::from(self.b)));
    }
}

// ---------------------------------------------------------------------------
// Folder setup
// ---------------------------------------------------------------------------

/// Progress of a [`FolderSetup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupEvent {
    /// Still choosing
    Pending,
    /// Finished with these settings
    Done(FolderSettings),
    /// Cancelled by the user or nothing to choose from
    Aborted,
}

#[derive(Debug, Clone, Copy)]
enum SetupStep {
    Folder(MenuNavigator),
    Mode(MenuNavigator),
    Track(MenuNavigator),
    First(MenuNavigator),
    Last(MenuNavigator),
}

/// Folder → mode → track/range chooser.
#[derive(Debug, Clone, Copy)]
pub struct FolderSetup {
    settings: FolderSettings,
    step: SetupStep,
}

impl FolderSetup {
    /// Start with the folder menu (previews the first track of each folder).
    pub fn open(prompts: &mut PromptQueue) -> Self {
        let request = MenuRequest::new(99, tracks::SELECT_FOLDER, 0)
            .preview(Preview::SelectionAsFolder)
            .cancellable();
        Self { settings: FolderSettings::EMPTY, step: SetupStep::Folder(MenuNavigator::open(request, prompts)) }
    }

    /// Settings chosen so far.
    pub fn settings(&self) -> &FolderSettings {
        &self.settings
    }

    /// Advance by one tick.
    ///
    /// # Errors
    ///
    /// [`ControlError::Audio`] if the folder's track count cannot be read.
    pub fn step<A, R, G>(&mut self, ctx: &mut FlowContext<'_, A, R, G>) -> Result<SetupEvent, ControlError>
    where
        A: AudioPlayer,
        R: TagReader,
        G: RngCore + ?Sized,
    {
        let folder = self.settings.folder;
        let next = match &mut self.step {
            SetupStep::Folder(menu) => match ctx.select(menu) {
                MenuEvent::Pending => return Ok(SetupEvent::Pending),
                MenuEvent::Cancelled(_) => return Ok(SetupEvent::Aborted),
                MenuEvent::Selected(folder) => {
                    self.settings.folder = folder;
                    SetupStep::Mode(ctx.menu(
                        MenuRequest::new(9, tracks::SELECT_MODE, tracks::SELECT_MODE).cancellable(),
                    ))
                }
            },
            SetupStep::Mode(menu) => match ctx.select(menu) {
                MenuEvent::Pending => return Ok(SetupEvent::Pending),
                MenuEvent::Cancelled(_) => return Ok(SetupEvent::Aborted),
                MenuEvent::Selected(mode) => {
                    let mode = PlayMode::from_u8(mode);
                    self.settings.mode = mode;
                    match mode {
                        PlayMode::Admin => {
                            return Ok(SetupEvent::Done(FolderSettings::new(0, PlayMode::AdminMenu)));
                        }
                        PlayMode::SingleTrack => {
                            let count = ctx.track_count(folder)?;
                            SetupStep::Track(ctx.menu(
                                MenuRequest::new(count, tracks::SELECT_TRACK, 0)
                                    .preview(Preview::TrackOf(folder)),
                            ))
                        }
                        mode if mode.is_range() => {
                            let count = ctx.track_count(folder)?;
                            SetupStep::First(ctx.menu(
                                MenuRequest::new(count, tracks::SELECT_FIRST, 0)
                                    .preview(Preview::TrackOf(folder)),
                            ))
                        }
                        _ => return Ok(SetupEvent::Done(self.settings)),
                    }
                }
            },
            SetupStep::Track(menu) => match ctx.select(menu) {
                MenuEvent::Pending => return Ok(SetupEvent::Pending),
                MenuEvent::Cancelled(_) => return Ok(SetupEvent::Aborted),
                MenuEvent::Selected(track) => {
                    self.settings.special = track;
                    return Ok(SetupEvent::Done(self.settings));
                }
            },
            SetupStep::First(menu) => match ctx.select(menu) {
                MenuEvent::Pending => return Ok(SetupEvent::Pending),
                MenuEvent::Cancelled(_) => return Ok(SetupEvent::Aborted),
                MenuEvent::Selected(first) => {
                    let count = menu.request().option_count;
                    self.settings.special = first;
                    SetupStep::Last(ctx.menu(
                        MenuRequest::new(count, tracks::SELECT_LAST, 0)
                            .preview(Preview::TrackOf(folder))
                            .default_value(first),
                    ))
                }
            },
            SetupStep::Last(menu) => match ctx.select(menu) {
                MenuEvent::Pending => return Ok(SetupEvent::Pending),
                MenuEvent::Cancelled(_) => return Ok(SetupEvent::Aborted),
                MenuEvent::Selected(last) => {
                    self.settings.special2 = last.max(self.settings.special);
                    return Ok(SetupEvent::Done(self.settings));
                }
            },
        };
        self.step = next;
        Ok(SetupEvent::Pending)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// How the session was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdminOrigin {
    /// All three buttons held
    Buttons,
    /// Admin card scanned
    Card,
    /// Unknown tag scanned; only the setup flow runs
    NewTag,
}

/// What the controller does when the session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdminFinish {
    /// Persist the edited settings
    Save,
    /// Leave settings untouched
    Discard,
    /// Erase storage and restore defaults
    FactoryReset,
}

/// Result of one [`AdminSession::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlowStatus {
    /// Keep stepping
    Running,
    /// Session over
    Finished(AdminFinish),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VolumeSetting {
    Max,
    Min,
    Init,
}

#[derive(Debug, Clone)]
enum Stage {
    AwaitRelease,
    Pin(PinEntry),
    Challenge { answer: u8, menu: MenuNavigator },
    Top(MenuNavigator),
    AwaitResetTag,
    SetupTag(FolderSetup),
    Volume { setting: VolumeSetting, menu: MenuNavigator },
    Equalizer(MenuNavigator),
    ModifierKind(MenuNavigator),
    SleepMinutes(MenuNavigator),
    AwaitModifierTag { id: u8, special: u8 },
    ShortcutSlot(MenuNavigator),
    Shortcut { slot: usize, setup: FolderSetup },
    StandbyTimer(MenuNavigator),
    BatchFolder(MenuNavigator),
    BatchFirst { folder: u8, menu: MenuNavigator },
    BatchLast { folder: u8, first: u8, menu: MenuNavigator },
    BatchWrite { folder: u8, next: u8, last: u8 },
    InvertButtons(MenuNavigator),
    MenuLock(MenuNavigator),
    LockPin(PinEntry),
}

enum Next {
    Stay,
    Go(Stage),
    Done(AdminFinish),
}

/// One admin menu visit.
#[derive(Debug, Clone)]
pub struct AdminSession {
    origin: AdminOrigin,
    stage: Stage,
}

impl AdminSession {
    /// Opened with the three-button gesture. The gate runs once every button is released.
    pub fn from_buttons() -> Self {
        Self { origin: AdminOrigin::Buttons, stage: Stage::AwaitRelease }
    }

    /// Opened with an admin card: no gate.
    pub fn from_card(prompts: &mut PromptQueue) -> Self {
        Self { origin: AdminOrigin::Card, stage: top_menu(prompts) }
    }

    /// Set up a tag the box has never seen.
    pub fn for_new_tag(prompts: &mut PromptQueue) -> Self {
        prompts.push(Prompt::Notification(tracks::NEW_TAG));
        Self { origin: AdminOrigin::NewTag, stage: Stage::SetupTag(FolderSetup::open(prompts)) }
    }

    /// How the session was opened.
    pub fn origin(&self) -> AdminOrigin {
        self.origin
    }

    /// Current stage, for logs and tests.
    pub fn stage_name(&self) -> &'static str {
        match self.stage {
            Stage::AwaitRelease => "await-release",
            Stage::Pin(_) => "pin",
            Stage::Challenge { .. } => "challenge",
            Stage::Top(_) => "top",
            Stage::AwaitResetTag => "await-reset-tag",
            Stage::SetupTag(_) => "setup-tag",
            Stage::Volume { .. } => "volume",
            Stage::Equalizer(_) => "equalizer",
            Stage::ModifierKind(_) => "modifier-kind",
            Stage::SleepMinutes(_) => "sleep-minutes",
            Stage::AwaitModifierTag { .. } => "await-modifier-tag",
            Stage::ShortcutSlot(_) => "shortcut-slot",
            Stage::Shortcut { .. } => "shortcut",
            Stage::StandbyTimer(_) => "standby",
            Stage::BatchFolder(_) => "batch-folder",
            Stage::BatchFirst { .. } => "batch-first",
            Stage::BatchLast { .. } => "batch-last",
            Stage::BatchWrite { .. } => "batch-write",
            Stage::InvertButtons(_) => "invert-buttons",
            Stage::MenuLock(_) => "menu-lock",
            Stage::LockPin(_) => "lock-pin",
        }
    }

    /// Advance by one tick.
    ///
    /// # Errors
    ///
    /// [`ControlError::Audio`] if a folder's track count cannot be read.
    pub fn step<A, R, G>(&mut self, ctx: &mut FlowContext<'_, A, R, G>) -> Result<FlowStatus, ControlError>
    where
        A: AudioPlayer,
        R: TagReader,
        G: RngCore + ?Sized,
    {
        let setup_finish =
            if self.origin == AdminOrigin::NewTag { AdminFinish::Discard } else { AdminFinish::Save };
        let next = match &mut self.stage {
            Stage::AwaitRelease => {
                if ctx.gestures.all_released() {
                    open_gate(ctx)
                } else {
                    Next::Stay
                }
            }
            Stage::Pin(entry) => match entry.step(ctx.gestures) {
                PinEvent::Pending => Next::Stay,
                PinEvent::Entered(pin) if pin == ctx.settings.pin => {
                    info!("admin PIN accepted");
                    Next::Go(top_menu(ctx.prompts))
                }
                PinEvent::Entered(_) | PinEvent::Aborted => {
                    info!("admin PIN rejected");
                    Next::Done(AdminFinish::Discard)
                }
            },
            Stage::Challenge { answer, menu } => match ctx.select(menu) {
                MenuEvent::Pending => Next::Stay,
                MenuEvent::Selected(value) if value == *answer => {
                    info!("admin challenge solved");
                    Next::Go(top_menu(ctx.prompts))
                }
                MenuEvent::Selected(_) | MenuEvent::Cancelled(_) => {
                    info!("admin challenge failed");
                    Next::Done(AdminFinish::Discard)
                }
            },
            Stage::Top(menu) => match ctx.select(menu) {
                MenuEvent::Pending => Next::Stay,
                MenuEvent::Selected(choice) => {
                    info!("admin menu entry {}", choice);
                    open_leaf(choice, ctx)
                }
                MenuEvent::Cancelled(_) => Next::Done(AdminFinish::Discard),
            },
            Stage::AwaitResetTag => {
                if ctx.wait_cancelled() {
                    ctx.say(tracks::CANCELLED);
                    Next::Done(AdminFinish::Save)
                } else if ctx.reader.is_new_tag_present() {
                    Next::Go(Stage::SetupTag(FolderSetup::open(ctx.prompts)))
                } else {
                    Next::Stay
                }
            }
            Stage::SetupTag(setup) => match setup.step(ctx)? {
                SetupEvent::Pending => Next::Stay,
                SetupEvent::Done(settings) => {
                    ctx.write_tag(settings);
                    Next::Done(setup_finish)
                }
                SetupEvent::Aborted => Next::Done(setup_finish),
            },
            Stage::Volume { setting, menu } => match ctx.select(menu) {
                MenuEvent::Pending => Next::Stay,
                MenuEvent::Selected(value) => {
                    apply_volume(ctx.settings, *setting, value);
                    Next::Done(AdminFinish::Save)
                }
                MenuEvent::Cancelled(_) => Next::Done(AdminFinish::Save),
            },
            Stage::Equalizer(menu) => match ctx.select(menu) {
                MenuEvent::Pending => Next::Stay,
                MenuEvent::Selected(eq) => {
                    ctx.settings.eq = eq;
                    Next::Done(AdminFinish::Save)
                }
                MenuEvent::Cancelled(_) => Next::Done(AdminFinish::Save),
            },
            Stage::ModifierKind(menu) => match ctx.select(menu) {
                MenuEvent::Pending => Next::Stay,
                MenuEvent::Selected(id) => match ModifierKind::from_id(id) {
                    Some(ModifierKind::SleepTimer) => Next::Go(Stage::SleepMinutes(
                        ctx.menu(MenuRequest::new(4, tracks::TIMER, tracks::TIMER)),
                    )),
                    Some(kind) => {
                        ctx.say(tracks::PLACE_CARD);
                        Next::Go(Stage::AwaitModifierTag { id: kind.id(), special: 0 })
                    }
                    None => Next::Done(AdminFinish::Save),
                },
                MenuEvent::Cancelled(_) => Next::Done(AdminFinish::Save),
            },
            Stage::SleepMinutes(menu) => match ctx.select(menu) {
                MenuEvent::Pending => Next::Stay,
                MenuEvent::Selected(choice) => {
                    let minutes = option(&SLEEP_MINUTES, choice).unwrap_or(5);
                    ctx.say(tracks::PLACE_CARD);
                    Next::Go(Stage::AwaitModifierTag { id: ModifierKind::SleepTimer.id(), special: minutes })
                }
                MenuEvent::Cancelled(_) => Next::Done(AdminFinish::Save),
            },
            Stage::AwaitModifierTag { id, special } => {
                if ctx.wait_cancelled() {
                    ctx.say(tracks::CANCELLED);
                    Next::Done(AdminFinish::Save)
                } else if ctx.reader.is_new_tag_present() {
                    let card = FolderSettings {
                        folder: 0,
                        mode: PlayMode::from_u8(*id),
                        special: *special,
                        special2: 0,
                    };
                    ctx.write_tag(card);
                    Next::Done(AdminFinish::Save)
                } else {
                    Next::Stay
                }
            }
            Stage::ShortcutSlot(menu) => match ctx.select(menu) {
                MenuEvent::Pending => Next::Stay,
                MenuEvent::Selected(slot) => Next::Go(Stage::Shortcut {
                    slot: usize::from(slot.saturating_sub(1)),
                    setup: FolderSetup::open(ctx.prompts),
                }),
                MenuEvent::Cancelled(_) => Next::Done(AdminFinish::Save),
            },
            Stage::Shortcut { slot, setup } => match setup.step(ctx)? {
                SetupEvent::Pending => Next::Stay,
                SetupEvent::Done(settings) => {
                    if let Some(shortcut) = ctx.settings.shortcuts.get_mut(*slot) {
                        *shortcut = settings;
                    }
                    ctx.say(tracks::CARD_CONFIGURED);
                    Next::Done(AdminFinish::Save)
                }
                SetupEvent::Aborted => Next::Done(AdminFinish::Save),
            },
            Stage::StandbyTimer(menu) => match ctx.select(menu) {
                MenuEvent::Pending => Next::Stay,
                MenuEvent::Selected(choice) => {
                    ctx.settings.standby_minutes = option(&STANDBY_MINUTES, choice).unwrap_or(0);
                    Next::Done(AdminFinish::Save)
                }
                MenuEvent::Cancelled(_) => Next::Done(AdminFinish::Save),
            },
            Stage::BatchFolder(menu) => match ctx.select(menu) {
                MenuEvent::Pending => Next::Stay,
                MenuEvent::Selected(folder) => {
                    let count = ctx.track_count(folder)?;
                    let menu = ctx.menu(
                        MenuRequest::new(count, tracks::SELECT_FIRST, 0).preview(Preview::TrackOf(folder)),
                    );
                    Next::Go(Stage::BatchFirst { folder, menu })
                }
                MenuEvent::Cancelled(_) => Next::Done(AdminFinish::Save),
            },
            Stage::BatchFirst { folder, menu } => match ctx.select(menu) {
                MenuEvent::Pending => Next::Stay,
                MenuEvent::Selected(first) => {
                    let folder = *folder;
                    let count = menu.request().option_count;
                    let menu = ctx.menu(
                        MenuRequest::new(count, tracks::SELECT_LAST, 0)
                            .preview(Preview::TrackOf(folder))
                            .default_value(first),
                    );
                    Next::Go(Stage::BatchLast { folder, first, menu })
                }
                MenuEvent::Cancelled(_) => Next::Done(AdminFinish::Save),
            },
            Stage::BatchLast { folder, first, menu } => match ctx.select(menu) {
                MenuEvent::Pending => Next::Stay,
                MenuEvent::Selected(last) => {
                    let (folder, first) = (*folder, *first);
                    ctx.say(tracks::BATCH_INTRO);
                    ctx.say(u16::from(first));
                    Next::Go(Stage::BatchWrite { folder, next: first, last: last.max(first) })
                }
                MenuEvent::Cancelled(_) => Next::Done(AdminFinish::Save),
            },
            Stage::BatchWrite { folder, next, last } => {
                if ctx.wait_cancelled() {
                    ctx.say(tracks::CANCELLED);
                    Next::Done(AdminFinish::Save)
                } else if ctx.reader.is_new_tag_present() {
                    let card = FolderSettings {
                        folder: *folder,
                        mode: PlayMode::SingleTrack,
                        special: *next,
                        special2: 0,
                    };
                    if !ctx.write_tag(card) {
                        // same track again on the next card
                        ctx.say(u16::from(*next));
                        Next::Stay
                    } else if *next >= *last {
                        Next::Done(AdminFinish::Save)
                    } else {
                        *next = next.saturating_add(1);
                        ctx.say(u16::from(*next));
                        Next::Stay
                    }
                } else {
                    Next::Stay
                }
            }
            Stage::InvertButtons(menu) => match ctx.select(menu) {
                MenuEvent::Pending => Next::Stay,
                MenuEvent::Selected(choice) => {
                    ctx.settings.invert_volume_buttons = choice == 2;
                    Next::Done(AdminFinish::Save)
                }
                MenuEvent::Cancelled(_) => Next::Done(AdminFinish::Save),
            },
            Stage::MenuLock(menu) => match ctx.select(menu) {
                MenuEvent::Pending => Next::Stay,
                MenuEvent::Selected(3) => {
                    ctx.say(tracks::INPUT_PIN);
                    Next::Go(Stage::LockPin(PinEntry::new()))
                }
                MenuEvent::Selected(choice) => {
                    ctx.settings.menu_lock = MenuLock::from(choice.saturating_sub(1));
                    Next::Done(AdminFinish::Save)
                }
                MenuEvent::Cancelled(_) => Next::Done(AdminFinish::Save),
            },
            Stage::LockPin(entry) => match entry.step(ctx.gestures) {
                PinEvent::Pending => Next::Stay,
                PinEvent::Entered(pin) => {
                    ctx.settings.pin = pin;
                    ctx.settings.menu_lock = MenuLock::Pin;
                    Next::Done(AdminFinish::Save)
                }
                PinEvent::Aborted => Next::Done(AdminFinish::Save),
            },
        };

        match next {
            Next::Stay => Ok(FlowStatus::Running),
            Next::Go(stage) => {
                self.stage = stage;
                Ok(FlowStatus::Running)
            }
            Next::Done(finish) => Ok(FlowStatus::Finished(finish)),
        }
    }
}

fn top_menu(prompts: &mut PromptQueue) -> Stage {
    let request =
        MenuRequest::new(TOP_MENU_OPTIONS, tracks::ADMIN_MENU, tracks::ADMIN_MENU).cancellable();
    Stage::Top(MenuNavigator::open(request, prompts))
}

fn open_gate<A, R, G>(ctx: &mut FlowContext<'_, A, R, G>) -> Next
where
    A: AudioPlayer,
    R: TagReader,
    G: RngCore + ?Sized,
{
    match ctx.settings.menu_lock {
        MenuLock::None => Next::Go(top_menu(ctx.prompts)),
        MenuLock::Card => {
            info!("admin menu opens with a card only");
            Next::Done(AdminFinish::Discard)
        }
        MenuLock::Pin => {
            ctx.say(tracks::INPUT_PIN);
            Next::Go(Stage::Pin(PinEntry::new()))
        }
        MenuLock::ArithmeticChallenge => {
            let challenge = Challenge::generate(ctx.rng);
            challenge.announce(ctx.prompts);
            let menu = ctx.menu(MenuRequest::new(255, 0, 0));
            Next::Go(Stage::Challenge { answer: challenge.answer(), menu })
        }
    }
}

fn open_leaf<A, R, G>(choice: u8, ctx: &mut FlowContext<'_, A, R, G>) -> Next
where
    A: AudioPlayer,
    R: TagReader,
    G: RngCore + ?Sized,
{
    let s = *ctx.settings;
    let stage = match choice {
        leaf::RESET_CARD => {
            ctx.say(tracks::PLACE_CARD);
            Stage::AwaitResetTag
        }
        leaf::MAX_VOLUME => Stage::Volume {
            setting: VolumeSetting::Max,
            menu: ctx.menu(
                MenuRequest::new(
                    MAX_VOLUME.saturating_sub(s.min_volume),
                    tracks::MAX_VOLUME,
                    u16::from(s.min_volume),
                )
                .default_value(s.max_volume.saturating_sub(s.min_volume)),
            ),
        },
        leaf::MIN_VOLUME => Stage::Volume {
            setting: VolumeSetting::Min,
            menu: ctx.menu(
                MenuRequest::new(s.max_volume.saturating_sub(1), tracks::MIN_VOLUME, 0)
                    .default_value(s.min_volume),
            ),
        },
        leaf::INIT_VOLUME => Stage::Volume {
            setting: VolumeSetting::Init,
            menu: ctx.menu(
                MenuRequest::new(
                    s.max_volume.saturating_sub(s.min_volume).saturating_add(1),
                    tracks::INIT_VOLUME,
                    u16::from(s.min_volume.saturating_sub(1)),
                )
                .default_value(s.init_volume.saturating_sub(s.min_volume).saturating_add(1)),
            ),
        },
        leaf::EQUALIZER => Stage::Equalizer(
            ctx.menu(MenuRequest::new(6, tracks::EQUALIZER, tracks::EQUALIZER).default_value(s.eq)),
        ),
        leaf::MODIFIER_CARD => Stage::ModifierKind(
            ctx.menu(MenuRequest::new(6, tracks::MODIFIER, tracks::MODIFIER).cancellable()),
        ),
        leaf::SHORTCUT => {
            Stage::ShortcutSlot(ctx.menu(MenuRequest::new(4, tracks::SHORTCUT, tracks::SHORTCUT)))
        }
        leaf::STANDBY => Stage::StandbyTimer(ctx.menu(MenuRequest::new(5, tracks::TIMER, tracks::TIMER))),
        leaf::BATCH => Stage::BatchFolder(
            ctx.menu(
                MenuRequest::new(99, tracks::SELECT_FOLDER, 0)
                    .preview(Preview::SelectionAsFolder)
                    .cancellable(),
            ),
        ),
        leaf::INVERT_BUTTONS => Stage::InvertButtons(
            ctx.menu(
                MenuRequest::new(2, tracks::INVERT_BUTTONS, tracks::INVERT_BUTTONS)
                    .default_value(if s.invert_volume_buttons { 2 } else { 1 }),
            ),
        ),
        leaf::FACTORY_RESET => return Next::Done(AdminFinish::FactoryReset),
        leaf::MENU_LOCK => Stage::MenuLock(
            ctx.menu(
                MenuRequest::new(4, tracks::MENU_LOCK, tracks::MENU_LOCK)
                    .default_value(u8::from(s.menu_lock).saturating_add(1)),
            ),
        ),
        _ => return Next::Done(AdminFinish::Discard),
    };
    Next::Go(stage)
}

fn apply_volume(settings: &mut AdminSettings, setting: VolumeSetting, value: u8) {
    match setting {
        VolumeSetting::Max => settings.max_volume = value.saturating_add(settings.min_volume),
        VolumeSetting::Min => settings.min_volume = value,
        VolumeSetting::Init => {
            settings.init_volume = value.saturating_add(settings.min_volume).saturating_sub(1);
        }
    }
    *settings = settings.sanitized();
}

/// 1-based menu choice into a table.
fn option<T: Copy>(table: &[T], choice: u8) -> Option<T> {
    usize::from(choice).checked_sub(1).and_then(|i| table.get(i)).copied()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use embassy_time::{Duration, Instant};
    use platform::mocks::{MockAudio, MockReader};
    use platform::ButtonLevels;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    struct Rig {
        gestures: ButtonGestures,
        prompts: PromptQueue,
        heard: Vec<Prompt>,
        audio: MockAudio,
        reader: MockReader,
        settings: AdminSettings,
        rng: SmallRng,
        now: u64,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                gestures: ButtonGestures::new(Duration::from_millis(1000)),
                prompts: PromptQueue::new(),
                heard: Vec::new(),
                audio: MockAudio::new().with_folder(2, 10).with_folder(3, 12),
                reader: MockReader::new(),
                settings: AdminSettings::new(),
                rng: SmallRng::seed_from_u64(3),
                now: 0,
            }
        }

        fn collect(&mut self) {
            self.heard.extend(self.prompts.pending());
            self.prompts.clear();
        }

        fn drive(&mut self, session: &mut AdminSession, samples: &[(ButtonLevels, u64)]) -> FlowStatus {
            self.collect();
            for (levels, ms) in samples {
                self.now += ms;
                self.gestures.update(*levels, Instant::from_millis(self.now));
                let mut ctx = FlowContext {
                    gestures: &self.gestures,
                    prompts: &mut self.prompts,
                    audio: &mut self.audio,
                    reader: &mut self.reader,
                    settings: &mut self.settings,
                    rng: &mut self.rng,
                };
                let status = session.step(&mut ctx).unwrap();
                self.collect();
                if status != FlowStatus::Running {
                    return status;
                }
            }
            FlowStatus::Running
        }

        fn idle(&mut self, session: &mut AdminSession) -> FlowStatus {
            self.drive(session, &[(ButtonLevels::RELEASED, 10)])
        }

        fn short(&mut self, session: &mut AdminSession, button: Button) -> FlowStatus {
            self.drive(session, &[(ButtonLevels::only(button), 10), (ButtonLevels::RELEASED, 100)])
        }

        fn shorts(&mut self, session: &mut AdminSession, button: Button, times: usize) {
            for _ in 0..times {
                assert_eq!(self.short(session, button), FlowStatus::Running);
            }
        }

        fn long(&mut self, session: &mut AdminSession, button: Button) -> FlowStatus {
            self.drive(
                session,
                &[
                    (ButtonLevels::only(button), 10),
                    (ButtonLevels::only(button), 1000),
                    (ButtonLevels::RELEASED, 10),
                ],
            )
        }

        /// Pick `choice` in a menu that starts with no selection, then confirm.
        fn choose(&mut self, session: &mut AdminSession, choice: usize) -> FlowStatus {
            self.shorts(session, Button::Up, choice);
            self.short(session, Button::Pause)
        }

        fn heard(&self, id: u16) -> bool {
            self.heard.contains(&Prompt::Notification(id))
        }
    }

    #[test]
    fn test_challenge_operands_in_range() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..500 {
            let c = Challenge::generate(&mut rng);
            assert!((10..20).contains(&c.a));
            match c.op {
                Operation::Add => {
                    assert!((1..10).contains(&c.b));
                    assert_eq!(c.answer(), c.a + c.b);
                }
                Operation::Subtract => {
                    assert!(c.b >= 1 && c.b < c.a);
                    assert_eq!(c.answer(), c.a - c.b);
                }
            }
        }
    }

    #[test]
    fn test_open_gate_goes_to_top_menu_after_release() {
        let mut rig = Rig::new();
        let mut session = AdminSession::from_buttons();
        rig.drive(&mut session, &[(ButtonLevels { pause: true, up: true, down: true }, 10)]);
        assert_eq!(session.stage_name(), "await-release");
        rig.idle(&mut session);
        assert_eq!(session.stage_name(), "top");
        assert!(rig.heard(tracks::ADMIN_MENU));
    }

    #[test]
    fn test_card_lock_refuses_button_entry() {
        let mut rig = Rig::new();
        rig.settings.menu_lock = MenuLock::Card;
        let mut session = AdminSession::from_buttons();
        assert_eq!(rig.idle(&mut session), FlowStatus::Finished(AdminFinish::Discard));
    }

    #[test]
    fn test_pin_gate_accepts_matching_digits() {
        let mut rig = Rig::new();
        rig.settings.menu_lock = MenuLock::Pin;
        rig.settings.pin = [2, 3, 1, 1];
        let mut session = AdminSession::from_buttons();
        rig.idle(&mut session);
        assert!(rig.heard(tracks::INPUT_PIN));
        for button in [Button::Up, Button::Down, Button::Pause, Button::Pause] {
            assert_eq!(rig.short(&mut session, button), FlowStatus::Running);
        }
        assert_eq!(session.stage_name(), "top");
    }

    #[test]
    fn test_pin_gate_mismatch_aborts() {
        let mut rig = Rig::new();
        rig.settings.menu_lock = MenuLock::Pin;
        let mut session = AdminSession::from_buttons();
        rig.idle(&mut session);
        rig.shorts(&mut session, Button::Pause, 3);
        assert_eq!(rig.short(&mut session, Button::Up), FlowStatus::Finished(AdminFinish::Discard));
    }

    #[test]
    fn test_challenge_gate_needs_exact_answer() {
        let mut rig = Rig::new();
        rig.settings.menu_lock = MenuLock::ArithmeticChallenge;
        let mut session = AdminSession::from_buttons();
        rig.idle(&mut session);
        assert!(rig.heard(tracks::SUM_OF));
        let Stage::Challenge { answer, .. } = session.stage else { unreachable!() };
        assert_eq!(rig.choose(&mut session, usize::from(answer)), FlowStatus::Running);
        assert_eq!(session.stage_name(), "top");
    }

    #[test]
    fn test_challenge_gate_wrong_answer_aborts() {
        let mut rig = Rig::new();
        rig.settings.menu_lock = MenuLock::ArithmeticChallenge;
        let mut session = AdminSession::from_buttons();
        rig.idle(&mut session);
        let Stage::Challenge { answer, .. } = session.stage else { unreachable!() };
        let status = rig.choose(&mut session, usize::from(answer) + 1);
        assert_eq!(status, FlowStatus::Finished(AdminFinish::Discard));
    }

    #[test]
    fn test_top_menu_long_press_cancels() {
        let mut rig = Rig::new();
        let mut session = AdminSession::from_card(&mut rig.prompts);
        assert_eq!(rig.long(&mut session, Button::Pause), FlowStatus::Finished(AdminFinish::Discard));
        assert!(rig.heard(tracks::CANCELLED));
    }

    #[test]
    fn test_max_volume_leaf() {
        let mut rig = Rig::new();
        let mut session = AdminSession::from_card(&mut rig.prompts);
        rig.choose(&mut session, usize::from(leaf::MAX_VOLUME));
        assert_eq!(session.stage_name(), "volume");
        // default selection is max - min = 20
        rig.shorts(&mut session, Button::Down, 5);
        assert_eq!(rig.short(&mut session, Button::Pause), FlowStatus::Finished(AdminFinish::Save));
        assert_eq!(rig.settings.max_volume, 20);
    }

    #[test]
    fn test_init_volume_leaf_offsets_by_min() {
        let mut rig = Rig::new();
        let mut session = AdminSession::from_card(&mut rig.prompts);
        rig.choose(&mut session, usize::from(leaf::INIT_VOLUME));
        // default selection is init - min + 1 = 11; one up gives volume 16
        rig.short(&mut session, Button::Up);
        rig.short(&mut session, Button::Pause);
        assert_eq!(rig.settings.init_volume, 16);
    }

    #[test]
    fn test_standby_leaf_sets_minutes() {
        let mut rig = Rig::new();
        let mut session = AdminSession::from_card(&mut rig.prompts);
        rig.choose(&mut session, usize::from(leaf::STANDBY));
        assert_eq!(rig.choose(&mut session, 2), FlowStatus::Finished(AdminFinish::Save));
        assert_eq!(rig.settings.standby_minutes, 15);
    }

    #[test]
    fn test_factory_reset_leaf() {
        let mut rig = Rig::new();
        let mut session = AdminSession::from_card(&mut rig.prompts);
        let status = rig.choose(&mut session, usize::from(leaf::FACTORY_RESET));
        assert_eq!(status, FlowStatus::Finished(AdminFinish::FactoryReset));
    }

    #[test]
    fn test_menu_lock_pin_is_recorded() {
        let mut rig = Rig::new();
        let mut session = AdminSession::from_card(&mut rig.prompts);
        rig.choose(&mut session, usize::from(leaf::MENU_LOCK));
        // default selection is "open" (1); two ups reach PIN (3)
        rig.shorts(&mut session, Button::Up, 2);
        rig.short(&mut session, Button::Pause);
        assert!(rig.heard(tracks::INPUT_PIN));
        rig.shorts(&mut session, Button::Down, 3);
        assert_eq!(rig.short(&mut session, Button::Up), FlowStatus::Finished(AdminFinish::Save));
        assert_eq!(rig.settings.menu_lock, MenuLock::Pin);
        assert_eq!(rig.settings.pin, [3, 3, 3, 2]);
    }

    #[test]
    fn test_new_tag_setup_writes_album_card() {
        let mut rig = Rig::new();
        rig.reader.place([0u8; 16]);
        let mut session = AdminSession::for_new_tag(&mut rig.prompts);
        assert!(rig.prompts.pending().any(|p| p == Prompt::Notification(tracks::NEW_TAG)));
        rig.choose(&mut session, 3);
        assert_eq!(rig.choose(&mut session, 2), FlowStatus::Finished(AdminFinish::Discard));
        let written = TagRecord::decode(&rig.reader.writes()[0]);
        assert_eq!(written.settings, FolderSettings::new(3, PlayMode::Album));
        assert!(rig.heard(tracks::CARD_CONFIGURED));
    }

    #[test]
    fn test_setup_range_mode_asks_first_and_last() {
        let mut rig = Rig::new();
        rig.reader.place([0u8; 16]);
        let mut session = AdminSession::for_new_tag(&mut rig.prompts);
        rig.choose(&mut session, 2);
        rig.choose(&mut session, usize::from(PlayMode::AlbumRange.as_u8()));
        rig.choose(&mut session, 3);
        // last menu starts at the first track
        rig.shorts(&mut session, Button::Up, 2);
        assert_eq!(rig.short(&mut session, Button::Pause), FlowStatus::Finished(AdminFinish::Discard));
        let written = TagRecord::decode(&rig.reader.writes()[0]);
        assert_eq!(written.settings, FolderSettings::with_range(2, PlayMode::AlbumRange, 3, 5));
    }

    #[test]
    fn test_setup_mode_six_authors_admin_card() {
        let mut rig = Rig::new();
        rig.reader.place([0u8; 16]);
        let mut session = AdminSession::for_new_tag(&mut rig.prompts);
        rig.choose(&mut session, 1);
        rig.choose(&mut session, 6);
        let written = TagRecord::decode(&rig.reader.writes()[0]);
        assert_eq!(written.settings, FolderSettings::new(0, PlayMode::AdminMenu));
    }

    #[test]
    fn test_setup_write_failure_plays_error() {
        let mut rig = Rig::new();
        rig.reader.place([0u8; 16]);
        rig.reader.set_fail_writes(true);
        let mut session = AdminSession::for_new_tag(&mut rig.prompts);
        rig.choose(&mut session, 3);
        rig.choose(&mut session, 2);
        assert!(rig.heard(tracks::ERROR));
        assert!(rig.reader.writes().is_empty());
    }

    #[test]
    fn test_modifier_card_leaf_writes_locked_card() {
        let mut rig = Rig::new();
        let mut session = AdminSession::from_card(&mut rig.prompts);
        rig.choose(&mut session, usize::from(leaf::MODIFIER_CARD));
        rig.choose(&mut session, usize::from(ModifierKind::Locked.id()));
        assert_eq!(session.stage_name(), "await-modifier-tag");
        assert!(rig.heard(tracks::PLACE_CARD));
        rig.reader.place([0u8; 16]);
        assert_eq!(rig.idle(&mut session), FlowStatus::Finished(AdminFinish::Save));
        let written = TagRecord::decode(&rig.reader.writes()[0]);
        assert_eq!(written.settings.folder, 0);
        assert_eq!(written.settings.mode.as_u8(), 3);
    }

    #[test]
    fn test_sleep_timer_card_stores_minutes() {
        let mut rig = Rig::new();
        let mut session = AdminSession::from_card(&mut rig.prompts);
        rig.choose(&mut session, usize::from(leaf::MODIFIER_CARD));
        rig.choose(&mut session, 1);
        rig.choose(&mut session, 3);
        rig.reader.place([0u8; 16]);
        rig.idle(&mut session);
        let written = TagRecord::decode(&rig.reader.writes()[0]);
        assert_eq!(written.kind(), records::TagKind::Modifier { id: 1, special: 30 });
    }

    #[test]
    fn test_place_card_wait_cancelled_by_up() {
        let mut rig = Rig::new();
        let mut session = AdminSession::from_card(&mut rig.prompts);
        rig.choose(&mut session, usize::from(leaf::RESET_CARD));
        assert_eq!(rig.short(&mut session, Button::Up), FlowStatus::Finished(AdminFinish::Save));
        assert!(rig.heard(tracks::CANCELLED));
    }

    #[test]
    fn test_shortcut_leaf_fills_slot() {
        let mut rig = Rig::new();
        let mut session = AdminSession::from_card(&mut rig.prompts);
        rig.choose(&mut session, usize::from(leaf::SHORTCUT));
        rig.choose(&mut session, 4);
        rig.choose(&mut session, 2);
        assert_eq!(rig.choose(&mut session, 3), FlowStatus::Finished(AdminFinish::Save));
        assert_eq!(
            rig.settings.shortcut(AdminSettings::SHORTCUT_STARTUP),
            Some(FolderSettings::new(2, PlayMode::Party))
        );
    }

    #[test]
    fn test_batch_writes_one_card_per_track() {
        let mut rig = Rig::new();
        let mut session = AdminSession::from_card(&mut rig.prompts);
        rig.choose(&mut session, usize::from(leaf::BATCH));
        rig.choose(&mut session, 2);
        rig.choose(&mut session, 4);
        rig.shorts(&mut session, Button::Up, 1);
        rig.short(&mut session, Button::Pause);
        assert!(rig.heard(tracks::BATCH_INTRO));
        assert_eq!(session.stage_name(), "batch-write");

        rig.reader.place([0u8; 16]);
        assert_eq!(rig.idle(&mut session), FlowStatus::Running);
        rig.reader.place([0u8; 16]);
        assert_eq!(rig.idle(&mut session), FlowStatus::Finished(AdminFinish::Save));
        let specials: Vec<u8> =
            rig.reader.writes().iter().map(|b| TagRecord::decode(b).settings.special).collect();
        assert_eq!(specials, vec![4, 5]);
    }

    #[test]
    fn test_invert_buttons_leaf() {
        let mut rig = Rig::new();
        let mut session = AdminSession::from_card(&mut rig.prompts);
        rig.choose(&mut session, usize::from(leaf::INVERT_BUTTONS));
        // default is 2 (inverted); one down selects 1
        rig.short(&mut session, Button::Down);
        rig.short(&mut session, Button::Pause);
        assert!(!rig.settings.invert_volume_buttons);
    }
}
