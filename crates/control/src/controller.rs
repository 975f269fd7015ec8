//! Dispatch core: owns every driver and all session state, advanced by
//! [`Controller::tick`] from a single control loop.

use embassy_time::{Duration, Instant};
use platform::config::LONG_PRESS_MS;
use platform::{AudioPlayer, Button, ButtonLevels, Equalizer, PowerControl, TagReader};
use playback::{NextAction, ProgressStore, TrackSequencer, VolumeControl};
use rand::RngCore;
use records::{AdminSettings, FolderSettings, TagKind, TagRecord};
use ui::{tracks, ButtonGestures, Prompt, PromptQueue};

use crate::admin::{AdminFinish, AdminSession, FlowContext, FlowStatus};
use crate::error::ControlError;
use crate::modifier::{ButtonEvent, Intercept, Modifier, ModifierKind, ModifierTick};
use crate::standby::StandbySupervisor;
use crate::store::SettingsStore;

/// A second finish report for the same track within this window is a duplicate.
const DUPLICATE_FINISH_WINDOW: Duration = Duration::from_millis(1000);

/// Outcome of one control-loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tick {
    /// Keep looping
    Running,
    /// Power has been cut; stop calling `tick`
    PoweredDown,
}

/// What the box is doing apart from modifiers.
enum Activity {
    Idle,
    Folder(TrackSequencer),
    Admin(AdminSession),
}

/// The RFID box.
///
/// Generic over the drivers so the same dispatch runs on target and on the
/// host with `platform::mocks`.
pub struct Controller<A, R, S, P, G> {
    audio: A,
    reader: R,
    store: S,
    power: P,
    rng: G,
    settings: AdminSettings,
    volume: VolumeControl,
    gestures: ButtonGestures,
    prompts: PromptQueue,
    standby: StandbySupervisor,
    modifier: Option<Modifier>,
    activity: Activity,
    last_finished: Option<(u16, Instant)>,
    ignore_buttons: bool,
    powered_down: bool,
}

impl<A, R, S, P, G> Controller<A, R, S, P, G>
where
    A: AudioPlayer,
    R: TagReader,
    S: SettingsStore + ProgressStore,
    P: PowerControl,
    G: RngCore,
{
    /// Assemble the box from its drivers. Call [`Controller::start`] next.
    pub fn new(audio: A, reader: R, store: S, power: P, rng: G) -> Self {
        let settings = AdminSettings::new();
        Self {
            audio,
            reader,
            store,
            power,
            rng,
            settings,
            volume: VolumeControl::new(settings.init_volume, settings.min_volume, settings.max_volume),
            gestures: ButtonGestures::new(Duration::from_millis(LONG_PRESS_MS)),
            prompts: PromptQueue::new(),
            standby: StandbySupervisor::new(),
            modifier: None,
            activity: Activity::Idle,
            last_finished: None,
            ignore_buttons: false,
            powered_down: false,
        }
    }

    /// Boot: load settings, honour the factory-reset gesture, set volume and
    /// equalizer, then play the startup shortcut or the startup prompt.
    ///
    /// # Errors
    ///
    /// Audio driver failures while applying volume or starting playback.
    pub fn start(&mut self, now: Instant, levels: ButtonLevels) -> Result<(), ControlError> {
        info!("{} {} starting", platform::config::APP_NAME, platform::config::APP_VERSION);
        self.settings = match self.store.load_settings() {
            Ok(settings) => settings,
            Err(_) => {
                warn!("settings unavailable, using defaults");
                AdminSettings::new()
            }
        };

        if levels.all() {
            info!("factory reset requested at boot");
            self.factory_reset()?;
        }
        if levels != ButtonLevels::RELEASED {
            self.ignore_buttons = true;
        }
        self.gestures.update(levels, now);

        let settings = self.settings;
        self.volume = VolumeControl::new(settings.init_volume, settings.min_volume, settings.max_volume);
        self.audio.set_volume(self.volume.level()).map_err(|_| ControlError::Audio)?;
        self.audio
            .set_equalizer(Equalizer::from_setting(settings.eq))
            .map_err(|_| ControlError::Audio)?;
        self.arm_standby(now);

        match settings.shortcut(AdminSettings::SHORTCUT_STARTUP) {
            Some(shortcut) => self.start_folder(shortcut)?,
            None => self.prompts.push(Prompt::Notification(tracks::STARTUP)),
        }
        Ok(())
    }

    /// One control-loop iteration.
    ///
    /// Faults are logged, announced with the error prompt and resolved to idle;
    /// the loop keeps running.
    pub fn tick(&mut self, now: Instant, levels: ButtonLevels) -> Tick {
        if self.powered_down {
            return Tick::PoweredDown;
        }
        match self.run_tick(now, levels) {
            Ok(tick) => tick,
            Err(err) => {
                self.recover(err, now);
                Tick::Running
            }
        }
    }

    fn run_tick(&mut self, now: Instant, levels: ButtonLevels) -> Result<Tick, ControlError> {
        if self.standby.poll(now) {
            self.power_down();
            return Ok(Tick::PoweredDown);
        }

        self.pump_prompts(now)?;
        let in_admin = matches!(self.activity, Activity::Admin(_));
        if !in_admin {
            self.tick_modifier(now)?;
        }
        self.gestures.update(levels, now);

        if let Some(track) = self.audio.poll_finished() {
            self.on_track_finished(track, now)?;
        }

        if in_admin {
            return self.step_admin(now).map(|()| Tick::Running);
        }

        if self.ignore_buttons {
            if self.gestures.all_released() {
                self.ignore_buttons = false;
            }
        } else if self.gestures.all_pressed()
            && self.gestures.any_held_for(Duration::from_millis(LONG_PRESS_MS))
        {
            self.enter_admin_from_buttons();
            return Ok(Tick::Running);
        } else {
            self.dispatch_buttons(now)?;
        }

        self.poll_reader(now)?;
        Ok(Tick::Running)
    }

    // -----------------------------------------------------------------------
    // Prompts, modifier timers, standby
    // -----------------------------------------------------------------------

    fn pump_prompts(&mut self, now: Instant) -> Result<(), ControlError> {
        let playing = self.audio.is_playing();
        let Some(prompt) = self.prompts.poll(now, playing) else {
            return Ok(());
        };
        match prompt {
            Prompt::Notification(id) => self.audio.play_notification(id),
            Prompt::Preview { folder, track } => self.audio.play(folder, track),
        }
        .map_err(|_| ControlError::Audio)
    }

    fn tick_modifier(&mut self, now: Instant) -> Result<(), ControlError> {
        let playing = self.audio.is_playing();
        let Some(modifier) = self.modifier.as_mut() else {
            return Ok(());
        };
        match modifier.tick(now, playing, &mut self.rng) {
            ModifierTick::Idle => {}
            ModifierTick::Cue(id) => {
                debug!("modifier cue {}", id);
                self.audio.play_advertisement(id).map_err(|_| ControlError::Audio)?;
            }
            ModifierTick::SleepExpired => {
                info!("sleep timer expired");
                self.modifier = None;
                if playing {
                    self.audio.pause().map_err(|_| ControlError::Audio)?;
                }
                self.arm_standby(now);
            }
        }
        Ok(())
    }

    fn arm_standby(&mut self, now: Instant) {
        let minutes = self.settings.standby_minutes;
        self.standby.arm_minutes(now, minutes);
        if minutes != 0 {
            debug!("standby armed for {} min", minutes);
        }
    }

    fn disarm_standby(&mut self) {
        if self.standby.is_armed() {
            debug!("standby disarmed");
        }
        self.standby.disarm();
    }

    fn power_down(&mut self) {
        info!("standby timeout, powering down");
        if self.audio.sleep().is_err() {
            warn!("audio module did not acknowledge sleep");
        }
        self.reader.power_down();
        if self.power.shutdown().is_err() {
            error!("shutdown line could not be driven");
        }
        self.powered_down = true;
    }

    fn recover(&mut self, err: ControlError, now: Instant) {
        match err {
            ControlError::Audio => error!("audio driver fault"),
            ControlError::Storage(_) => error!("storage fault"),
            ControlError::Sequence(_) => warn!("folder has nothing to play"),
        }
        self.prompts.clear();
        self.prompts.push(Prompt::Notification(tracks::ERROR));
        if matches!(self.activity, Activity::Admin(_)) {
            self.activity = Activity::Idle;
        }
        self.arm_standby(now);
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    fn start_folder(&mut self, settings: FolderSettings) -> Result<(), ControlError> {
        let count = self.audio.track_count(settings.folder).map_err(|_| ControlError::Audio)?;
        let sequencer = TrackSequencer::begin_folder(settings, count, &mut self.rng, &mut self.store)?;
        let track = sequencer.current();
        info!(
            "folder {} mode {} starts at track {} of {}",
            settings.folder,
            settings.mode.name(),
            track,
            count
        );
        self.prompts.clear();
        self.audio.play(settings.folder, track).map_err(|_| ControlError::Audio)?;
        self.activity = Activity::Folder(sequencer);
        self.last_finished = None;
        self.disarm_standby();
        Ok(())
    }

    fn apply(&mut self, action: NextAction, now: Instant) -> Result<(), ControlError> {
        let Activity::Folder(sequencer) = &self.activity else {
            return Ok(());
        };
        let folder = sequencer.settings().folder;
        match action {
            NextAction::PlayTrack(track) => {
                debug!("folder {} plays track {}", folder, track);
                self.audio.play(folder, track).map_err(|_| ControlError::Audio)?;
                self.disarm_standby();
            }
            NextAction::StopAndSuspend => {
                info!("folder {} finished", folder);
                self.audio.stop().map_err(|_| ControlError::Audio)?;
                self.arm_standby(now);
            }
        }
        Ok(())
    }

    fn next_track(&mut self, now: Instant) -> Result<(), ControlError> {
        let Activity::Folder(sequencer) = &mut self.activity else {
            return Ok(());
        };
        let action = sequencer.next(&mut self.store);
        self.apply(action, now)
    }

    fn previous_track(&mut self, now: Instant) -> Result<(), ControlError> {
        let Activity::Folder(sequencer) = &mut self.activity else {
            return Ok(());
        };
        match sequencer.previous(&mut self.store) {
            Some(action) => self.apply(action, now),
            None => {
                debug!("previous ignored in random mode");
                Ok(())
            }
        }
    }

    fn replay_current(&mut self) -> Result<(), ControlError> {
        let Activity::Folder(sequencer) = &self.activity else {
            return Ok(());
        };
        let (folder, track) = (sequencer.settings().folder, sequencer.current());
        debug!("repeat track {}", track);
        self.audio.play(folder, track).map_err(|_| ControlError::Audio)
    }

    fn on_track_finished(&mut self, track: u16, now: Instant) -> Result<(), ControlError> {
        if !matches!(self.activity, Activity::Folder(_)) {
            return Ok(());
        }
        let playing = self.audio.is_playing();
        if let Some(modifier) = self.modifier.as_mut() {
            match modifier.on_track_finished(playing) {
                Intercept::Pass => {}
                other => return self.run_intercept(other),
            }
        }
        if let Some((last, at)) = self.last_finished {
            let recent = now.checked_duration_since(at).is_some_and(|d| d < DUPLICATE_FINISH_WINDOW);
            if last == track && recent {
                debug!("duplicate finish for track {}", track);
                return Ok(());
            }
        }
        self.last_finished = Some((track, now));
        self.next_track(now)
    }

    fn run_intercept(&mut self, intercept: Intercept) -> Result<(), ControlError> {
        match intercept {
            Intercept::Pass | Intercept::Consumed => Ok(()),
            Intercept::PlayFolder(settings) => self.start_folder(settings),
            Intercept::ReplayCurrent => self.replay_current(),
        }
    }

    /// Offer `event` to the modifier; `true` when it was handled there.
    fn intercepted(&mut self, event: ButtonEvent) -> Result<bool, ControlError> {
        let Some(modifier) = self.modifier.as_mut() else {
            return Ok(false);
        };
        match modifier.on_button(event) {
            Intercept::Pass => Ok(false),
            other => {
                debug!("{} swallowed a button", modifier.kind().name());
                self.run_intercept(other)?;
                Ok(true)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Buttons
    // -----------------------------------------------------------------------

    fn dispatch_buttons(&mut self, now: Instant) -> Result<(), ControlError> {
        let playing = self.audio.is_playing();
        let invert = self.settings.invert_volume_buttons;
        let g = &self.gestures;
        let (pause_short, pause_long) = (g.short_press(Button::Pause), g.long_press(Button::Pause));
        let (up_short, up_long) = (g.short_press(Button::Up), g.long_press(Button::Up));
        let (down_short, down_long) = (g.short_press(Button::Down), g.long_press(Button::Down));

        if pause_short {
            self.toggle_pause(now)?;
        } else if pause_long {
            self.pause_long_press(playing, now)?;
        }

        if up_long {
            if !playing {
                self.play_shortcut(AdminSettings::SHORTCUT_UP, now)?;
            } else if invert {
                self.next_button(now)?;
            } else {
                self.volume_up()?;
            }
        } else if up_short {
            if invert {
                self.volume_up()?;
            } else {
                self.next_button(now)?;
            }
        }

        if down_long {
            if !playing {
                self.play_shortcut(AdminSettings::SHORTCUT_DOWN, now)?;
            } else if invert {
                self.previous_button(now)?;
            } else {
                self.volume_down()?;
            }
        } else if down_short {
            if invert {
                self.volume_down()?;
            } else {
                self.previous_button(now)?;
            }
        }
        Ok(())
    }

    fn toggle_pause(&mut self, now: Instant) -> Result<(), ControlError> {
        if self.intercepted(ButtonEvent::Pause)? {
            return Ok(());
        }
        if !matches!(self.activity, Activity::Folder(_)) {
            return Ok(());
        }
        if self.audio.is_playing() {
            debug!("pause");
            self.audio.pause().map_err(|_| ControlError::Audio)?;
            self.arm_standby(now);
        } else {
            debug!("resume");
            self.audio.resume().map_err(|_| ControlError::Audio)?;
            self.disarm_standby();
        }
        Ok(())
    }

    fn pause_long_press(&mut self, playing: bool, now: Instant) -> Result<(), ControlError> {
        if self.intercepted(ButtonEvent::Pause)? {
            return Ok(());
        }
        match &self.activity {
            Activity::Folder(sequencer) if playing => {
                let position = sequencer.position_announcement();
                debug!("announce position {}", position);
                self.audio.play_advertisement(position).map_err(|_| ControlError::Audio)
            }
            _ => self.play_shortcut(AdminSettings::SHORTCUT_PAUSE, now),
        }
    }

    fn play_shortcut(&mut self, slot: usize, now: Instant) -> Result<(), ControlError> {
        if self.intercepted(ButtonEvent::Shortcut)? {
            return Ok(());
        }
        match self.settings.shortcut(slot) {
            Some(shortcut) => {
                info!("shortcut {}", slot);
                self.start_folder(shortcut)
            }
            None => {
                debug!("shortcut {} not configured", slot);
                Ok(())
            }
        }
    }

    fn next_button(&mut self, now: Instant) -> Result<(), ControlError> {
        if self.intercepted(ButtonEvent::NextButton)? {
            return Ok(());
        }
        self.next_track(now)
    }

    fn previous_button(&mut self, now: Instant) -> Result<(), ControlError> {
        if self.intercepted(ButtonEvent::PreviousButton)? {
            return Ok(());
        }
        self.previous_track(now)
    }

    fn volume_up(&mut self) -> Result<(), ControlError> {
        if self.intercepted(ButtonEvent::VolumeUp)? {
            return Ok(());
        }
        if self.volume.step_up() {
            self.audio.increase_volume().map_err(|_| ControlError::Audio)?;
            debug!("volume {}", self.volume.level());
        }
        Ok(())
    }

    fn volume_down(&mut self) -> Result<(), ControlError> {
        if self.intercepted(ButtonEvent::VolumeDown)? {
            return Ok(());
        }
        if self.volume.step_down() {
            self.audio.decrease_volume().map_err(|_| ControlError::Audio)?;
            debug!("volume {}", self.volume.level());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tags
    // -----------------------------------------------------------------------

    fn poll_reader(&mut self, now: Instant) -> Result<(), ControlError> {
        if !self.reader.is_new_tag_present() {
            return Ok(());
        }
        let block = match self.reader.read_block() {
            Ok(block) => block,
            Err(_) => {
                warn!("tag read failed");
                self.reader.halt();
                return Ok(());
            }
        };
        let record = TagRecord::decode(&block);
        let kind = record.kind();
        info!(
            "tag: folder {} mode {} ours {}",
            record.settings.folder,
            record.settings.mode.name(),
            record.is_ours()
        );
        if kind != TagKind::Foreign {
            self.reader.halt();
        }

        match kind {
            TagKind::Modifier { id, special } => self.toggle_modifier(id, special, now),
            TagKind::AdminCard => {
                let session = AdminSession::from_card(&mut self.prompts);
                self.enter_admin(session)
            }
            _ => {
                let playing = self.audio.is_playing();
                if let Some(modifier) = self.modifier.as_mut() {
                    match modifier.on_tag(&kind, playing) {
                        Intercept::Pass => {}
                        other => {
                            debug!("{} took the tag", modifier.kind().name());
                            return self.run_intercept(other);
                        }
                    }
                }
                match kind {
                    TagKind::Folder(settings) => self.start_folder(settings),
                    TagKind::Foreign => {
                        info!("unknown tag, starting setup");
                        let session = AdminSession::for_new_tag(&mut self.prompts);
                        self.enter_admin(session)
                    }
                    _ => {
                        debug!("unassigned tag ignored");
                        Ok(())
                    }
                }
            }
        }
    }

    fn toggle_modifier(&mut self, id: u8, special: u8, now: Instant) -> Result<(), ControlError> {
        if self.modifier.is_some_and(|active| active.kind().id() == id) {
            info!("modifier {} removed", id);
            self.modifier = None;
            return self.confirm(tracks::ADVERT_MODIFIER_OFF);
        }
        let Some(kind) = ModifierKind::from_id(id) else {
            warn!("unknown modifier id {}", id);
            return Ok(());
        };
        let playing = self.audio.is_playing();
        self.modifier = Some(Modifier::create(kind, special, now, playing, &mut self.rng));
        info!("modifier {} active", kind.name());
        self.confirm(tracks::ADVERT_MODIFIER_ON)
    }

    /// Audible confirmation: over the music when a folder is loaded, as a prompt
    /// otherwise. A paused track is resumed for the advertisement and paused again
    /// so a notification never replaces it in the player.
    fn confirm(&mut self, id: u16) -> Result<(), ControlError> {
        if self.audio.is_playing() {
            return self.audio.play_advertisement(id).map_err(|_| ControlError::Audio);
        }
        if matches!(self.activity, Activity::Folder(_)) {
            self.audio.resume().map_err(|_| ControlError::Audio)?;
            self.audio.play_advertisement(id).map_err(|_| ControlError::Audio)?;
            return self.audio.pause().map_err(|_| ControlError::Audio);
        }
        self.prompts.push(Prompt::Notification(id));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Admin
    // -----------------------------------------------------------------------

    fn enter_admin_from_buttons(&mut self) {
        if self.settings.menu_lock == records::MenuLock::Card {
            info!("admin menu locked to card");
            self.ignore_buttons = true;
            return;
        }
        if self.enter_admin(AdminSession::from_buttons()).is_err() {
            warn!("could not pause for admin menu");
        }
    }

    fn enter_admin(&mut self, session: AdminSession) -> Result<(), ControlError> {
        info!("admin session opened");
        if self.audio.is_playing() {
            self.audio.pause().map_err(|_| ControlError::Audio)?;
        }
        self.disarm_standby();
        self.activity = Activity::Admin(session);
        Ok(())
    }

    fn step_admin(&mut self, now: Instant) -> Result<(), ControlError> {
        let Activity::Admin(session) = &mut self.activity else {
            return Ok(());
        };
        let mut ctx = FlowContext {
            gestures: &self.gestures,
            prompts: &mut self.prompts,
            audio: &mut self.audio,
            reader: &mut self.reader,
            settings: &mut self.settings,
            rng: &mut self.rng,
        };
        let status = session.step(&mut ctx)?;
        if let FlowStatus::Finished(finish) = status {
            self.finish_admin(finish, now)?;
        }
        Ok(())
    }

    fn finish_admin(&mut self, finish: AdminFinish, now: Instant) -> Result<(), ControlError> {
        self.activity = Activity::Idle;
        self.ignore_buttons = true;
        self.arm_standby(now);
        match finish {
            AdminFinish::Discard => info!("admin session closed"),
            AdminFinish::Save => {
                self.store.save_settings(&self.settings)?;
                self.apply_settings()?;
                info!("admin settings saved");
            }
            AdminFinish::FactoryReset => {
                self.factory_reset()?;
                self.apply_settings()?;
                self.prompts.push(Prompt::Notification(tracks::RESET_DONE));
                // standby timeout is back to the default
                self.arm_standby(now);
            }
        }
        Ok(())
    }

    fn factory_reset(&mut self) -> Result<(), ControlError> {
        info!("factory reset");
        self.store.erase()?;
        self.settings = AdminSettings::new();
        self.store.save_settings(&self.settings)?;
        Ok(())
    }

    /// Push volume bounds and equalizer of the current settings to the player.
    fn apply_settings(&mut self) -> Result<(), ControlError> {
        self.settings = self.settings.sanitized();
        if self.volume.set_bounds(self.settings.min_volume, self.settings.max_volume) {
            self.audio.set_volume(self.volume.level()).map_err(|_| ControlError::Audio)?;
        }
        self.audio
            .set_equalizer(Equalizer::from_setting(self.settings.eq))
            .map_err(|_| ControlError::Audio)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Current settings.
    pub fn settings(&self) -> &AdminSettings {
        &self.settings
    }

    /// Current volume level.
    pub fn volume(&self) -> u8 {
        self.volume.level()
    }

    /// Kind of the active modifier.
    pub fn modifier(&self) -> Option<ModifierKind> {
        self.modifier.map(|m| m.kind())
    }

    /// Folder currently loaded.
    pub fn current_folder(&self) -> Option<FolderSettings> {
        match &self.activity {
            Activity::Folder(sequencer) => Some(*sequencer.settings()),
            _ => None,
        }
    }

    /// Sequencer of the loaded folder.
    pub fn sequencer(&self) -> Option<&TrackSequencer> {
        match &self.activity {
            Activity::Folder(sequencer) => Some(sequencer),
            _ => None,
        }
    }

    /// Admin session in progress.
    pub fn admin_session(&self) -> Option<&AdminSession> {
        match &self.activity {
            Activity::Admin(session) => Some(session),
            _ => None,
        }
    }

    /// `true` while the standby timer runs.
    pub fn standby_armed(&self) -> bool {
        self.standby.is_armed()
    }

    /// `true` once the power-down sequence ran.
    pub fn is_powered_down(&self) -> bool {
        self.powered_down
    }

    /// Prompts waiting to be played.
    pub fn pending_prompts(&self) -> impl Iterator<Item = Prompt> + '_ {
        self.prompts.pending()
    }

    /// Audio driver.
    pub fn audio(&self) -> &A {
        &self.audio
    }

    /// Audio driver, mutable (host tests and simulator).
    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    /// Tag reader.
    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Tag reader, mutable (host tests and simulator).
    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Settings/progress store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Settings/progress store, mutable.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Power switch.
    pub fn power(&self) -> &P {
        &self.power
    }
}
