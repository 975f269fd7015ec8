//! Shared rig for driving a `Controller` built from host mocks.
#![allow(dead_code)]

use control::{Controller, PersistentStore, SettingsStore, Tick};
use embassy_time::Instant;
use platform::mocks::{MockAudio, MockEeprom, MockPower, MockReader};
use platform::{Button, ButtonLevels};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use records::{AdminSettings, FolderSettings, PlayMode, TagRecord};

pub type TestBox = Controller<MockAudio, MockReader, PersistentStore<MockEeprom>, MockPower, SmallRng>;

pub const TICK_MS: u64 = 10;

pub const ALL_PRESSED: ButtonLevels = ButtonLevels { pause: true, up: true, down: true };

pub struct Rig {
    pub ctl: TestBox,
    pub now: u64,
}

impl Rig {
    /// Box with default settings, started with no button held.
    pub fn new(audio: MockAudio) -> Self {
        Self::with_settings(audio, None, ButtonLevels::RELEASED)
    }

    /// Box booted from `settings` (if any) while `levels` are held.
    pub fn with_settings(audio: MockAudio, settings: Option<AdminSettings>, levels: ButtonLevels) -> Self {
        let mut store = PersistentStore::new(MockEeprom::new());
        if let Some(settings) = settings {
            store.save_settings(&settings).unwrap();
        }
        let mut ctl = Controller::new(audio, MockReader::new(), store, MockPower::new(), SmallRng::seed_from_u64(42));
        ctl.start(Instant::from_millis(0), levels).unwrap();
        Self { ctl, now: 0 }
    }

    pub fn tick(&mut self, levels: ButtonLevels) -> Tick {
        self.tick_after(TICK_MS, levels)
    }

    pub fn tick_after(&mut self, ms: u64, levels: ButtonLevels) -> Tick {
        self.now += ms;
        self.ctl.tick(Instant::from_millis(self.now), levels)
    }

    pub fn idle(&mut self, ms: u64) {
        for _ in 0..ms / TICK_MS {
            self.tick(ButtonLevels::RELEASED);
        }
    }

    pub fn short(&mut self, button: Button) {
        self.tick(ButtonLevels::only(button));
        self.tick(ButtonLevels::RELEASED);
    }

    pub fn shorts(&mut self, button: Button, times: usize) {
        for _ in 0..times {
            self.short(button);
        }
    }

    pub fn long(&mut self, button: Button) {
        self.hold(ButtonLevels::only(button), 1200);
    }

    pub fn hold(&mut self, levels: ButtonLevels, ms: u64) {
        for _ in 0..ms / TICK_MS {
            self.tick(levels);
        }
        self.tick(ButtonLevels::RELEASED);
    }

    /// Pick `choice` in a menu that starts with no selection, then confirm.
    pub fn choose(&mut self, choice: usize) {
        self.shorts(Button::Up, choice);
        self.short(Button::Pause);
    }

    pub fn place(&mut self, settings: FolderSettings) {
        self.ctl.reader_mut().place(TagRecord::new(settings).encode());
        self.tick(ButtonLevels::RELEASED);
    }

    pub fn place_raw(&mut self, block: [u8; 16]) {
        self.ctl.reader_mut().place(block);
        self.tick(ButtonLevels::RELEASED);
    }

    pub fn finish_track(&mut self) {
        self.ctl.audio_mut().finish_track();
        self.tick(ButtonLevels::RELEASED);
    }

    pub fn modifier_card(&mut self, id: u8, special: u8) {
        self.place(FolderSettings { folder: 0, mode: PlayMode::from_u8(id), special, special2: 0 });
    }

    pub fn notifications(&self) -> Vec<u16> {
        self.ctl.audio().notifications()
    }
}

pub fn settings_with(edit: impl FnOnce(&mut AdminSettings)) -> AdminSettings {
    let mut settings = AdminSettings::new();
    edit(&mut settings);
    settings
}
