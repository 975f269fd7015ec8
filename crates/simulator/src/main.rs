//! Desktop simulator for the tag box.
//!
//! Runs the real control loop against `platform::mocks` and takes commands
//! from stdin, one per line:
//!
//! ```text
//! tag <folder> <mode> [special] [special2]   place a configured tag
//! blank                                      place a tag the box has never seen
//! modifier <id> [special]                    place a modifier card
//! admin                                      place an admin card
//! remove                                     take the tag away
//! press <pause|up|down|all>                  short press
//! hold <pause|up|down|all> <ms>              press and hold
//! finish                                     end the current track
//! status                                     print the box state
//! quit
//! ```
//!
//! Run with: `RUST_LOG=debug cargo run -p simulator -- --folder 1=12 --folder 2=8`

// Desktop tooling: unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(clippy::arithmetic_side_effects, clippy::use_debug)]
#![allow(missing_docs)]

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use control::{Controller, PersistentStore, SettingsStore, Tick};
use embassy_time::{Duration, Instant};
use platform::mocks::{AudioCall, MockAudio, MockButtons, MockEeprom, MockPower, MockReader};
use platform::{Button, ButtonLevels, ButtonSampler};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use records::{AdminSettings, FolderSettings, PlayMode, TagRecord};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type SimBox = Controller<MockAudio, MockReader, PersistentStore<MockEeprom>, MockPower, SmallRng>;

#[derive(Parser)]
#[command(name = "tagbox-sim")]
#[command(about = "Drive the tag box control loop from the terminal", long_about = None)]
#[command(version)]
struct Args {
    /// Seed for shuffles, random tracks and the arithmetic gate
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Standby timeout written to the settings before boot (0 = never)
    #[arg(long, default_value_t = 0)]
    standby_minutes: u16,
    /// Control-loop period
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,
    /// Folder contents as FOLDER=TRACKS, repeatable
    #[arg(long = "folder", value_parser = parse_folder)]
    folders: Vec<(u8, u16)>,
    /// Buttons held while booting (e.g. `all` for a factory reset)
    #[arg(long)]
    boot_held: Option<String>,
}

fn parse_folder(arg: &str) -> Result<(u8, u16)> {
    let (folder, tracks) = arg.split_once('=').context("expected FOLDER=TRACKS")?;
    Ok((folder.parse()?, tracks.parse()?))
}

fn parse_levels(word: &str) -> Result<ButtonLevels> {
    Ok(match word {
        "pause" => ButtonLevels::only(Button::Pause),
        "up" => ButtonLevels::only(Button::Up),
        "down" => ButtonLevels::only(Button::Down),
        "all" => ButtonLevels { pause: true, up: true, down: true },
        other => bail!("unknown button `{other}`"),
    })
}

fn parse_mode(word: &str) -> Result<PlayMode> {
    if let Ok(raw) = word.parse::<u8>() {
        return Ok(PlayMode::from_u8(raw));
    }
    (0..=u8::MAX)
        .map(PlayMode::from_u8)
        .find(|mode| mode.name() == word)
        .with_context(|| format!("unknown mode `{word}`"))
}

fn arg<T: std::str::FromStr>(words: &[&str], index: usize, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match words.get(index) {
        Some(word) => Ok(word.parse()?),
        None => Ok(default),
    }
}

/// Button bank driven by the last command, released once its hold runs out.
struct HeldButtons {
    buttons: MockButtons,
    until: Option<Instant>,
}

impl HeldButtons {
    fn new(levels: ButtonLevels, until: Instant) -> Self {
        let mut buttons = MockButtons::new();
        buttons.set(levels);
        Self { buttons, until: Some(until) }
    }

    fn sample(&mut self, now: Instant) -> ButtonLevels {
        if self.until.is_some_and(|until| now >= until) {
            self.buttons.set(ButtonLevels::RELEASED);
            self.until = None;
        }
        self.buttons.sample()
    }

    fn press(&mut self, levels: ButtonLevels, now: Instant, duration: Duration) {
        self.buttons.set(levels);
        self.until = Some(now + duration);
    }
}

enum Command {
    Continue,
    Quit,
}

fn execute(line: &str, sim: &mut SimBox, held: &mut HeldButtons) -> Result<Command> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, _)) = words.split_first() else {
        return Ok(Command::Continue);
    };
    let now = Instant::now();
    match verb {
        "tag" => {
            let settings = FolderSettings {
                folder: arg(&words, 1, 1)?,
                mode: parse_mode(words.get(2).copied().unwrap_or("album"))?,
                special: arg(&words, 3, 0)?,
                special2: arg(&words, 4, 0)?,
            };
            sim.reader_mut().place(TagRecord::new(settings).encode());
        }
        "blank" => sim.reader_mut().place([0; platform::BLOCK_LEN]),
        "modifier" => {
            let settings = FolderSettings {
                folder: 0,
                mode: PlayMode::from_u8(arg(&words, 1, 3)?),
                special: arg(&words, 2, 0)?,
                special2: 0,
            };
            sim.reader_mut().place(TagRecord::new(settings).encode());
        }
        "admin" => {
            let card = FolderSettings::new(0, PlayMode::AdminMenu);
            sim.reader_mut().place(TagRecord::new(card).encode());
        }
        "remove" => sim.reader_mut().remove(),
        "press" => {
            let levels = parse_levels(words.get(1).copied().unwrap_or("pause"))?;
            held.press(levels, now, Duration::from_millis(100));
        }
        "hold" => {
            let levels = parse_levels(words.get(1).copied().unwrap_or("pause"))?;
            let ms: u64 = arg(&words, 2, 1500)?;
            held.press(levels, now, Duration::from_millis(ms));
        }
        "finish" => sim.audio_mut().finish_track(),
        "status" => print_status(sim),
        "quit" | "exit" => return Ok(Command::Quit),
        other => bail!("unknown command `{other}`"),
    }
    Ok(Command::Continue)
}

fn print_status(sim: &SimBox) {
    let folder = sim.current_folder().map(|f| (f.folder, f.mode.name()));
    let stage = sim.admin_session().map(|s| s.stage_name());
    let modifier = sim.modifier().map(|m| m.name());
    println!(
        "volume {} | folder {:?} | track {:?} | modifier {:?} | admin {:?} | standby armed {}",
        sim.volume(),
        folder,
        sim.audio().current(),
        modifier,
        stage,
        sim.standby_armed()
    );
}

fn report(call: AudioCall) {
    match call {
        AudioCall::Play(folder, track) => info!("♪ play folder {folder} track {track}"),
        AudioCall::Notification(id) => info!("♪ prompt {id}"),
        AudioCall::Advertisement(id) => info!("♪ advert {id}"),
        other => info!("♪ {other:?}"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut audio = MockAudio::new();
    for (folder, tracks) in &args.folders {
        audio.set_track_count(*folder, *tracks);
    }
    let mut store = PersistentStore::new(MockEeprom::new());
    let mut settings = store.load_settings().unwrap_or_else(|_| AdminSettings::new());
    settings.standby_minutes = args.standby_minutes;
    store.save_settings(&settings).map_err(|err| anyhow!("saving settings: {err:?}"))?;

    let mut sim: SimBox = Controller::new(
        audio,
        MockReader::new(),
        store,
        MockPower::new(),
        SmallRng::seed_from_u64(args.seed),
    );
    let boot = match args.boot_held.as_deref() {
        Some(word) => parse_levels(word)?,
        None => ButtonLevels::RELEASED,
    };
    sim.start(Instant::now(), boot).map_err(|err| anyhow!("boot failed: {err:?}"))?;
    let mut held = HeldButtons::new(boot, Instant::now() + Duration::from_millis(200));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(args.tick_ms.max(1)));
    info!("simulator ready, type `status` or `quit`");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let levels = held.sample(now);
                let tick = sim.tick(now, levels);
                for call in sim.audio_mut().take_calls() {
                    report(call);
                }
                if tick == Tick::PoweredDown {
                    info!("box powered down after {} shutdown(s)", sim.power().shutdowns());
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match execute(&line, &mut sim, &mut held) {
                    Ok(Command::Continue) => {}
                    Ok(Command::Quit) => break,
                    Err(err) => warn!("{err:#}"),
                }
            }
        }
    }
    Ok(())
}
