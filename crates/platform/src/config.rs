//! Application configuration and constants
//!
//! Central timing and range values used across the control core. Runtime
//! settings (volume bounds, standby, shortcuts) live in `records::AdminSettings`.

/// The application name
pub const APP_NAME: &str = "Tagbox";

/// Application version (synchronized with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hold time after which a press counts as a long press.
pub const LONG_PRESS_MS: u64 = 1000;

/// Highest volume the MP3 module accepts.
pub const MAX_VOLUME: u8 = 30;

/// Time a freshly started prompt gets before the busy flag is trusted.
pub const PROMPT_START_GRACE_MS: u64 = 500;

/// Longest a single prompt may block the queue.
pub const PROMPT_TIMEOUT_MS: u64 = 10_000;

/// Delay between a freeze-dance start and its first cue.
pub const FREEZE_FIRST_CUE_MS: u64 = 1_000;

/// Bounds (inclusive) of the random freeze-dance interval, in seconds.
pub const FREEZE_INTERVAL_SECS: (u64, u64) = (5, 30);
