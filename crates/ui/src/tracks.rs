//! Prompt ids on the SD card.
//!
//! Notifications live in the `mp3` folder; ids `1..=255` are the spoken
//! numbers, so a menu with step base `0` simply reads the selection out.
//! Advertisements live in the `advert` folder and interrupt a running track.

/// Unknown tag: start first-time setup.
pub const NEW_TAG: u16 = 300;
/// "Choose a folder".
pub const SELECT_FOLDER: u16 = 301;
/// "Choose a play mode"; options announced as `310 + mode`.
pub const SELECT_MODE: u16 = 310;
/// "Choose the track".
pub const SELECT_TRACK: u16 = 320;
/// "Choose the first track of the range".
pub const SELECT_FIRST: u16 = 321;
/// "Choose the last track of the range".
pub const SELECT_LAST: u16 = 322;
/// Tag written successfully.
pub const CARD_CONFIGURED: u16 = 400;
/// Something went wrong.
pub const ERROR: u16 = 401;
/// Welcome jingle when no startup shortcut is set.
pub const STARTUP: u16 = 500;
/// "Place the card on the box".
pub const PLACE_CARD: u16 = 800;
/// Action cancelled.
pub const CANCELLED: u16 = 802;
/// Admin menu intro; options announced as `900 + option`.
pub const ADMIN_MENU: u16 = 900;
/// Equalizer menu; presets announced as `920 + preset`.
pub const EQUALIZER: u16 = 920;
/// Maximum volume menu.
pub const MAX_VOLUME: u16 = 930;
/// Minimum volume menu.
pub const MIN_VOLUME: u16 = 931;
/// Initial volume menu.
pub const INIT_VOLUME: u16 = 932;
/// Invert volume buttons menu; options announced as `933 + option`.
pub const INVERT_BUTTONS: u16 = 933;
/// "Place one card per track".
pub const BATCH_INTRO: u16 = 936;
/// Shortcut slot menu; slots announced as `940 + slot`.
pub const SHORTCUT: u16 = 940;
/// Timer menus; options announced as `960 + option`.
pub const TIMER: u16 = 960;
/// Modifier card menu; modifiers announced as `970 + id`.
pub const MODIFIER: u16 = 970;
/// Menu lock menu; policies announced as `980 + option`.
pub const MENU_LOCK: u16 = 980;
/// "Enter the PIN".
pub const INPUT_PIN: u16 = 991;
/// "What is the sum/difference of".
pub const SUM_OF: u16 = 992;
/// "plus".
pub const PLUS: u16 = 993;
/// "minus".
pub const MINUS: u16 = 994;
/// Factory reset finished.
pub const RESET_DONE: u16 = 999;

/// Advertisement: modifier switched on.
pub const ADVERT_MODIFIER_ON: u16 = 260;
/// Advertisement: modifier switched off.
pub const ADVERT_MODIFIER_OFF: u16 = 261;
/// Advertisement: freeze dance begins.
pub const ADVERT_FREEZE_START: u16 = 300;
/// Advertisement: freeze!
pub const ADVERT_FREEZE: u16 = 301;
