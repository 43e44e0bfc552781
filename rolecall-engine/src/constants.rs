//! Centralized timing and map constants for the rolecall engine.
//!
//! Role balance lives in `GameOptions`; the values here describe how the
//! host loop and the stock maps behave and are not meant to be tuned per
//! lobby.

// Update loop --------------------------------------------------------------
/// Rate at which the host drives `fixed_update`.
pub const FIXED_UPDATE_HZ: u32 = 30;
/// Seconds elapsed per fixed update.
pub const FIXED_DELTA_TIME: f32 = 1.0 / FIXED_UPDATE_HZ as f32;
/// Low-load role ticks run once every this many fixed updates (5 Hz).
pub const LOW_LOAD_INTERVAL: u64 = 6;

// Options defaults -------------------------------------------------------
pub(crate) const DEFAULT_KILL_COOLDOWN: f32 = 25.0;
pub(crate) const DEFAULT_MAX_GHOSTS_PER_TEAM: u32 = 1;
pub(crate) const DEFAULT_UNLUCKY_SUICIDE_CHANCE: u8 = 5;
pub(crate) const MAX_MAP_ID: u8 = 5;

// Maps ---------------------------------------------------------------------
/// Map id of the Airship, the only map with several lights panels.
pub const AIRSHIP_MAP_ID: u8 = 4;
/// Players within this distance of a disabled panel cannot flip its switches.
pub(crate) const LIGHTS_PANEL_RADIUS: f32 = 2.0;
pub(crate) const AIRSHIP_VIEWING_DECK_PANEL: (f32, f32) = (-12.93, -11.28);
pub(crate) const AIRSHIP_GAP_ROOM_PANEL: (f32, f32) = (13.92, 6.43);
pub(crate) const AIRSHIP_CARGO_PANEL: (f32, f32) = (30.56, 2.12);
/// Electrical updates carrying an amount up to this value are switch flips.
pub const ELECTRICAL_SWITCH_MAX: u8 = 4;

// Presentation keys --------------------------------------------------------
pub(crate) const KILL_BUTTON_TEXT: &str = "KillButtonText";
pub(crate) const LOG_PHASE_START: &str = "-----------Start of game-----------";
