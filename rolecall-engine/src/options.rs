//! Lobby configuration consumed by the engine.
//!
//! Options are read-only from the engine's point of view; the host edits
//! them in the lobby and hands the engine a fresh copy before each round.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::{
    DEFAULT_KILL_COOLDOWN, DEFAULT_MAX_GHOSTS_PER_TEAM, DEFAULT_UNLUCKY_SUICIDE_CHANCE, MAX_MAP_ID,
};
use crate::roles::CustomRole;

const DEFAULT_OPTIONS_DATA: &str = include_str!("../data/options.json");

/// Errors raised when options fail to parse or violate their ranges.
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("options JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{role} spawn mode must be a percentage (got {mode})")]
    ModeOutOfRange { role: CustomRole, mode: u8 },
    #[error("{0} is a placeholder and cannot be configured")]
    Placeholder(CustomRole),
    #[error("{field} must be at least 0 (got {value:.2})")]
    NegativeCooldown { field: String, value: f32 },
    #[error("unlucky suicide chance must be a percentage (got {0})")]
    ChanceOutOfRange(u8),
    #[error("unknown map id {0}")]
    UnknownMap(u8),
}

/// Per-role lobby settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSettings {
    /// Spawn chance as a percentage; `0` disables the role, `100` always spawns it.
    #[serde(default)]
    pub mode: u8,
    /// Population cap for the role.
    #[serde(default = "RoleSettings::default_count")]
    pub count: u32,
    /// Kill cooldown override in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_cooldown: Option<f32>,
    /// Ability charges per round; `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ability_uses: Option<u32>,
    /// Additional votes cast by the holder.
    #[serde(default)]
    pub extra_votes: u32,
}

impl RoleSettings {
    const fn default_count() -> u32 {
        1
    }

    #[must_use]
    pub const fn with_mode(mode: u8, count: u32) -> Self {
        Self {
            mode,
            count,
            kill_cooldown: None,
            ability_uses: None,
            extra_votes: 0,
        }
    }
}

impl Default for RoleSettings {
    fn default() -> Self {
        Self::with_mode(0, Self::default_count())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameOptions {
    pub hide_and_seek: bool,
    pub map_id: u8,
    pub disable_sabotage: bool,
    pub disable_close_door: bool,
    pub disable_task_win: bool,
    pub no_game_end: bool,
    pub disable_airship_viewing_deck_lights_panel: bool,
    pub disable_airship_gap_room_lights_panel: bool,
    pub disable_airship_cargo_lights_panel: bool,
    /// Percent chance an Unlucky player dies when touching a door.
    pub unlucky_sabotage_suicide_chance: u8,
    pub default_kill_cooldown: f32,
    pub max_imp_ghost: u32,
    pub max_crew_ghost: u32,
    pub converted_can_become_ghost: bool,
    /// Camouflage everyone while communications are sabotaged.
    pub comms_camouflage: bool,
    /// Echo every repair into the in-game chat (local sessions only).
    pub repair_echo: bool,
    pub roles: BTreeMap<CustomRole, RoleSettings>,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            hide_and_seek: false,
            map_id: 0,
            disable_sabotage: false,
            disable_close_door: false,
            disable_task_win: false,
            no_game_end: false,
            disable_airship_viewing_deck_lights_panel: false,
            disable_airship_gap_room_lights_panel: false,
            disable_airship_cargo_lights_panel: false,
            unlucky_sabotage_suicide_chance: DEFAULT_UNLUCKY_SUICIDE_CHANCE,
            default_kill_cooldown: DEFAULT_KILL_COOLDOWN,
            max_imp_ghost: DEFAULT_MAX_GHOSTS_PER_TEAM,
            max_crew_ghost: DEFAULT_MAX_GHOSTS_PER_TEAM,
            converted_can_become_ghost: false,
            comms_camouflage: false,
            repair_echo: false,
            roles: BTreeMap::new(),
        }
    }
}

impl GameOptions {
    /// Parse and validate options from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Load the options bundled with the crate.
    ///
    /// Falls back to `GameOptions::default()` if the bundled file is unusable.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_OPTIONS_DATA).unwrap_or_else(|err| {
            log::warn!(target: "Options", "bundled options rejected: {err}");
            Self::default()
        })
    }

    /// Check every range invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.map_id > MAX_MAP_ID {
            return Err(OptionsError::UnknownMap(self.map_id));
        }
        if self.unlucky_sabotage_suicide_chance > 100 {
            return Err(OptionsError::ChanceOutOfRange(
                self.unlucky_sabotage_suicide_chance,
            ));
        }
        if self.default_kill_cooldown < 0.0 {
            return Err(OptionsError::NegativeCooldown {
                field: "default_kill_cooldown".to_string(),
                value: self.default_kill_cooldown,
            });
        }
        for (role, settings) in &self.roles {
            if *role == CustomRole::NotAssigned {
                return Err(OptionsError::Placeholder(*role));
            }
            if settings.mode > 100 {
                return Err(OptionsError::ModeOutOfRange {
                    role: *role,
                    mode: settings.mode,
                });
            }
            if let Some(cooldown) = settings.kill_cooldown
                && cooldown < 0.0
            {
                return Err(OptionsError::NegativeCooldown {
                    field: format!("{role}.kill_cooldown"),
                    value: cooldown,
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn role_settings(&self, role: CustomRole) -> Option<&RoleSettings> {
        self.roles.get(&role)
    }

    /// Spawn mode of a role, `0` when unconfigured.
    #[must_use]
    pub fn mode_of(&self, role: CustomRole) -> u8 {
        self.role_settings(role).map_or(0, |s| s.mode)
    }

    #[must_use]
    pub fn count_of(&self, role: CustomRole) -> u32 {
        self.role_settings(role).map_or(0, |s| s.count)
    }

    #[must_use]
    pub fn is_role_enabled(&self, role: CustomRole) -> bool {
        self.mode_of(role) > 0
    }

    #[must_use]
    pub fn ability_uses(&self, role: CustomRole) -> Option<u32> {
        self.role_settings(role).and_then(|s| s.ability_uses)
    }

    /// Kill cooldown for a role: its override, else the lobby default.
    #[must_use]
    pub fn kill_cooldown_for(&self, role: CustomRole) -> f32 {
        self.role_settings(role)
            .and_then(|s| s.kill_cooldown)
            .unwrap_or(self.default_kill_cooldown)
    }

    /// Ghost roles with a configured population, in declaration order.
    pub fn ghost_role_counts(&self) -> impl Iterator<Item = (CustomRole, u32)> + '_ {
        self.roles
            .iter()
            .filter(|(role, _)| role.is_ghost_role())
            .map(|(role, settings)| (*role, settings.count))
    }

    #[must_use]
    pub fn has_ghost_roles(&self) -> bool {
        self.ghost_role_counts().next().is_some()
    }

    /// Builder-style helper used by tests and the simulator.
    #[must_use]
    pub fn with_role(mut self, role: CustomRole, settings: RoleSettings) -> Self {
        self.roles.insert(role, settings);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_options_parse_and_validate() {
        let options = GameOptions::from_json(DEFAULT_OPTIONS_DATA).expect("bundled options");
        assert!(options.has_ghost_roles());
        assert_eq!(options.mode_of(CustomRole::Hawk), 100);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let options = GameOptions::from_json("{}").unwrap();
        assert_eq!(options, GameOptions::default());
        assert!((options.kill_cooldown_for(CustomRole::Sheriff) - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn role_keys_use_variant_names() {
        let json = r#"{ "roles": { "Sheriff": { "mode": 50, "kill_cooldown": 15.0 } } }"#;
        let options = GameOptions::from_json(json).unwrap();
        assert_eq!(options.mode_of(CustomRole::Sheriff), 50);
        assert_eq!(options.count_of(CustomRole::Sheriff), 1);
        assert!((options.kill_cooldown_for(CustomRole::Sheriff) - 15.0).abs() < f32::EPSILON);
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let bad_mode = GameOptions::default()
            .with_role(CustomRole::Mayor, RoleSettings::with_mode(120, 1));
        assert!(matches!(
            bad_mode.validate(),
            Err(OptionsError::ModeOutOfRange { mode: 120, .. })
        ));

        let bad_map = GameOptions {
            map_id: 9,
            ..GameOptions::default()
        };
        assert!(matches!(bad_map.validate(), Err(OptionsError::UnknownMap(9))));

        let mut bad_cd = GameOptions::default();
        bad_cd.default_kill_cooldown = -1.0;
        assert!(matches!(
            bad_cd.validate(),
            Err(OptionsError::NegativeCooldown { .. })
        ));

        assert!(matches!(
            GameOptions::from_json("{ not json"),
            Err(OptionsError::Parse(_))
        ));
    }

    #[test]
    fn ghost_role_counts_skip_other_roles() {
        let options = GameOptions::default()
            .with_role(CustomRole::Mayor, RoleSettings::with_mode(100, 1))
            .with_role(CustomRole::Warden, RoleSettings::with_mode(50, 2));
        let ghosts: Vec<_> = options.ghost_role_counts().collect();
        assert_eq!(ghosts, vec![(CustomRole::Warden, 2)]);
    }
}
