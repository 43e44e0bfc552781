//! State that lives for exactly one round.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ghost::GhostState;
use crate::options::GameOptions;
use crate::player::PlayerId;
use crate::roles::CustomRole;
use crate::ship::{ShipState, SystemType};

/// Camouflage state; everyone looks alike while it is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camouflage {
    pub active: bool,
    /// Player whose ability forced camouflage on, if any.
    pub forced_by: Option<PlayerId>,
}

impl Camouflage {
    /// Recompute camouflage; returns `true` when the state flipped.
    pub fn recheck(&mut self, options: &GameOptions, ship: &ShipState) -> bool {
        let wanted = self.forced_by.is_some()
            || (options.comms_camouflage && ship.is_sabotaged(SystemType::Comms));
        let changed = wanted != self.active;
        self.active = wanted;
        changed
    }
}

/// Role that has claimed the round outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredWinner {
    pub role: CustomRole,
    pub player: PlayerId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundContext {
    pub ghost: GhostState,
    /// Kill cooldown in seconds per player, as last set by their role.
    pub kill_cooldowns: BTreeMap<PlayerId, f32>,
    pub meeting_started: bool,
    pub report_target: Option<PlayerId>,
    /// Bodies on the floor when the current meeting was called.
    pub dead_bodies: Vec<PlayerId>,
    /// Seconds until cooldowns are resent; `None` when nothing is pending.
    pub refix_cooldown_delay: Option<f32>,
    pub is_fixed_cooldown: bool,
    pub camouflage: Camouflage,
    /// Fixed updates processed this round.
    pub tick: u64,
    pub alive_at_start: usize,
    pub initial_total_tasks: u32,
    pub declared_winner: Option<DeclaredWinner>,
    /// Bodies not yet reported, oldest first.
    pub unreported_bodies: Vec<PlayerId>,
    /// Victim → killer for every death this round.
    pub killed_by: BTreeMap<PlayerId, PlayerId>,
}

impl RoundContext {
    /// Fresh round with the ghost pool filled from `options`.
    #[must_use]
    pub fn new(options: &GameOptions) -> Self {
        Self {
            ghost: GhostState::from_options(options),
            ..Self::default()
        }
    }

    /// Schedule a cooldown resync after `delay` seconds.
    pub fn schedule_refix(&mut self, delay: f32) {
        self.is_fixed_cooldown = true;
        self.refix_cooldown_delay = Some(delay.max(0.0));
    }

    #[must_use]
    pub fn kill_cooldown(&self, player: PlayerId) -> Option<f32> {
        self.kill_cooldowns.get(&player).copied()
    }
}
