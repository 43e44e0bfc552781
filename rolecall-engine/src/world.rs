//! Shared game state handed to role hooks.
use crate::ghost::GhostOutcome;
use crate::host::HostApi;
use crate::options::GameOptions;
use crate::player::{DeathReason, PlayerId, PlayerTable};
use crate::registry::RoleRegistry;
use crate::rng::{RngBundle, roll_percent};
use crate::roles::{CustomRole, RoleTeam};
use crate::round::RoundContext;
use crate::ship::{ShipState, SystemType};

/// A death caused outside the murder pipeline, waiting for follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDeath {
    pub killer: PlayerId,
    pub victim: PlayerId,
    pub reason: DeathReason,
}

/// Effects requested by hooks, applied by the dispatcher once the hook returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingEffects {
    pub role_changes: Vec<(PlayerId, CustomRole)>,
    pub deaths: Vec<PendingDeath>,
}

impl PendingEffects {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.role_changes.is_empty() && self.deaths.is_empty()
    }
}

#[derive(Debug)]
pub struct World {
    pub options: GameOptions,
    pub players: PlayerTable,
    pub registry: RoleRegistry,
    pub ship: ShipState,
    pub round: RoundContext,
    rng: RngBundle,
    pending: PendingEffects,
}

impl World {
    #[must_use]
    pub fn new(options: GameOptions, players: PlayerTable, seed: u64) -> Self {
        let round = RoundContext::new(&options);
        Self {
            options,
            players,
            registry: RoleRegistry::new(),
            ship: ShipState::new(),
            round,
            rng: RngBundle::from_user_seed(seed),
            pending: PendingEffects::default(),
        }
    }

    #[must_use]
    pub const fn rng(&self) -> &RngBundle {
        &self.rng
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = RngBundle::from_user_seed(seed);
    }

    #[must_use]
    pub fn is_alive(&self, player: PlayerId) -> bool {
        self.players.is_alive(player)
    }

    #[must_use]
    pub fn primary(&self, player: PlayerId) -> CustomRole {
        self.registry.primary(player)
    }

    #[must_use]
    pub fn has_role(&self, player: PlayerId, role: CustomRole) -> bool {
        self.registry.has_role(player, role)
    }

    #[must_use]
    pub fn team_of(&self, player: PlayerId) -> Option<RoleTeam> {
        self.registry.team_of(player)
    }

    #[must_use]
    pub fn is_impostor_aligned(&self, player: PlayerId) -> bool {
        self.team_of(player) == Some(RoleTeam::Impostor)
    }

    /// Run ghost-role selection for `player` against this round's pool.
    pub fn roll_ghost_role(&mut self, player: PlayerId) -> GhostOutcome {
        let mut rng = self.rng.ghost();
        self.round.ghost.assign(
            player,
            &self.options,
            &self.players,
            &self.registry,
            &mut *rng,
        )
    }

    /// Percentage roll on the chance stream.
    pub fn roll_chance(&self, percent: u8) -> bool {
        roll_percent(&mut *self.rng.chance(), percent)
    }

    /// Queue a primary-role change; applied after the current hook returns.
    pub fn request_role_change(&mut self, player: PlayerId, role: CustomRole) {
        self.pending.role_changes.push((player, role));
    }

    pub(crate) fn take_pending(&mut self) -> PendingEffects {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn push_death(&mut self, death: PendingDeath) {
        self.pending.deaths.push(death);
    }
}

/// Mutable view handed to hooks that may change the game.
pub struct HookCtx<'a> {
    pub world: &'a mut World,
    pub host: &'a mut dyn HostApi,
}

impl<'a> HookCtx<'a> {
    pub fn new(world: &'a mut World, host: &'a mut dyn HostApi) -> Self {
        Self { world, host }
    }

    /// Kill `victim` outside the murder pipeline (misfires, suicides, ability kills).
    ///
    /// Returns `false` if the victim was already dead or unknown.
    pub fn force_kill(&mut self, killer: PlayerId, victim: PlayerId, reason: DeathReason) -> bool {
        let Some(info) = self.world.players.get_mut(victim) else {
            return false;
        };
        if !info.is_alive() {
            return false;
        }
        info.kill(reason);
        self.host.murder_player(killer, victim);
        self.world.round.unreported_bodies.push(victim);
        self.world.round.killed_by.insert(victim, killer);
        self.world.push_death(PendingDeath {
            killer,
            victim,
            reason,
        });
        true
    }

    /// Complete a sabotage repair immediately.
    pub fn complete_repair(&mut self, system: SystemType) {
        self.world.ship.repair(system);
        self.host.schedule_repair_completion(system);
    }
}
