//! Crewmate-aligned roles.
use std::collections::{BTreeMap, BTreeSet};

use super::Charges;
use crate::behavior::{RepairVerdict, RoleBehavior, VentId};
use crate::player::{DeathReason, PlayerId};
use crate::roles::{CustomRole, RoleTeam};
use crate::ship::SystemType;
use crate::world::{HookCtx, World};

/// Sabotages that can be fast-fixed from a single console.
fn fast_fixable(system: SystemType) -> bool {
    system.is_critical() || system == SystemType::Comms
}

/// Repairs any sabotage from one console, a limited number of times.
#[derive(Debug, Clone, Default)]
pub struct SabotageMaster {
    charges: Charges,
}

impl RoleBehavior for SabotageMaster {
    fn role(&self) -> CustomRole {
        CustomRole::SabotageMaster
    }

    fn init(&mut self) {
        self.charges.clear();
    }

    fn add(&mut self, ctx: &mut HookCtx<'_>, player: PlayerId) {
        let uses = ctx.world.options.ability_uses(self.role());
        self.charges.grant(player, uses);
    }

    fn remove(&mut self, _ctx: &mut HookCtx<'_>, player: PlayerId) {
        self.charges.grant(player, Some(0));
    }

    fn update_system(
        &mut self,
        ctx: &mut HookCtx<'_>,
        system: SystemType,
        _amount: u8,
        player: PlayerId,
    ) -> RepairVerdict {
        if fast_fixable(system) && ctx.world.ship.is_sabotaged(system) && self.charges.try_use(player)
        {
            log::info!(target: "SabotageMaster", "{player} instant-fix {system:?}");
            ctx.complete_repair(system);
        }
        RepairVerdict::Proceed
    }

    fn switch_system_update(&mut self, ctx: &mut HookCtx<'_>, _amount: u8, player: PlayerId) {
        if ctx.world.ship.switches.is_active() && self.charges.try_use(player) {
            log::info!(target: "SwitchSystem", "{player} instant-fix-lights");
            ctx.complete_repair(SystemType::Electrical);
        }
    }

    fn get_progress_text(&self, _world: &World, player: PlayerId, comms: bool) -> String {
        match self.charges.remaining(player) {
            Some(_) if comms => "(?)".to_string(),
            Some(left) => format!("({left})"),
            None => String::new(),
        }
    }
}

/// Brews a potion in vents; the next sabotage they touch is fixed outright.
#[derive(Debug, Clone, Default)]
pub struct Alchemist {
    fix_next_sabo: BTreeSet<PlayerId>,
}

impl Alchemist {
    #[must_use]
    pub fn fix_pending(&self, player: PlayerId) -> bool {
        self.fix_next_sabo.contains(&player)
    }
}

impl RoleBehavior for Alchemist {
    fn role(&self) -> CustomRole {
        CustomRole::Alchemist
    }

    fn init(&mut self) {
        self.fix_next_sabo.clear();
    }

    fn add(&mut self, _ctx: &mut HookCtx<'_>, _player: PlayerId) {}

    fn remove(&mut self, _ctx: &mut HookCtx<'_>, player: PlayerId) {
        self.fix_next_sabo.remove(&player);
    }

    fn can_use_impostor_vent_button(&self, world: &World, player: PlayerId) -> bool {
        world.is_alive(player)
    }

    fn on_enter_vent(&mut self, _ctx: &mut HookCtx<'_>, player: PlayerId, _vent: VentId) {
        self.fix_next_sabo.insert(player);
    }

    fn update_system(
        &mut self,
        ctx: &mut HookCtx<'_>,
        system: SystemType,
        _amount: u8,
        player: PlayerId,
    ) -> RepairVerdict {
        // Lights are handled once the switch flip has been applied.
        if fast_fixable(system)
            && ctx.world.ship.is_sabotaged(system)
            && self.fix_next_sabo.remove(&player)
        {
            log::info!(target: "Alchemist", "{player} potion fixes {system:?}");
            ctx.complete_repair(system);
        }
        RepairVerdict::Proceed
    }

    fn switch_system_update(&mut self, ctx: &mut HookCtx<'_>, _amount: u8, player: PlayerId) {
        if self.fix_next_sabo.remove(&player) {
            log::info!(target: "SwitchSystem", "{player} instant-fix-lights");
            ctx.complete_repair(SystemType::Electrical);
        }
    }
}

/// Votes count extra.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mayor;

impl RoleBehavior for Mayor {
    fn role(&self) -> CustomRole {
        CustomRole::Mayor
    }

    fn init(&mut self) {}

    fn add(&mut self, _ctx: &mut HookCtx<'_>, _player: PlayerId) {}

    fn add_real_votes_num(&self, world: &World, _voter: PlayerId) -> u32 {
        world
            .options
            .role_settings(self.role())
            .map_or(0, |s| s.extra_votes)
    }
}

/// Crewmate with a gun; shooting a non-impostor kills the Sheriff instead.
#[derive(Debug, Clone, Default)]
pub struct Sheriff {
    shots: Charges,
}

impl RoleBehavior for Sheriff {
    fn role(&self) -> CustomRole {
        CustomRole::Sheriff
    }

    fn init(&mut self) {
        self.shots.clear();
    }

    fn add(&mut self, ctx: &mut HookCtx<'_>, player: PlayerId) {
        let uses = ctx.world.options.ability_uses(self.role());
        self.shots.grant(player, uses);
        self.set_kill_cooldown(ctx.world, player);
    }

    fn can_use_kill_button(&self, world: &World, player: PlayerId) -> bool {
        world.is_alive(player) && self.shots.has_any(player)
    }

    fn can_use_impostor_vent_button(&self, _world: &World, _player: PlayerId) -> bool {
        false
    }

    fn can_use_sabotage(&self, _world: &World, _player: PlayerId) -> bool {
        false
    }

    fn on_check_murder_as_killer(&mut self, ctx: &mut HookCtx<'_>, killer: PlayerId, target: PlayerId) -> bool {
        if !self.shots.try_use(killer) {
            return false;
        }
        if ctx.world.team_of(target) == Some(RoleTeam::Impostor) {
            return true;
        }
        log::info!(target: "Sheriff", "{killer} misfired on {target}");
        ctx.force_kill(killer, killer, DeathReason::Misfire);
        false
    }

    fn get_progress_text(&self, _world: &World, player: PlayerId, _comms: bool) -> String {
        self.shots
            .remaining(player)
            .map(|left| format!("({left})"))
            .unwrap_or_default()
    }
}

/// Uses the kill button to shield one player from murder.
#[derive(Debug, Clone, Default)]
pub struct Medic {
    shields: Charges,
    /// Medic → shielded player.
    protected: BTreeMap<PlayerId, PlayerId>,
}

impl Medic {
    #[must_use]
    pub fn protected_by(&self, medic: PlayerId) -> Option<PlayerId> {
        self.protected.get(&medic).copied()
    }
}

impl RoleBehavior for Medic {
    fn role(&self) -> CustomRole {
        CustomRole::Medic
    }

    fn init(&mut self) {
        self.shields.clear();
        self.protected.clear();
    }

    fn add(&mut self, ctx: &mut HookCtx<'_>, player: PlayerId) {
        let uses = ctx.world.options.ability_uses(self.role());
        self.shields.grant(player, uses);
        self.set_kill_cooldown(ctx.world, player);
    }

    fn remove(&mut self, _ctx: &mut HookCtx<'_>, player: PlayerId) {
        self.protected.remove(&player);
    }

    fn can_use_kill_button(&self, world: &World, player: PlayerId) -> bool {
        world.is_alive(player) && self.shields.has_any(player)
    }

    fn can_use_impostor_vent_button(&self, _world: &World, _player: PlayerId) -> bool {
        false
    }

    fn can_use_sabotage(&self, _world: &World, _player: PlayerId) -> bool {
        false
    }

    fn on_check_murder_as_killer(&mut self, _ctx: &mut HookCtx<'_>, killer: PlayerId, target: PlayerId) -> bool {
        if self.shields.try_use(killer) {
            log::info!(target: "Medic", "{killer} shields {target}");
            self.protected.insert(killer, target);
        }
        false
    }

    fn check_murder_on_others_target(
        &mut self,
        _ctx: &mut HookCtx<'_>,
        holder: PlayerId,
        killer: PlayerId,
        target: PlayerId,
    ) -> bool {
        if self.protected.get(&holder) == Some(&target) {
            log::info!(target: "Medic", "{target} shielded by {holder}; {killer} blocked");
            self.protected.remove(&holder);
            return false;
        }
        true
    }

    fn after_player_death_task(&mut self, _ctx: &mut HookCtx<'_>, target: PlayerId) {
        self.protected.remove(&target);
    }

    fn get_mark(&self, _world: &World, seer: PlayerId, seen: Option<PlayerId>, _for_meeting: bool) -> String {
        match seen {
            Some(seen) if self.protected.get(&seer) == Some(&seen) => "✚".to_string(),
            _ => String::new(),
        }
    }

    fn ability_button_text(&self, _world: &World, _player: PlayerId) -> &'static str {
        "MedicalerButtonText"
    }
}

/// Guesses roles during meetings, a limited number of times per round.
#[derive(Debug, Clone, Default)]
pub struct NiceGuesser {
    guesses: Charges,
}

impl RoleBehavior for NiceGuesser {
    fn role(&self) -> CustomRole {
        CustomRole::NiceGuesser
    }

    fn init(&mut self) {
        self.guesses.clear();
    }

    fn add(&mut self, ctx: &mut HookCtx<'_>, player: PlayerId) {
        let uses = ctx.world.options.ability_uses(self.role());
        self.guesses.grant(player, uses);
    }

    fn guess_check(
        &mut self,
        ctx: &mut HookCtx<'_>,
        _is_ui: bool,
        guesser: PlayerId,
        target: Option<PlayerId>,
        role: CustomRole,
    ) -> bool {
        let Some(target) = target else {
            return true;
        };
        // Crewmate guessers may not guess the crewmate base role.
        if role == CustomRole::Crewmate || !ctx.world.is_alive(target) {
            return true;
        }
        !self.guesses.try_use(guesser)
    }

    fn get_progress_text(&self, _world: &World, player: PlayerId, _comms: bool) -> String {
        self.guesses
            .remaining(player)
            .map(|left| format!("({left})"))
            .unwrap_or_default()
    }
}
