//! Player actions outside meetings: vents, tasks, protection, shapeshifts,
//! sabotage presses and the end of the game.
use super::{DispatchOutcome, EventDispatcher, Stage, StageResult, SuppressReason, Suppression};
use crate::behavior::{PlayerGameOptions, VentId};
use crate::host::HostApi;
use crate::player::PlayerId;
use crate::roles::CustomRole;
use crate::round::DeclaredWinner;
use crate::ship::SystemType;

impl<H: HostApi> EventDispatcher<H> {
    pub fn enter_vent(&mut self, player: PlayerId, vent: VentId) -> DispatchOutcome {
        if !self.is_host() {
            return DispatchOutcome::Proceed;
        }
        let result = self
            .require_alive(player)
            .and_then(|()| self.vent_role_override(player, vent));
        if result.is_ok() {
            self.for_each_role_of(player, |b, ctx| b.on_enter_vent(ctx, player, vent));
            self.for_each_role_of(player, |b, ctx| b.on_co_enter_vent(ctx, player, vent));
        }
        result.into()
    }

    /// Engineers vent natively; everyone else needs the impostor vent button.
    pub(crate) fn vent_role_override(&self, player: PlayerId, vent: VentId) -> StageResult {
        let Some(primary) = self.primary_behavior(player) else {
            return Err(Suppression::new(Stage::RoleOverride, SuppressReason::NotEligible));
        };
        let native = primary.base_role() == CustomRole::Engineer;
        if !native && !primary.can_use_impostor_vent_button(&self.world, player) {
            return Err(Suppression::new(Stage::RoleOverride, SuppressReason::NotEligible));
        }
        let booted = self
            .world
            .registry
            .roles_of(player)
            .into_iter()
            .find(|role| {
                self.behaviors
                    .get(*role)
                    .is_some_and(|b| b.check_boot_from_vent(&self.world, player, vent))
            });
        match booted {
            Some(role) => Err(Suppression::new(
                Stage::RoleOverride,
                SuppressReason::BootedFromVent(role),
            )),
            None => Ok(()),
        }
    }

    pub fn exit_vent(&mut self, player: PlayerId, vent: VentId) {
        if self.is_host() && self.world.players.contains(player) {
            self.for_each_role_of(player, |b, ctx| b.on_exit_vent(ctx, player, vent));
        }
    }

    /// `player` finished one task.
    pub fn complete_task(&mut self, player: PlayerId) -> DispatchOutcome {
        if !self.is_host() {
            return DispatchOutcome::Proceed;
        }
        if let Err(s) = self.require_present(player) {
            return DispatchOutcome::Suppressed(s);
        }
        let (completed, total) = match self.world.players.get_mut(player) {
            Some(info) => {
                info.tasks_completed = (info.tasks_completed + 1).min(info.tasks_total);
                (info.tasks_completed, info.tasks_total)
            }
            None => return DispatchOutcome::Proceed,
        };
        self.for_each_role_of(player, |b, ctx| b.on_task_complete(ctx, player, completed, total));
        DispatchOutcome::Proceed
    }

    /// Guardian-angel style protect button; `angel` is dead, `target` alive.
    pub fn protect(&mut self, angel: PlayerId, target: PlayerId) -> DispatchOutcome {
        if !self.is_host() {
            return DispatchOutcome::Proceed;
        }
        let result = self.require_present(angel).and_then(|()| self.require_alive(target));
        if result.is_ok() {
            self.for_each_role_of(angel, |b, ctx| b.on_check_protect(ctx, angel, target));
        }
        result.into()
    }

    pub fn shapeshift(&mut self, shapeshifter: PlayerId, target: PlayerId, shapeshifting: bool, hidden: bool) -> DispatchOutcome {
        if !self.is_host() {
            return DispatchOutcome::Proceed;
        }
        let result = self
            .require_alive(shapeshifter)
            .and_then(|()| self.require_present(target));
        if result.is_ok() {
            self.for_each_role_of(shapeshifter, |b, ctx| {
                b.on_shapeshift(ctx, shapeshifter, target, shapeshifting, hidden);
            });
        }
        result.into()
    }

    /// `player` pressed the sabotage button for `system`.
    ///
    /// On success the sabotage goes through [`Self::system_update`] exactly
    /// as the host's sabotage system update would.
    pub fn sabotage(&mut self, player: PlayerId, system: SystemType) -> DispatchOutcome {
        if !self.is_host() {
            return DispatchOutcome::Proceed;
        }
        let result = self
            .sabotage_global_policy(player)
            .and_then(|()| self.sabotage_role_override(player, system));
        match result {
            Ok(()) => self.system_update(SystemType::Sabotage, player, system.code()),
            Err(s) => DispatchOutcome::Suppressed(s),
        }
    }

    fn sabotage_global_policy(&self, player: PlayerId) -> StageResult {
        if self.world.options.disable_sabotage {
            return Err(Suppression::new(
                Stage::GlobalPolicy,
                SuppressReason::SabotageDisabled,
            ));
        }
        self.require_present(player)?;
        if self.world.round.meeting_started {
            return Err(Suppression::new(
                Stage::GlobalPolicy,
                SuppressReason::MeetingInProgress,
            ));
        }
        Ok(())
    }

    fn sabotage_role_override(&mut self, player: PlayerId, system: SystemType) -> StageResult {
        let eligible = self
            .primary_behavior(player)
            .is_some_and(|b| b.can_use_sabotage(&self.world, player));
        if !eligible {
            return Err(Suppression::new(Stage::RoleOverride, SuppressReason::NotEligible));
        }
        match self.first_refusal(player, |b, ctx| b.on_sabotage(ctx, player, system)) {
            Some(role) => Err(Suppression::new(
                Stage::RoleOverride,
                SuppressReason::RoleRefused(role),
            )),
            None => Ok(()),
        }
    }

    /// Game over: run the end-of-game hooks and report any solo winner.
    pub fn end_game(&mut self) -> Option<DeclaredWinner> {
        if self.is_host() {
            self.for_each_active_role(|b, ctx| b.on_co_end_game(ctx));
        }
        self.world.round.declared_winner
    }

    /// Per-player settings the host should send, after every role had its say.
    #[must_use]
    pub fn player_game_options(&self, player: PlayerId) -> PlayerGameOptions {
        let mut opts = PlayerGameOptions {
            kill_cooldown: self
                .world
                .round
                .kill_cooldown(player)
                .unwrap_or(self.world.options.default_kill_cooldown),
            vision_multiplier: 1.0,
            engineer_vent_cooldown: None,
            guardian_protect_cooldown: None,
        };
        for behavior in self.behaviors_of(player) {
            behavior.apply_game_options(&self.world, &mut opts, player);
        }
        opts
    }
}
