//! Ship system events: repairs, sabotage updates, doors and task wins.
use super::{DispatchOutcome, EventDispatcher, SessionMode, Stage, StageResult, SuppressReason, Suppression};
use crate::behavior::RepairVerdict;
use crate::constants::{
    AIRSHIP_CARGO_PANEL, AIRSHIP_GAP_ROOM_PANEL, AIRSHIP_MAP_ID, AIRSHIP_VIEWING_DECK_PANEL,
    ELECTRICAL_SWITCH_MAX, LIGHTS_PANEL_RADIUS,
};
use crate::host::HostApi;
use crate::player::{DeathReason, PlayerId, Vec2};
use crate::roles::CustomRole;
use crate::ship::SystemType;
use crate::world::HookCtx;

const fn is_switch_flip(system: SystemType, amount: u8) -> bool {
    matches!(system, SystemType::Electrical) && amount <= ELECTRICAL_SWITCH_MAX
}

impl<H: HostApi> EventDispatcher<H> {
    /// A player sent a system update (repair, switch flip, door, sabotage).
    ///
    /// Returns whether the host should apply it.
    pub fn system_update(&mut self, system: SystemType, player: PlayerId, amount: u8) -> DispatchOutcome {
        self.log_repair(system, player, amount);
        if !self.is_host() {
            return DispatchOutcome::Proceed;
        }

        let result = self
            .repair_global_policy(system, player, amount)
            .and_then(|()| self.repair_role_override(system, player, amount))
            .map(|()| self.repair_action(system, amount));
        self.repair_notification(system, player, amount, result.is_ok());
        result.into()
    }

    fn log_repair(&mut self, system: SystemType, player: PlayerId, amount: u8) {
        let name = self
            .world
            .players
            .get(player)
            .map_or("<unknown>", |p| p.name.as_str());
        let line = format!(
            "SystemType: {system:?}, PlayerName: {name}({}), amount: {amount}",
            self.world.primary(player)
        );
        log::info!(target: "RepairSystem", "{line}");
        if self.world.options.repair_echo && self.session == SessionMode::Local {
            self.host.send_in_game(&line);
        }
    }

    /// Lobby-wide rules that apply whatever role the player holds.
    pub(crate) fn repair_global_policy(&mut self, system: SystemType, player: PlayerId, amount: u8) -> StageResult {
        let suppress = |reason| Err(Suppression::new(Stage::GlobalPolicy, reason));
        let options = &self.world.options;

        if options.disable_sabotage && system == SystemType::Sabotage {
            return suppress(SuppressReason::SabotageDisabled);
        }
        if self.world.has_role(player, CustomRole::Fool)
            && !self.world.round.meeting_started
            && system.is_fool_blocked()
        {
            return suppress(SuppressReason::FoolBlocked);
        }
        if is_switch_flip(system, amount)
            && options.map_id == AIRSHIP_MAP_ID
            && let Some(info) = self.world.players.get(player)
            && self.near_disabled_lights_panel(info.position)
        {
            return suppress(SuppressReason::LightsPanelDisabled);
        }
        if system == SystemType::Doors
            && self.world.has_role(player, CustomRole::Unlucky)
            && self.world.is_alive(player)
            && self.world.roll_chance(options.unlucky_sabotage_suicide_chance)
        {
            log::info!(target: "Unlucky", "{player} touched a door and died");
            HookCtx::new(&mut self.world, &mut self.host).force_kill(player, player, DeathReason::Suicide);
            self.settle();
            return suppress(SuppressReason::UnluckySuicide);
        }
        Ok(())
    }

    fn near_disabled_lights_panel(&self, position: Vec2) -> bool {
        let options = &self.world.options;
        [
            (options.disable_airship_viewing_deck_lights_panel, AIRSHIP_VIEWING_DECK_PANEL),
            (options.disable_airship_gap_room_lights_panel, AIRSHIP_GAP_ROOM_PANEL),
            (options.disable_airship_cargo_lights_panel, AIRSHIP_CARGO_PANEL),
        ]
        .into_iter()
        .any(|(disabled, panel)| disabled && position.distance(panel.into()) <= LIGHTS_PANEL_RADIUS)
    }

    /// Pre-repair role hooks; fast fixes happen here, a veto suppresses.
    pub(crate) fn repair_role_override(&mut self, system: SystemType, player: PlayerId, amount: u8) -> StageResult {
        let vetoed = self.first_refusal(player, |b, ctx| {
            b.update_system(ctx, system, amount, player) == RepairVerdict::Proceed
        });
        match vetoed {
            Some(role) => Err(Suppression::new(
                Stage::RoleOverride,
                SuppressReason::RoleRefused(role),
            )),
            None => Ok(()),
        }
    }

    /// Mirror the update the host is about to apply.
    fn repair_action(&mut self, system: SystemType, amount: u8) {
        self.world.ship.apply_update(system, amount);
    }

    /// Post-repair: camouflage follows comms, and a switch flip that left the
    /// lights out gives the player's roles a chance to finish the job.
    pub(crate) fn repair_notification(&mut self, system: SystemType, player: PlayerId, amount: u8, applied: bool) {
        self.recheck_camouflage();
        if applied && is_switch_flip(system, amount) && self.world.ship.switches.is_active() {
            self.for_each_role_of(player, |b, ctx| b.switch_system_update(ctx, amount, player));
        }
    }

    /// Open every door in `min..=max` if `amount` names one of them.
    pub fn check_and_open_doors_range(&mut self, amount: u8, min: u8, max: u8) {
        if !self.is_host() || !(min..=max).contains(&amount) {
            return;
        }
        for door in min..=max {
            self.world.ship.apply_update(SystemType::Doors, door);
            self.host.update_system(SystemType::Doors, door);
        }
    }

    /// Someone closed `doors`.
    pub fn close_doors(&mut self, doors: &[u8]) -> DispatchOutcome {
        if !self.is_host() {
            return DispatchOutcome::Proceed;
        }
        if self.world.options.disable_close_door {
            return DispatchOutcome::Suppressed(Suppression::new(
                Stage::GlobalPolicy,
                SuppressReason::CloseDoorDisabled,
            ));
        }
        for door in doors {
            self.world.ship.close_door(*door);
        }
        DispatchOutcome::Proceed
    }

    /// Whether the host may evaluate a task win at all.
    #[must_use]
    pub fn check_task_completion(&self) -> DispatchOutcome {
        let options = &self.world.options;
        let reason = if options.disable_task_win {
            SuppressReason::TaskWinDisabled
        } else if options.no_game_end {
            SuppressReason::NoGameEnd
        } else if self.world.round.initial_total_tasks == 0 {
            SuppressReason::NoTasks
        } else {
            return DispatchOutcome::Proceed;
        };
        DispatchOutcome::Suppressed(Suppression::new(Stage::GlobalPolicy, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Authority;
    use crate::host::{HostCommand, RecordingHost};
    use crate::options::{GameOptions, RoleSettings};
    use crate::player::{PlayerInfo, PlayerTable};

    fn dispatcher(options: GameOptions) -> EventDispatcher<RecordingHost> {
        let players: PlayerTable = (0..4)
            .map(|i| PlayerInfo::new(PlayerId(i), format!("p{i}")).with_tasks(2))
            .collect();
        EventDispatcher::new(options, players, 3, RecordingHost::new())
    }

    #[test]
    fn disabled_sabotage_is_refused_before_role_hooks() {
        let options = GameOptions {
            disable_sabotage: true,
            ..GameOptions::default()
        };
        let mut d = dispatcher(options);
        d.assign_primary(PlayerId(0), CustomRole::Impostor).unwrap();
        d.round_start();
        let outcome = d.system_update(SystemType::Sabotage, PlayerId(0), SystemType::Reactor.code());
        assert_eq!(
            outcome.suppression().map(|s| s.reason),
            Some(SuppressReason::SabotageDisabled)
        );
        assert!(!d.world().ship.is_sabotaged(SystemType::Reactor));
    }

    #[test]
    fn fool_cannot_repair_outside_meetings() {
        let mut d = dispatcher(GameOptions::default());
        d.assign_primary(PlayerId(1), CustomRole::Crewmate).unwrap();
        d.add_sub_role(PlayerId(1), CustomRole::Fool).unwrap();
        d.round_start();
        d.world_mut().ship.sabotage(SystemType::Comms);

        let outcome = d.system_update(SystemType::Comms, PlayerId(1), 0);
        assert_eq!(
            outcome.suppression(),
            Some(Suppression::new(Stage::GlobalPolicy, SuppressReason::FoolBlocked))
        );
        assert!(d.world().ship.is_sabotaged(SystemType::Comms));

        // Doors are fine.
        assert!(d.system_update(SystemType::Doors, PlayerId(1), 2).proceeds());
    }

    #[test]
    fn sabotage_master_fast_fixes_reactor_once_per_charge() {
        let options = GameOptions::default().with_role(
            CustomRole::SabotageMaster,
            RoleSettings {
                ability_uses: Some(1),
                ..RoleSettings::with_mode(100, 1)
            },
        );
        let mut d = dispatcher(options);
        d.assign_primary(PlayerId(2), CustomRole::SabotageMaster).unwrap();
        d.round_start();

        d.world_mut().ship.sabotage(SystemType::Reactor);
        assert!(d.system_update(SystemType::Reactor, PlayerId(2), 64).proceeds());
        assert!(!d.world().ship.is_sabotaged(SystemType::Reactor));
        assert_eq!(
            d.host().count(&HostCommand::ScheduleRepair {
                system: SystemType::Reactor
            }),
            1
        );

        d.world_mut().ship.sabotage(SystemType::LifeSupp);
        d.host_mut().take();
        // Out of charges: the update still goes through, but no fast fix.
        assert!(d.system_update(SystemType::LifeSupp, PlayerId(2), 0).proceeds());
        assert!(d.host().commands().is_empty());
    }

    #[test]
    fn alchemist_fixes_lights_after_the_flip() {
        let options = GameOptions::default().with_role(CustomRole::Alchemist, RoleSettings::with_mode(100, 1));
        let mut d = dispatcher(options);
        d.assign_primary(PlayerId(3), CustomRole::Alchemist).unwrap();
        d.round_start();
        d.enter_vent(PlayerId(3), 1);
        d.exit_vent(PlayerId(3), 1);

        d.world_mut().ship.sabotage(SystemType::Electrical);
        assert!(d.system_update(SystemType::Electrical, PlayerId(3), 0).proceeds());
        assert!(!d.world().ship.is_sabotaged(SystemType::Electrical));

        // The potion is spent.
        d.world_mut().ship.sabotage(SystemType::Electrical);
        d.system_update(SystemType::Electrical, PlayerId(3), 1);
        assert!(d.world().ship.is_sabotaged(SystemType::Electrical));
    }

    #[test]
    fn disabled_airship_panel_blocks_nearby_flips() {
        let options = GameOptions {
            map_id: AIRSHIP_MAP_ID,
            disable_airship_cargo_lights_panel: true,
            ..GameOptions::default()
        };
        let mut d = dispatcher(options);
        d.round_start();
        if let Some(p) = d.world_mut().players.get_mut(PlayerId(0)) {
            p.position = Vec2::new(30.0, 2.5);
        }
        let outcome = d.system_update(SystemType::Electrical, PlayerId(0), 3);
        assert_eq!(
            outcome.suppression().map(|s| s.reason),
            Some(SuppressReason::LightsPanelDisabled)
        );
        // Far away from every panel.
        if let Some(p) = d.world_mut().players.get_mut(PlayerId(0)) {
            p.position = Vec2::new(0.0, 0.0);
        }
        assert!(d.system_update(SystemType::Electrical, PlayerId(0), 3).proceeds());
    }

    #[test]
    fn unlucky_always_dies_at_full_chance() {
        let options = GameOptions {
            unlucky_sabotage_suicide_chance: 100,
            ..GameOptions::default()
        };
        let mut d = dispatcher(options);
        d.assign_primary(PlayerId(1), CustomRole::Crewmate).unwrap();
        d.add_sub_role(PlayerId(1), CustomRole::Unlucky).unwrap();
        d.round_start();

        let outcome = d.system_update(SystemType::Doors, PlayerId(1), 4);
        assert_eq!(
            outcome.suppression().map(|s| s.reason),
            Some(SuppressReason::UnluckySuicide)
        );
        assert!(!d.world().is_alive(PlayerId(1)));
        let deaths = d.take_deaths();
        assert_eq!(deaths.len(), 1);
        assert_eq!(deaths[0].reason, DeathReason::Suicide);
    }

    #[test]
    fn repairs_echo_only_in_local_sessions() {
        let options = GameOptions {
            repair_echo: true,
            ..GameOptions::default()
        };
        let mut online = dispatcher(options.clone());
        online.system_update(SystemType::Doors, PlayerId(0), 1);
        assert!(online.host().commands().is_empty());

        let mut local = dispatcher(options).with_session(SessionMode::Local);
        local.system_update(SystemType::Doors, PlayerId(0), 1);
        assert!(matches!(
            local.host().commands(),
            [HostCommand::SendInGame { .. }]
        ));
    }

    #[test]
    fn clients_let_everything_through() {
        let options = GameOptions {
            disable_sabotage: true,
            disable_close_door: true,
            ..GameOptions::default()
        };
        let mut d = dispatcher(options).with_authority(Authority::Client);
        assert!(d.system_update(SystemType::Sabotage, PlayerId(0), 7).proceeds());
        assert!(d.close_doors(&[1, 2]).proceeds());
    }

    #[test]
    fn door_range_opens_all_or_nothing() {
        let mut d = dispatcher(GameOptions::default());
        d.check_and_open_doors_range(9, 0, 3);
        assert!(d.host().commands().is_empty());
        d.check_and_open_doors_range(2, 0, 3);
        assert_eq!(d.host().commands().len(), 4);
    }

    #[test]
    fn task_win_suppression() {
        let mut d = dispatcher(GameOptions::default());
        assert_eq!(
            d.check_task_completion().suppression().map(|s| s.reason),
            Some(SuppressReason::NoTasks)
        );
        d.round_start();
        assert!(d.check_task_completion().proceeds());
        d.world_mut().options.no_game_end = true;
        assert_eq!(
            d.check_task_completion().suppression().map(|s| s.reason),
            Some(SuppressReason::NoGameEnd)
        );
    }
}
