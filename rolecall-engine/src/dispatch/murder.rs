//! Murder resolution.
use serde::{Deserialize, Serialize};

use super::{DeathRecord, DispatchOutcome, EventDispatcher, Stage, StageResult, SuppressReason, Suppression};
use crate::host::HostApi;
use crate::player::{DeathReason, PlayerId};
use crate::world::HookCtx;

/// Everything that came out of one murder attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MurderReport {
    pub outcome: DispatchOutcome,
    /// Living bystanders who see the kill flash.
    pub flash_seers: Vec<PlayerId>,
    /// Every death processed while resolving the attempt, misfires included.
    pub deaths: Vec<DeathRecord>,
}

impl MurderReport {
    fn passthrough() -> Self {
        Self {
            outcome: DispatchOutcome::Proceed,
            flash_seers: Vec::new(),
            deaths: Vec::new(),
        }
    }
}

impl<H: HostApi> EventDispatcher<H> {
    /// `killer` tries to kill `target`.
    pub fn check_murder(&mut self, killer: PlayerId, target: PlayerId) -> MurderReport {
        if !self.is_host() {
            return MurderReport::passthrough();
        }
        log::info!(target: "CheckMurder", "{killer} => {target}");

        let result = self
            .murder_global_policy(killer, target)
            .and_then(|()| self.murder_role_override(killer, target));
        let mut flash_seers = Vec::new();
        if result.is_ok() {
            self.murder_action(killer, target);
            flash_seers = self.murder_notification(killer, target);
        }
        MurderReport {
            outcome: result.into(),
            flash_seers,
            deaths: self.take_deaths(),
        }
    }

    pub(crate) fn murder_global_policy(&self, killer: PlayerId, target: PlayerId) -> StageResult {
        self.require_alive(killer)?;
        self.require_alive(target)?;
        if self.world.round.meeting_started {
            return Err(Suppression::new(
                Stage::GlobalPolicy,
                SuppressReason::MeetingInProgress,
            ));
        }
        Ok(())
    }

    /// Killer checks, then target checks, then every bystander's veto.
    pub(crate) fn murder_role_override(&mut self, killer: PlayerId, target: PlayerId) -> StageResult {
        let refuse = |role| Err(Suppression::new(Stage::RoleOverride, SuppressReason::RoleRefused(role)));

        if let Some(role) = self.first_refusal(killer, |b, ctx| {
            b.forced_check_murder_as_killer(ctx, killer, target)
        }) {
            return refuse(role);
        }
        if let Some(role) = self.first_refusal(killer, |b, ctx| b.on_check_murder_as_killer(ctx, killer, target)) {
            return refuse(role);
        }
        if let Some(role) = self.first_refusal(target, |b, ctx| b.on_check_murder_as_target(ctx, killer, target)) {
            return refuse(role);
        }
        for (holder, role) in self.holders() {
            if holder == killer || holder == target {
                continue;
            }
            let allowed = self.invoke(role, |b, ctx| {
                b.check_murder_on_others_target(ctx, holder, killer, target)
            });
            self.settle();
            if allowed == Some(false) {
                return refuse(role);
            }
        }
        // A hook may have killed either party already (e.g. a misfire).
        self.murder_global_policy(killer, target)
    }

    fn murder_action(&mut self, killer: PlayerId, target: PlayerId) {
        let mut ctx = HookCtx::new(&mut self.world, &mut self.host);
        ctx.force_kill(killer, target, DeathReason::Kill);
        let primary = self.world.primary(killer);
        self.invoke(primary, |b, ctx| b.set_kill_cooldown(ctx.world, killer));
    }

    /// Murder hooks, kill flash, then death follow-up for the victim.
    fn murder_notification(&mut self, killer: PlayerId, target: PlayerId) -> Vec<PlayerId> {
        self.for_each_role_of(killer, |b, ctx| b.on_murder(ctx, killer, target));
        self.for_each_role_of(target, |b, ctx| b.on_target_dead(ctx, killer, target));

        let seers = self
            .world
            .players
            .living_ids()
            .into_iter()
            .filter(|seer| *seer != killer && *seer != target)
            .filter(|seer| {
                self.behaviors_of(*seer)
                    .iter()
                    .any(|b| b.kill_flash_check(&self.world, killer, target, *seer))
            })
            .collect();
        self.settle();
        seers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ghost::GhostOutcome;
    use crate::host::RecordingHost;
    use crate::options::{GameOptions, RoleSettings};
    use crate::player::{PlayerInfo, PlayerTable};
    use crate::roles::CustomRole;

    fn dispatcher(options: GameOptions, roles: &[CustomRole]) -> EventDispatcher<RecordingHost> {
        let players: PlayerTable = (0..roles.len())
            .map(|i| PlayerInfo::new(PlayerId(i as u8), format!("p{i}")))
            .collect();
        let mut d = EventDispatcher::new(options, players, 21, RecordingHost::new());
        for (i, role) in roles.iter().enumerate() {
            d.assign_primary(PlayerId(i as u8), *role).unwrap();
        }
        d.round_start();
        d
    }

    #[test]
    fn plain_kill_goes_through() {
        let mut d = dispatcher(
            GameOptions::default(),
            &[CustomRole::Impostor, CustomRole::Crewmate, CustomRole::Crewmate],
        );
        let report = d.check_murder(PlayerId(0), PlayerId(1));
        assert!(report.outcome.proceeds());
        assert!(!d.world().is_alive(PlayerId(1)));
        assert_eq!(d.host().murders(), vec![(PlayerId(0), PlayerId(1))]);
        assert_eq!(report.deaths.len(), 1);
        assert_eq!(d.world().round.kill_cooldown(PlayerId(0)), Some(25.0));
    }

    #[test]
    fn dead_or_missing_parties_are_refused_globally() {
        let mut d = dispatcher(
            GameOptions::default(),
            &[CustomRole::Impostor, CustomRole::Crewmate],
        );
        let report = d.check_murder(PlayerId(0), PlayerId(9));
        assert_eq!(
            report.outcome.suppression(),
            Some(Suppression::new(
                Stage::GlobalPolicy,
                SuppressReason::UnknownPlayer(PlayerId(9))
            ))
        );
        d.check_murder(PlayerId(0), PlayerId(1));
        let again = d.check_murder(PlayerId(0), PlayerId(1));
        assert_eq!(
            again.outcome.suppression().map(|s| s.reason),
            Some(SuppressReason::NotAlive(PlayerId(1)))
        );
    }

    #[test]
    fn sheriff_misfire_kills_the_sheriff() {
        let options = GameOptions::default().with_role(CustomRole::Sheriff, RoleSettings::with_mode(100, 1));
        let mut d = dispatcher(options, &[CustomRole::Sheriff, CustomRole::Crewmate, CustomRole::Impostor]);

        let report = d.check_murder(PlayerId(0), PlayerId(1));
        assert_eq!(
            report.outcome.suppression(),
            Some(Suppression::new(
                Stage::RoleOverride,
                SuppressReason::RoleRefused(CustomRole::Sheriff)
            ))
        );
        assert!(!d.world().is_alive(PlayerId(0)));
        assert!(d.world().is_alive(PlayerId(1)));
        assert_eq!(report.deaths[0].reason, DeathReason::Misfire);
    }

    #[test]
    fn sheriff_shoots_impostors() {
        let options = GameOptions::default().with_role(CustomRole::Sheriff, RoleSettings::with_mode(100, 1));
        let mut d = dispatcher(options, &[CustomRole::Sheriff, CustomRole::Impostor]);
        assert!(d.check_murder(PlayerId(0), PlayerId(1)).outcome.proceeds());
        assert!(!d.world().is_alive(PlayerId(1)));
    }

    #[test]
    fn medic_shield_blocks_the_next_kill() {
        let options = GameOptions::default().with_role(
            CustomRole::Medic,
            RoleSettings {
                ability_uses: Some(1),
                ..RoleSettings::with_mode(100, 1)
            },
        );
        let mut d = dispatcher(options, &[CustomRole::Medic, CustomRole::Crewmate, CustomRole::Impostor]);

        // Medic "kills" to shield; nobody dies.
        let shield = d.check_murder(PlayerId(0), PlayerId(1));
        assert!(!shield.outcome.proceeds());
        assert!(d.world().is_alive(PlayerId(1)));

        let attack = d.check_murder(PlayerId(2), PlayerId(1));
        assert_eq!(
            attack.outcome.suppression().map(|s| s.reason),
            Some(SuppressReason::RoleRefused(CustomRole::Medic))
        );
        assert!(d.world().is_alive(PlayerId(1)));

        // The shield breaks on the blocked attack.
        let second = d.check_murder(PlayerId(2), PlayerId(1));
        assert!(second.outcome.proceeds());
        assert!(!d.world().is_alive(PlayerId(1)));
        assert_eq!(d.host().murders(), vec![(PlayerId(2), PlayerId(1))]);
    }

    #[test]
    fn no_kills_during_meetings() {
        let mut d = dispatcher(GameOptions::default(), &[CustomRole::Impostor, CustomRole::Crewmate]);
        d.world_mut().round.meeting_started = true;
        let report = d.check_murder(PlayerId(0), PlayerId(1));
        assert_eq!(
            report.outcome.suppression().map(|s| s.reason),
            Some(SuppressReason::MeetingInProgress)
        );
    }

    #[test]
    fn victim_gets_a_ghost_role_when_configured() {
        let options = GameOptions {
            max_crew_ghost: 1,
            ..GameOptions::default()
        }
        .with_role(CustomRole::Hawk, RoleSettings::with_mode(100, 1));
        let mut d = dispatcher(options, &[CustomRole::Impostor, CustomRole::Crewmate]);
        let report = d.check_murder(PlayerId(0), PlayerId(1));
        assert_eq!(report.deaths[0].ghost, GhostOutcome::Assigned(CustomRole::Hawk));
        assert_eq!(d.world().primary(PlayerId(1)), CustomRole::Hawk);
        assert_eq!(
            d.world().round.ghost.previous_role(PlayerId(1)),
            Some(CustomRole::Crewmate)
        );
    }
}
