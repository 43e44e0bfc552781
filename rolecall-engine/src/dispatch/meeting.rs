//! Meetings: reports, votes, exile and guessing.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{DeathRecord, DispatchOutcome, EventDispatcher, Stage, StageResult, SuppressReason, Suppression};
use crate::behavior::VoterState;
use crate::host::HostApi;
use crate::player::{DeathReason, PlayerId};
use crate::roles::CustomRole;
use crate::world::{HookCtx, PendingDeath};

/// Weighted result of a vote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    /// Weight received per target; skips are not counted here.
    pub weights: BTreeMap<PlayerId, u32>,
    pub skips: u32,
    /// Votes as shown on the meeting screen.
    pub visible: Vec<VoterState>,
    /// Unique top target with more weight than the skips.
    pub exiled: Option<PlayerId>,
    pub tie: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GuessOutcome {
    Cancelled(Suppression),
    /// The guess was right; the target died.
    Correct { victim: PlayerId },
    /// The guess was wrong; the guesser died.
    Misguess { victim: PlayerId },
}

impl<H: HostApi> EventDispatcher<H> {
    /// `reporter` reports `target`'s body, or presses the button when `None`.
    pub fn start_meeting(&mut self, reporter: PlayerId, target: Option<PlayerId>) -> DispatchOutcome {
        let round = &mut self.world.round;
        round.report_target = target;
        round.dead_bodies = round.unreported_bodies.clone();
        if !self.is_host() {
            return DispatchOutcome::Proceed;
        }

        let result = self
            .meeting_global_policy(reporter)
            .and_then(|()| self.meeting_role_override(reporter, target));
        if result.is_ok() {
            log::info!(target: "ReportDeadBody", "{reporter} => {target:?}");
            self.world.round.meeting_started = true;
            self.world.round.unreported_bodies.clear();
            self.for_each_active_role(|b, ctx| b.on_report_dead_body(ctx, reporter, target));
            for (holder, role) in self.holders() {
                self.invoke(role, |b, ctx| b.on_meeting_hud_start(ctx, holder));
            }
            self.settle();
        }
        result.into()
    }

    pub(crate) fn meeting_global_policy(&self, reporter: PlayerId) -> StageResult {
        self.require_alive(reporter)?;
        if self.world.round.meeting_started {
            return Err(Suppression::new(
                Stage::GlobalPolicy,
                SuppressReason::MeetingInProgress,
            ));
        }
        Ok(())
    }

    pub(crate) fn meeting_role_override(&self, reporter: PlayerId, target: Option<PlayerId>) -> StageResult {
        let killer = target.and_then(|body| self.world.round.killed_by.get(&body).copied());
        let refused = self.world.registry.roles_of(reporter).into_iter().find(|role| {
            self.behaviors.get(*role).is_some_and(|b| match target {
                None => !b.on_check_start_meeting(&self.world, reporter),
                Some(body) => !b.on_check_report_dead_body(&self.world, reporter, body, killer),
            })
        });
        match refused {
            Some(role) => Err(Suppression::new(
                Stage::RoleOverride,
                SuppressReason::RoleRefused(role),
            )),
            None => Ok(()),
        }
    }

    /// `voter` votes for `target` (`None` skips).
    pub fn cast_vote(&mut self, voter: PlayerId, target: Option<PlayerId>) -> DispatchOutcome {
        if !self.is_host() {
            return DispatchOutcome::Proceed;
        }
        let result = self.require_alive(voter).and_then(|()| self.require_meeting());
        if result.is_ok() {
            self.for_each_role_of(voter, |b, ctx| b.on_vote(ctx, voter, target));
            if let Some(voted) = target {
                self.for_each_role_of(voted, |b, ctx| b.on_voted(ctx, voted, voter));
            }
        }
        result.into()
    }

    fn require_meeting(&self) -> StageResult {
        if self.world.round.meeting_started {
            Ok(())
        } else {
            Err(Suppression::new(Stage::GlobalPolicy, SuppressReason::NoMeeting))
        }
    }

    /// Weigh the final votes: each vote counts `1 + add_real_votes_num`
    /// summed over the voter's roles.
    #[must_use]
    pub fn tally_votes(&self, votes: &[VoterState]) -> VoteTally {
        let mut tally = VoteTally::default();
        for vote in votes {
            let behaviors = self.behaviors_of(vote.voter);
            let weight = behaviors
                .iter()
                .map(|b| b.add_real_votes_num(&self.world, vote.voter))
                .fold(1u32, u32::saturating_add);
            let bucket = match vote.target {
                Some(target) => tally.weights.entry(target).or_default(),
                None => &mut tally.skips,
            };
            *bucket = bucket.saturating_add(weight);
            if !behaviors.iter().any(|b| b.hide_vote(&self.world, vote.voter)) {
                tally.visible.push(*vote);
            }
            for b in &behaviors {
                b.add_visual_votes(&self.world, *vote, &mut tally.visible);
            }
        }

        let top = tally.weights.values().copied().max().unwrap_or(0);
        let leaders: Vec<PlayerId> = tally
            .weights
            .iter()
            .filter(|(_, w)| **w == top)
            .map(|(p, _)| *p)
            .collect();
        tally.tie = leaders.len() > 1 || (top > 0 && top == tally.skips);
        if !tally.tie && top > tally.skips {
            tally.exiled = leaders.first().copied();
        }
        tally
    }

    /// The meeting ejected `exiled`, or nobody.
    pub fn exile(&mut self, exiled: Option<PlayerId>) -> Vec<DeathRecord> {
        if !self.is_host() {
            return Vec::new();
        }
        if let Some(player) = exiled
            && let Some(info) = self.world.players.get_mut(player)
            && info.is_alive()
        {
            info.kill(DeathReason::Vote);
            log::info!(target: "Exile", "{player} was ejected");
            let decided = self.world.round.declared_winner.is_some();
            self.for_each_role_of(player, |b, ctx| b.check_exile_target(ctx, player, decided));
            self.world.push_death(PendingDeath {
                killer: player,
                victim: player,
                reason: DeathReason::Vote,
            });
        }
        for (holder, role) in self.holders() {
            self.invoke(role, |b, ctx| b.on_player_exiled(ctx, holder, exiled));
        }
        self.settle();
        self.take_deaths()
    }

    /// Close the meeting and run the after-meeting hooks.
    pub fn end_meeting(&mut self) {
        let round = &mut self.world.round;
        round.meeting_started = false;
        round.report_target = None;
        round.dead_bodies.clear();
        if !self.is_host() {
            return;
        }
        for role in self.world.registry.active_roles() {
            if let Some(behavior) = self.behaviors.get_mut(role) {
                behavior.meeting_hud_clear();
            }
        }
        self.for_each_active_role(|b, ctx| b.notify_after_meeting(ctx));
        self.for_each_active_role(|b, ctx| b.after_meeting_tasks(ctx));
        for holder in self.world.players.living_ids() {
            let primary = self.world.primary(holder);
            self.invoke(primary, |b, ctx| {
                if b.can_use_kill_button(ctx.world, holder) {
                    b.set_kill_cooldown(ctx.world, holder);
                }
            });
        }
        self.settle();
    }

    /// `guesser` claims `target` holds `role`. The loser of the guess dies.
    pub fn guess(&mut self, guesser: PlayerId, target: Option<PlayerId>, role: CustomRole, is_ui: bool) -> GuessOutcome {
        let cancel = |s: Suppression| GuessOutcome::Cancelled(s);
        if let Err(s) = self.require_meeting().and_then(|()| self.require_alive(guesser)) {
            return cancel(s);
        }
        let refuse = |role| Suppression::new(Stage::RoleOverride, SuppressReason::RoleRefused(role));
        if let Some(by) = self.first_refusal(guesser, |b, ctx| !b.guess_check(ctx, is_ui, guesser, target, role)) {
            return cancel(refuse(by));
        }
        // Hooks have already vetoed an absent target; this only guards the lookup.
        let Some(target) = target else {
            return cancel(Suppression::new(Stage::GlobalPolicy, SuppressReason::NotEligible));
        };
        if let Err(s) = self.require_alive(target) {
            return cancel(s);
        }
        if let Some(by) = self.first_refusal(target, |b, ctx| !b.on_role_guess(ctx, is_ui, Some(target), guesser, role)) {
            return cancel(refuse(by));
        }

        let correct = self.world.has_role(target, role);
        let victim = if correct { target } else { guesser };
        log::info!(target: "Guesser", "{guesser} guessed {target} as {role}: {correct}");
        HookCtx::new(&mut self.world, &mut self.host).force_kill(guesser, victim, DeathReason::Guess);
        self.settle();
        if correct {
            GuessOutcome::Correct { victim }
        } else {
            GuessOutcome::Misguess { victim }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingHost;
    use crate::options::{GameOptions, RoleSettings};
    use crate::player::{PlayerInfo, PlayerTable};
    use crate::round::DeclaredWinner;

    fn dispatcher(options: GameOptions, roles: &[CustomRole]) -> EventDispatcher<RecordingHost> {
        let players: PlayerTable = (0..roles.len())
            .map(|i| PlayerInfo::new(PlayerId(i as u8), format!("p{i}")))
            .collect();
        let mut d = EventDispatcher::new(options, players, 5, RecordingHost::new());
        for (i, role) in roles.iter().enumerate() {
            d.assign_primary(PlayerId(i as u8), *role).unwrap();
        }
        d.round_start();
        d
    }

    fn vote(voter: u8, target: Option<u8>) -> VoterState {
        VoterState {
            voter: PlayerId(voter),
            target: target.map(PlayerId),
        }
    }

    #[test]
    fn dead_reporter_is_rejected_before_role_hooks() {
        let mut d = dispatcher(GameOptions::default(), &[CustomRole::Crewmate, CustomRole::Impostor]);
        if let Some(p) = d.world_mut().players.get_mut(PlayerId(0)) {
            p.kill(DeathReason::Kill);
        }
        let outcome = d.start_meeting(PlayerId(0), None);
        assert_eq!(
            outcome.suppression(),
            Some(Suppression::new(
                Stage::GlobalPolicy,
                SuppressReason::NotAlive(PlayerId(0))
            ))
        );
        assert!(!d.world().round.meeting_started);
    }

    #[test]
    fn report_records_target_and_bodies() {
        let mut d = dispatcher(
            GameOptions::default(),
            &[CustomRole::Impostor, CustomRole::Crewmate, CustomRole::Crewmate],
        );
        d.check_murder(PlayerId(0), PlayerId(1));
        assert!(d.start_meeting(PlayerId(2), Some(PlayerId(1))).proceeds());
        let round = &d.world().round;
        assert!(round.meeting_started);
        assert_eq!(round.report_target, Some(PlayerId(1)));
        assert_eq!(round.dead_bodies, vec![PlayerId(1)]);
        assert!(round.unreported_bodies.is_empty());

        d.end_meeting();
        assert!(!d.world().round.meeting_started);
        assert!(d.world().round.dead_bodies.is_empty());
    }

    #[test]
    fn mayor_votes_weigh_more() {
        let options = GameOptions::default().with_role(
            CustomRole::Mayor,
            RoleSettings {
                extra_votes: 2,
                ..RoleSettings::with_mode(100, 1)
            },
        );
        let d = dispatcher(
            options,
            &[CustomRole::Mayor, CustomRole::Crewmate, CustomRole::Crewmate, CustomRole::Impostor],
        );
        let tally = d.tally_votes(&[vote(0, Some(3)), vote(1, Some(2)), vote(2, Some(1)), vote(3, None)]);
        assert_eq!(tally.weights.get(&PlayerId(3)), Some(&3));
        assert_eq!(tally.skips, 1);
        assert_eq!(tally.exiled, Some(PlayerId(3)));
        assert!(!tally.tie);
        assert_eq!(tally.visible.len(), 4);
    }

    #[test]
    fn huge_extra_votes_saturate() {
        let options = GameOptions::default().with_role(
            CustomRole::Mayor,
            RoleSettings {
                extra_votes: u32::MAX,
                ..RoleSettings::with_mode(100, 1)
            },
        );
        assert!(options.validate().is_ok());
        let d = dispatcher(options, &[CustomRole::Mayor, CustomRole::Crewmate, CustomRole::Impostor]);
        let tally = d.tally_votes(&[vote(0, Some(2)), vote(1, Some(2)), vote(2, None)]);
        assert_eq!(tally.weights.get(&PlayerId(2)), Some(&u32::MAX));
        assert_eq!(tally.exiled, Some(PlayerId(2)));

        let skipped = d.tally_votes(&[vote(0, None), vote(1, None)]);
        assert_eq!(skipped.skips, u32::MAX);
        assert_eq!(skipped.exiled, None);
    }

    #[test]
    fn tied_vote_exiles_nobody() {
        let d = dispatcher(GameOptions::default(), &[CustomRole::Crewmate, CustomRole::Impostor]);
        let tally = d.tally_votes(&[vote(0, Some(1)), vote(1, Some(0))]);
        assert!(tally.tie);
        assert_eq!(tally.exiled, None);
    }

    #[test]
    fn exiled_jester_declares_a_winner() {
        let options = GameOptions::default().with_role(CustomRole::Jester, RoleSettings::with_mode(100, 1));
        let mut d = dispatcher(options, &[CustomRole::Jester, CustomRole::Impostor, CustomRole::Crewmate]);
        d.start_meeting(PlayerId(2), None);
        let deaths = d.exile(Some(PlayerId(0)));
        assert_eq!(deaths.len(), 1);
        assert_eq!(deaths[0].reason, DeathReason::Vote);
        assert_eq!(
            d.world().round.declared_winner,
            Some(DeclaredWinner {
                role: CustomRole::Jester,
                player: PlayerId(0)
            })
        );
    }

    #[test]
    fn votes_need_an_open_meeting() {
        let mut d = dispatcher(GameOptions::default(), &[CustomRole::Crewmate, CustomRole::Impostor]);
        assert_eq!(
            d.cast_vote(PlayerId(0), Some(PlayerId(1))).suppression().map(|s| s.reason),
            Some(SuppressReason::NoMeeting)
        );
        d.start_meeting(PlayerId(0), None);
        assert!(d.cast_vote(PlayerId(0), Some(PlayerId(1))).proceeds());
    }

    #[test]
    fn guesser_kills_on_a_right_guess_and_dies_on_a_wrong_one() {
        let options = GameOptions::default().with_role(
            CustomRole::NiceGuesser,
            RoleSettings {
                ability_uses: Some(2),
                ..RoleSettings::with_mode(100, 1)
            },
        );
        let mut d = dispatcher(
            options,
            &[CustomRole::NiceGuesser, CustomRole::Impostor, CustomRole::Crewmate, CustomRole::Shapeshifter],
        );
        d.start_meeting(PlayerId(2), None);

        assert_eq!(
            d.guess(PlayerId(0), Some(PlayerId(1)), CustomRole::Impostor, true),
            GuessOutcome::Correct { victim: PlayerId(1) }
        );
        assert!(!d.world().is_alive(PlayerId(1)));

        assert_eq!(
            d.guess(PlayerId(0), Some(PlayerId(3)), CustomRole::Camouflager, true),
            GuessOutcome::Misguess { victim: PlayerId(0) }
        );
        assert!(!d.world().is_alive(PlayerId(0)));
    }

    #[test]
    fn guess_without_target_is_cancelled() {
        let mut d = dispatcher(GameOptions::default(), &[CustomRole::Crewmate, CustomRole::Impostor]);
        d.start_meeting(PlayerId(0), None);
        let outcome = d.guess(PlayerId(0), None, CustomRole::Impostor, false);
        assert!(matches!(outcome, GuessOutcome::Cancelled(_)));
    }
}
