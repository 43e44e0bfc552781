//! Ghost-role assignment.
//!
//! When a player dies they may be promoted into a ghost role drawn from a
//! per-round pool. Each configured ghost role has a population that is
//! filled once at round start and only ever decremented. Each team also has
//! a cap on how many of its dead may haunt the ship.
//!
//! A single assignment walks `NotAssigned → Eligible → PoolSelected` and
//! ends in `Assigned` or `NoneGranted`; players failing the eligibility
//! checks are reported as skipped and never leave `NotAssigned`.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::options::GameOptions;
use crate::player::{PlayerId, PlayerTable};
use crate::registry::RoleRegistry;
use crate::rng::roll_percent;
use crate::roles::{CustomRole, RoleTeam};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostPhase {
    NotAssigned,
    Eligible,
    PoolSelected,
    Assigned,
    NoneGranted,
}

/// Why a dying player was never considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostSkip {
    HideAndSeek,
    UnknownPlayer,
    Disconnected,
    AlreadyRecorded,
    ExcludedRole,
    AlreadyGhost,
    NoGhostRolesConfigured,
}

/// Why an eligible player ended without a ghost role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoGrantReason {
    TeamCapReached,
    NoAlignment,
    NoCandidates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum GhostOutcome {
    Skipped(GhostSkip),
    NoneGranted(NoGrantReason),
    Assigned(CustomRole),
}

impl GhostOutcome {
    /// Terminal phase reached by this assignment attempt.
    #[must_use]
    pub const fn phase(self) -> GhostPhase {
        match self {
            Self::Skipped(_) => GhostPhase::NotAssigned,
            Self::NoneGranted(_) => GhostPhase::NoneGranted,
            Self::Assigned(_) => GhostPhase::Assigned,
        }
    }

    /// Every phase this attempt passed through, ending in [`Self::phase`].
    ///
    /// `Eligible` and `PoolSelected` are transient inside
    /// [`GhostState::assign`]; this is where they become visible.
    #[must_use]
    pub const fn path(self) -> &'static [GhostPhase] {
        use GhostPhase::{Assigned, Eligible, NoneGranted, NotAssigned, PoolSelected};
        match self {
            Self::Skipped(_) => &[NotAssigned],
            Self::NoneGranted(NoGrantReason::NoCandidates) => {
                &[NotAssigned, Eligible, PoolSelected, NoneGranted]
            }
            Self::NoneGranted(_) => &[NotAssigned, Eligible, NoneGranted],
            Self::Assigned(_) => &[NotAssigned, Eligible, PoolSelected, Assigned],
        }
    }

    #[must_use]
    pub const fn granted(self) -> Option<CustomRole> {
        match self {
            Self::Assigned(role) => Some(role),
            _ => None,
        }
    }
}

/// Round-scoped ghost bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostState {
    /// Role each dead player held when first considered; write-once.
    previous_roles: BTreeMap<PlayerId, CustomRole>,
    /// Remaining assignable population per ghost role.
    pool: BTreeMap<CustomRole, u32>,
    imp_count: u32,
    crew_count: u32,
}

impl GhostState {
    /// Fresh state with the pool filled from the lobby options.
    #[must_use]
    pub fn from_options(options: &GameOptions) -> Self {
        let mut state = Self::default();
        state.refill(options);
        state
    }

    fn refill(&mut self, options: &GameOptions) {
        for (role, count) in options.ghost_role_counts() {
            self.pool.entry(role).or_insert(count);
        }
    }

    pub fn clear(&mut self) {
        self.previous_roles.clear();
        self.pool.clear();
        self.imp_count = 0;
        self.crew_count = 0;
    }

    #[must_use]
    pub fn previous_role(&self, player: PlayerId) -> Option<CustomRole> {
        self.previous_roles.get(&player).copied()
    }

    #[must_use]
    pub fn remaining(&self, role: CustomRole) -> u32 {
        self.pool.get(&role).copied().unwrap_or(0)
    }

    #[must_use]
    pub const fn team_count(&self, team: RoleTeam) -> u32 {
        match team {
            RoleTeam::Impostor => self.imp_count,
            RoleTeam::Crewmate => self.crew_count,
            RoleTeam::Neutral => 0,
        }
    }

    /// True when nothing has been recorded, counted, or pooled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.previous_roles.is_empty()
            && self.pool.is_empty()
            && self.imp_count == 0
            && self.crew_count == 0
    }

    /// Decide whether `player` receives a ghost role.
    ///
    /// On `Assigned` the pool and team counter are already updated; the
    /// caller is responsible for granting the role.
    pub fn assign<R: Rng + ?Sized>(
        &mut self,
        player: PlayerId,
        options: &GameOptions,
        players: &PlayerTable,
        registry: &RoleRegistry,
        rng: &mut R,
    ) -> GhostOutcome {
        if let Err(skip) = self.check_eligible(player, options, players, registry) {
            log::debug!(target: "GhostRoleAssign", "{player} skipped: {skip:?}");
            return GhostOutcome::Skipped(skip);
        }

        let current = registry.primary(player);
        let team = alignment(player, current, options, registry);
        if let Some(team) = team
            && self.team_count(team) >= team_cap(options, team)
        {
            return GhostOutcome::NoneGranted(NoGrantReason::TeamCapReached);
        }

        self.previous_roles.entry(player).or_insert(current);
        let Some(team) = team else {
            return GhostOutcome::NoneGranted(NoGrantReason::NoAlignment);
        };

        let candidates = self.candidates(team, options, rng);
        log::debug!(
            target: "GhostRoleAssign",
            "{player} ({current}) candidates: {candidates:?}"
        );
        if candidates.is_empty() {
            return GhostOutcome::NoneGranted(NoGrantReason::NoCandidates);
        }

        let chosen = candidates[rng.gen_range(0..candidates.len())];
        if let Some(left) = self.pool.get_mut(&chosen) {
            *left = left.saturating_sub(1);
        }
        match team {
            RoleTeam::Impostor => self.imp_count += 1,
            RoleTeam::Crewmate => self.crew_count += 1,
            RoleTeam::Neutral => {}
        }
        log::info!(target: "GhostRoleAssign", "{player} becomes {chosen}");
        GhostOutcome::Assigned(chosen)
    }

    fn check_eligible(
        &self,
        player: PlayerId,
        options: &GameOptions,
        players: &PlayerTable,
        registry: &RoleRegistry,
    ) -> Result<(), GhostSkip> {
        if options.hide_and_seek {
            return Err(GhostSkip::HideAndSeek);
        }
        let info = players.get(player).ok_or(GhostSkip::UnknownPlayer)?;
        if info.disconnected {
            return Err(GhostSkip::Disconnected);
        }
        if self.previous_roles.contains_key(&player) {
            return Err(GhostSkip::AlreadyRecorded);
        }
        let current = registry.primary(player);
        if current.is_ghost_excluded() {
            return Err(GhostSkip::ExcludedRole);
        }
        let haunted_add_on = registry.get(player).is_some_and(|roles| {
            roles.any_sub_role(|r| r.is_ghost_role() || r == CustomRole::Gravestone)
        });
        if current.is_ghost_role() || haunted_add_on {
            return Err(GhostSkip::AlreadyGhost);
        }
        if !options.has_ghost_roles() {
            return Err(GhostSkip::NoGhostRolesConfigured);
        }
        Ok(())
    }

    /// Roles of `team` that still have room and pass their acceptance roll.
    ///
    /// Rebuilt on every call; nothing is cached between deaths.
    fn candidates<R: Rng + ?Sized>(
        &self,
        team: RoleTeam,
        options: &GameOptions,
        rng: &mut R,
    ) -> Vec<CustomRole> {
        options
            .ghost_role_counts()
            .map(|(role, _)| role)
            .filter(|role| role.team() == team)
            .filter(|role| options.mode_of(*role) > 0 && self.remaining(*role) > 0)
            .filter(|role| roll_percent(rng, options.mode_of(*role)))
            .collect()
    }
}

fn team_cap(options: &GameOptions, team: RoleTeam) -> u32 {
    match team {
        RoleTeam::Impostor => options.max_imp_ghost,
        RoleTeam::Crewmate => options.max_crew_ghost,
        RoleTeam::Neutral => 0,
    }
}

/// Team the player haunts for, judged on the role held before death.
fn alignment(
    player: PlayerId,
    current: CustomRole,
    options: &GameOptions,
    registry: &RoleRegistry,
) -> Option<RoleTeam> {
    let converted = registry
        .get(player)
        .is_some_and(|roles| roles.any_sub_role(CustomRole::is_converted));
    if converted && !options.converted_can_become_ghost {
        return None;
    }
    match current.team() {
        RoleTeam::Neutral => None,
        team => Some(team),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RoleSettings;
    use crate::player::PlayerInfo;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn fixture(roles: &[(u8, CustomRole)]) -> (PlayerTable, RoleRegistry) {
        let mut players = PlayerTable::new();
        let mut registry = RoleRegistry::new();
        for (id, role) in roles {
            let mut info = PlayerInfo::new(PlayerId(*id), format!("p{id}"));
            info.alive = false;
            players.insert(info);
            registry.set_primary(PlayerId(*id), *role).unwrap();
        }
        (players, registry)
    }

    fn crew_ghost_options() -> GameOptions {
        GameOptions {
            max_crew_ghost: 1,
            max_imp_ghost: 1,
            ..GameOptions::default()
        }
        .with_role(CustomRole::Hawk, RoleSettings::with_mode(100, 1))
        .with_role(CustomRole::Warden, RoleSettings::with_mode(100, 1))
    }

    #[test]
    fn second_crew_death_hits_team_cap() {
        let options = crew_ghost_options();
        let (players, registry) = fixture(&[(1, CustomRole::Crewmate), (2, CustomRole::Mayor)]);
        let mut state = GhostState::from_options(&options);
        let mut rng = ChaCha20Rng::seed_from_u64(11);

        let first = state.assign(PlayerId(1), &options, &players, &registry, &mut rng);
        let granted = first.granted().expect("first crew death gets a ghost role");
        assert!(matches!(granted, CustomRole::Hawk | CustomRole::Warden));
        assert_eq!(state.team_count(RoleTeam::Crewmate), 1);
        assert_eq!(state.remaining(granted), 0);

        let second = state.assign(PlayerId(2), &options, &players, &registry, &mut rng);
        assert_eq!(
            second,
            GhostOutcome::NoneGranted(NoGrantReason::TeamCapReached)
        );
        assert_eq!(second.phase(), GhostPhase::NoneGranted);
    }

    #[test]
    fn repeated_assignment_is_a_no_op() {
        let options = crew_ghost_options();
        let (players, registry) = fixture(&[(1, CustomRole::Crewmate)]);
        let mut state = GhostState::from_options(&options);
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        assert!(
            state
                .assign(PlayerId(1), &options, &players, &registry, &mut rng)
                .granted()
                .is_some()
        );
        assert_eq!(
            state.assign(PlayerId(1), &options, &players, &registry, &mut rng),
            GhostOutcome::Skipped(GhostSkip::AlreadyRecorded)
        );
        assert_eq!(state.team_count(RoleTeam::Crewmate), 1);
        assert_eq!(state.previous_role(PlayerId(1)), Some(CustomRole::Crewmate));
    }

    #[test]
    fn exhausted_pool_stays_exhausted() {
        let options = GameOptions {
            max_crew_ghost: 10,
            ..GameOptions::default()
        }
        .with_role(CustomRole::Hawk, RoleSettings::with_mode(100, 1));
        let (players, registry) = fixture(&[
            (1, CustomRole::Crewmate),
            (2, CustomRole::Crewmate),
            (3, CustomRole::Crewmate),
        ]);
        let mut state = GhostState::from_options(&options);
        let mut rng = ChaCha20Rng::seed_from_u64(5);

        let outcomes: Vec<_> = [1, 2, 3]
            .into_iter()
            .map(|id| state.assign(PlayerId(id), &options, &players, &registry, &mut rng))
            .collect();
        assert_eq!(outcomes[0], GhostOutcome::Assigned(CustomRole::Hawk));
        assert_eq!(
            outcomes[1],
            GhostOutcome::NoneGranted(NoGrantReason::NoCandidates)
        );
        assert_eq!(
            outcomes[2],
            GhostOutcome::NoneGranted(NoGrantReason::NoCandidates)
        );
    }

    #[test]
    fn outcomes_report_the_phases_they_walked() {
        use GhostPhase::{Assigned, Eligible, NoneGranted, NotAssigned, PoolSelected};
        let options = GameOptions {
            max_crew_ghost: 1,
            ..GameOptions::default()
        }
        .with_role(CustomRole::Hawk, RoleSettings::with_mode(100, 1));
        let (players, registry) = fixture(&[
            (1, CustomRole::Crewmate),
            (2, CustomRole::Crewmate),
            (3, CustomRole::Impostor),
        ]);
        let mut state = GhostState::from_options(&options);
        let mut rng = ChaCha20Rng::seed_from_u64(2);

        let granted = state.assign(PlayerId(1), &options, &players, &registry, &mut rng);
        assert_eq!(granted.path(), &[NotAssigned, Eligible, PoolSelected, Assigned]);

        let capped = state.assign(PlayerId(2), &options, &players, &registry, &mut rng);
        assert_eq!(capped.path(), &[NotAssigned, Eligible, NoneGranted]);

        let empty = state.assign(PlayerId(3), &options, &players, &registry, &mut rng);
        assert_eq!(empty, GhostOutcome::NoneGranted(NoGrantReason::NoCandidates));
        assert_eq!(empty.path(), &[NotAssigned, Eligible, PoolSelected, NoneGranted]);

        let again = state.assign(PlayerId(1), &options, &players, &registry, &mut rng);
        assert_eq!(again.path(), &[NotAssigned]);
        for outcome in [granted, capped, empty, again] {
            assert_eq!(outcome.path().last(), Some(&outcome.phase()));
        }
    }

    #[test]
    fn zero_mode_roles_are_never_candidates() {
        let options = GameOptions::default()
            .with_role(CustomRole::Minion, RoleSettings::with_mode(0, 3));
        let (players, registry) = fixture(&[(1, CustomRole::Impostor)]);
        let mut state = GhostState::from_options(&options);
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        assert_eq!(
            state.assign(PlayerId(1), &options, &players, &registry, &mut rng),
            GhostOutcome::NoneGranted(NoGrantReason::NoCandidates)
        );
    }

    #[test]
    fn impostors_draw_from_impostor_pool() {
        let options = crew_ghost_options()
            .with_role(CustomRole::Minion, RoleSettings::with_mode(100, 1));
        let (players, registry) = fixture(&[(1, CustomRole::Camouflager)]);
        let mut state = GhostState::from_options(&options);
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        assert_eq!(
            state.assign(PlayerId(1), &options, &players, &registry, &mut rng),
            GhostOutcome::Assigned(CustomRole::Minion)
        );
        assert_eq!(state.team_count(RoleTeam::Impostor), 1);
        assert_eq!(state.team_count(RoleTeam::Crewmate), 0);
    }

    #[test]
    fn excluded_and_haunted_players_are_skipped() {
        let options = crew_ghost_options();
        let (players, mut registry) = fixture(&[
            (1, CustomRole::GM),
            (2, CustomRole::Warden),
            (3, CustomRole::Crewmate),
        ]);
        registry.add_sub_role(PlayerId(3), CustomRole::Gravestone).unwrap();
        let mut state = GhostState::from_options(&options);
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let skip = |state: &mut GhostState, id, rng: &mut ChaCha20Rng| {
            state.assign(PlayerId(id), &options, &players, &registry, rng)
        };
        assert_eq!(
            skip(&mut state, 1, &mut rng),
            GhostOutcome::Skipped(GhostSkip::ExcludedRole)
        );
        assert_eq!(
            skip(&mut state, 2, &mut rng),
            GhostOutcome::Skipped(GhostSkip::AlreadyGhost)
        );
        assert_eq!(
            skip(&mut state, 3, &mut rng),
            GhostOutcome::Skipped(GhostSkip::AlreadyGhost)
        );
        assert_eq!(
            skip(&mut state, 7, &mut rng),
            GhostOutcome::Skipped(GhostSkip::UnknownPlayer)
        );
    }

    #[test]
    fn converted_players_need_the_option() {
        let mut options = crew_ghost_options();
        let (players, mut registry) = fixture(&[(1, CustomRole::Crewmate)]);
        registry.add_sub_role(PlayerId(1), CustomRole::Madmate).unwrap();

        let mut state = GhostState::from_options(&options);
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        assert_eq!(
            state.assign(PlayerId(1), &options, &players, &registry, &mut rng),
            GhostOutcome::NoneGranted(NoGrantReason::NoAlignment)
        );

        options.converted_can_become_ghost = true;
        let mut state = GhostState::from_options(&options);
        assert!(
            state
                .assign(PlayerId(1), &options, &players, &registry, &mut rng)
                .granted()
                .is_some()
        );
    }

    #[test]
    fn clear_resets_everything() {
        let options = crew_ghost_options();
        let (players, registry) = fixture(&[(1, CustomRole::Crewmate)]);
        let mut state = GhostState::from_options(&options);
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let _ = state.assign(PlayerId(1), &options, &players, &registry, &mut rng);
        state.clear();
        assert!(state.is_empty());
    }
}
