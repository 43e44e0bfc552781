//! Scripted rounds driven through the engine's dispatcher.
//!
//! A round deals roles from the lobby options, then alternates between
//! free-roam steps (ticks, tasks, sabotage, kills, ghost actions) and
//! meetings until a side wins or the step budget runs out. Every dispatch
//! outcome is tallied and the engine's invariants are checked after each
//! step.
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rolecall_engine::constants::{ELECTRICAL_SWITCH_MAX, LOW_LOAD_INTERVAL};
use rolecall_engine::{
    CustomRole, DeathRecord, DispatchOutcome, EventDispatcher, GameOptions, GuessOutcome,
    PlayerId, PlayerInfo, PlayerTable, RecordingHost, RoleKind, RoleTeam, SystemType, VoterState,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const TASKS_PER_PLAYER: u32 = 4;
const SABOTAGE_TARGETS: [SystemType; 4] = [
    SystemType::Reactor,
    SystemType::Comms,
    SystemType::LifeSupp,
    SystemType::Electrical,
];

/// Lobby shape for one scripted round.
#[derive(Debug, Clone, PartialEq)]
pub struct SimPlan {
    pub players: u8,
    pub impostors: u8,
    pub max_steps: usize,
    pub options: GameOptions,
}

impl SimPlan {
    #[must_use]
    pub fn new(options: GameOptions) -> Self {
        Self {
            players: 10,
            impostors: 2,
            max_steps: 40,
            options,
        }
    }

    #[must_use]
    pub const fn with_lobby(mut self, players: u8, impostors: u8) -> Self {
        self.players = players;
        self.impostors = impostors;
        self
    }
}

/// Everything observed while playing one round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundSummary {
    pub seed: u64,
    pub lineup: BTreeMap<PlayerId, Vec<CustomRole>>,
    pub steps: usize,
    pub kills_attempted: usize,
    pub kills_landed: usize,
    pub sabotages_attempted: usize,
    pub sabotages_applied: usize,
    pub meetings: usize,
    pub guesses: usize,
    pub deaths: Vec<DeathRecord>,
    pub ghost_grants: BTreeMap<CustomRole, u32>,
    /// Suppression counts keyed by `action/reason at stage`.
    pub suppressed: BTreeMap<String, usize>,
    pub winner: Option<String>,
    pub violations: Vec<String>,
}

impl RoundSummary {
    fn record(&mut self, action: &str, outcome: DispatchOutcome) {
        if let Some(suppression) = outcome.suppression() {
            *self
                .suppressed
                .entry(format!("{action}/{suppression}"))
                .or_default() += 1;
        }
    }

    fn absorb(&mut self, deaths: Vec<DeathRecord>) {
        for death in &deaths {
            if let Some(role) = death.ghost.granted() {
                *self.ghost_grants.entry(role).or_default() += 1;
            }
        }
        self.deaths.extend(deaths);
    }

    /// Number of suppressions whose key contains `needle`.
    #[must_use]
    pub fn suppressed_matching(&self, needle: &str) -> usize {
        self.suppressed
            .iter()
            .filter(|(key, _)| key.contains(needle))
            .map(|(_, count)| count)
            .sum()
    }
}

/// Primary role per seat plus the add-ons dealt on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lineup {
    pub primaries: Vec<CustomRole>,
    pub add_ons: Vec<(PlayerId, CustomRole)>,
}

/// Deal roles the way a lobby would: each configured role rolls its mode
/// once per copy, winners fill their team's seats, leftovers get the
/// vanilla role.
pub fn deal_roles<R: Rng + ?Sized>(
    options: &GameOptions,
    players: u8,
    impostors: u8,
    rng: &mut R,
) -> Lineup {
    let impostors = impostors.min(players);
    let roll = |role: CustomRole, rng: &mut R| -> Vec<CustomRole> {
        let mode = options.mode_of(role);
        (0..options.count_of(role))
            .filter(|_| mode > 0 && rng.gen_range(1..=100u8) <= mode)
            .map(|_| role)
            .collect()
    };

    let mut imp_pool = Vec::new();
    let mut crew_pool = Vec::new();
    for role in CustomRole::ALL {
        if role.kind() != RoleKind::Primary {
            continue;
        }
        let won = roll(role, rng);
        match role.team() {
            RoleTeam::Impostor => imp_pool.extend(won),
            RoleTeam::Crewmate | RoleTeam::Neutral => crew_pool.extend(won),
        }
    }
    imp_pool.shuffle(rng);
    crew_pool.shuffle(rng);

    let mut primaries: Vec<CustomRole> = (0..impostors)
        .map(|i| imp_pool.get(usize::from(i)).copied().unwrap_or(CustomRole::Impostor))
        .chain(
            (0..players - impostors)
                .map(|i| crew_pool.get(usize::from(i)).copied().unwrap_or(CustomRole::Crewmate)),
        )
        .collect();
    primaries.shuffle(rng);

    let mut add_ons = Vec::new();
    let seats: Vec<PlayerId> = (0..players).map(PlayerId).collect();
    for role in CustomRole::ALL.into_iter().filter(|r| r.is_add_on()) {
        let won = roll(role, rng).len();
        let picks: Vec<PlayerId> = seats.choose_multiple(rng, won).copied().collect();
        add_ons.extend(picks.into_iter().map(|player| (player, role)));
    }
    Lineup { primaries, add_ons }
}

/// Play one round of `plan` with `seed`.
pub fn run_round(plan: &SimPlan, seed: u64) -> RoundSummary {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let lineup = deal_roles(&plan.options, plan.players, plan.impostors, &mut rng);

    let players: PlayerTable = (0..plan.players)
        .map(|i| PlayerInfo::new(PlayerId(i), format!("Player {i}")).with_tasks(TASKS_PER_PLAYER))
        .collect();
    let mut d = EventDispatcher::new(plan.options.clone(), players, seed, RecordingHost::new());
    let mut summary = RoundSummary {
        seed,
        ..RoundSummary::default()
    };
    for (seat, role) in lineup.primaries.iter().enumerate() {
        let player = PlayerId(seat as u8);
        if let Err(err) = d.assign_primary(player, *role) {
            summary.violations.push(format!("dealing {role} to {player}: {err}"));
        }
    }
    for (player, role) in &lineup.add_ons {
        if let Err(err) = d.add_sub_role(*player, *role) {
            summary.violations.push(format!("dealing {role} to {player}: {err}"));
        }
    }
    d.round_start();
    summary.lineup = d
        .world()
        .registry
        .iter()
        .map(|(player, roles)| (player, roles.all().into_vec()))
        .collect();

    for step in 0..plan.max_steps {
        summary.steps = step + 1;
        let body = free_roam(&mut d, &mut rng, &mut summary);
        if round_over(&d).is_none() && (body.is_some() || rng.gen_bool(0.15)) {
            hold_meeting(&mut d, &mut rng, &mut summary, body);
        }
        summary.violations.extend(check_invariants(&d, &summary));
        if let Some(winner) = round_over(&d) {
            summary.winner = Some(winner);
            break;
        }
    }
    if let Some(declared) = d.end_game() {
        summary.winner = Some(format!("{} ({})", declared.role, declared.player));
    }
    log::debug!(
        target: "Simulation",
        "seed {seed}: {} steps, {} deaths, winner {:?}",
        summary.steps,
        summary.deaths.len(),
        summary.winner
    );
    summary
}

/// One stretch of play outside meetings. Returns a fresh body, if any.
fn free_roam(
    d: &mut EventDispatcher<RecordingHost>,
    rng: &mut ChaCha20Rng,
    summary: &mut RoundSummary,
) -> Option<PlayerId> {
    for _ in 0..LOW_LOAD_INTERVAL {
        d.fixed_update();
    }

    for player in d.world().players.living_ids() {
        if rng.gen_bool(0.5) {
            let outcome = d.complete_task(player);
            summary.record("task", outcome);
        }
    }

    let living = d.world().players.living_ids();
    if rng.gen_bool(0.2) {
        let saboteurs: Vec<PlayerId> = living
            .iter()
            .copied()
            .filter(|p| d.ability_buttons(*p).sabotage)
            .collect();
        if let (Some(player), Some(system)) =
            (saboteurs.choose(rng), SABOTAGE_TARGETS.choose(rng))
        {
            summary.sabotages_attempted += 1;
            let outcome = d.sabotage(*player, *system);
            if outcome.proceeds() {
                summary.sabotages_applied += 1;
            }
            summary.record("sabotage", outcome);
        }
    }
    if let Some(fixer) = living.choose(rng) {
        repair_all(d, *fixer, summary);
    }

    for ghost in d.world().players.ids() {
        let is_ghost = !d.world().is_alive(ghost) && d.world().primary(ghost).is_ghost_role();
        if is_ghost && rng.gen_bool(0.3) {
            let living = d.world().players.living_ids();
            if let Some(target) = living.choose(rng) {
                let outcome = d.protect(ghost, *target);
                summary.record("protect", outcome);
                summary.absorb(d.take_deaths());
            }
        }
    }

    let living = d.world().players.living_ids();
    let killers: Vec<PlayerId> = living
        .iter()
        .copied()
        .filter(|p| d.ability_buttons(*p).kill)
        .collect();
    let killer = *killers.choose(rng)?;
    let targets: Vec<PlayerId> = living.into_iter().filter(|p| *p != killer).collect();
    let target = *targets.choose(rng)?;

    summary.kills_attempted += 1;
    let report = d.check_murder(killer, target);
    summary.record("murder", report.outcome);
    summary.absorb(report.deaths);
    if report.outcome.proceeds() {
        summary.kills_landed += 1;
        Some(target)
    } else {
        None
    }
}

/// `fixer` repairs every active sabotage.
fn repair_all(d: &mut EventDispatcher<RecordingHost>, fixer: PlayerId, summary: &mut RoundSummary) {
    for system in SABOTAGE_TARGETS {
        if !d.world().ship.is_sabotaged(system) {
            continue;
        }
        if system == SystemType::Electrical {
            let switches = d.world().ship.switches;
            let wrong = switches.expected_switches ^ switches.actual_switches;
            for bit in (0..=ELECTRICAL_SWITCH_MAX).filter(|bit| wrong & (1 << bit) != 0) {
                let outcome = d.system_update(SystemType::Electrical, fixer, bit);
                summary.record("repair", outcome);
                if !d.world().ship.is_sabotaged(SystemType::Electrical) {
                    break;
                }
            }
        } else {
            let outcome = d.system_update(system, fixer, 0);
            summary.record("repair", outcome);
        }
        summary.absorb(d.take_deaths());
    }
}

fn hold_meeting(
    d: &mut EventDispatcher<RecordingHost>,
    rng: &mut ChaCha20Rng,
    summary: &mut RoundSummary,
    body: Option<PlayerId>,
) {
    let living = d.world().players.living_ids();
    let Some(reporter) = living.choose(rng).copied() else {
        return;
    };
    let outcome = d.start_meeting(reporter, body);
    summary.record("meeting", outcome);
    if !outcome.proceeds() {
        return;
    }
    summary.meetings += 1;

    let guessers: Vec<PlayerId> = living
        .iter()
        .copied()
        .filter(|p| d.world().has_role(*p, CustomRole::NiceGuesser))
        .collect();
    if let Some(guesser) = guessers.choose(rng).copied()
        && rng.gen_bool(0.3)
    {
        let target = living.iter().copied().filter(|p| *p != guesser).collect::<Vec<_>>();
        let target = target.choose(rng).copied();
        let role = *[CustomRole::Impostor, CustomRole::Camouflager, CustomRole::Jester]
            .choose(rng)
            .unwrap_or(&CustomRole::Impostor);
        summary.guesses += 1;
        match d.guess(guesser, target, role, false) {
            GuessOutcome::Cancelled(s) => summary.record("guess", DispatchOutcome::Suppressed(s)),
            GuessOutcome::Correct { .. } | GuessOutcome::Misguess { .. } => {}
        }
        summary.absorb(d.take_deaths());
    }

    let voters = d.world().players.living_ids();
    let mut votes = Vec::with_capacity(voters.len());
    for voter in &voters {
        let target = if rng.gen_bool(0.3) {
            None
        } else {
            voters.iter().copied().filter(|p| p != voter).collect::<Vec<_>>().choose(rng).copied()
        };
        let outcome = d.cast_vote(*voter, target);
        summary.record("vote", outcome);
        if outcome.proceeds() {
            votes.push(VoterState { voter: *voter, target });
        }
    }
    let tally = d.tally_votes(&votes);
    let deaths = d.exile(tally.exiled);
    summary.absorb(deaths);
    d.end_meeting();
}

/// Winner label once the round is decided.
fn round_over(d: &EventDispatcher<RecordingHost>) -> Option<String> {
    let world = d.world();
    if let Some(declared) = world.round.declared_winner {
        return Some(format!("{} ({})", declared.role, declared.player));
    }
    let living = world.players.living_ids();
    let impostors = living.iter().filter(|p| world.is_impostor_aligned(**p)).count();
    if impostors == 0 {
        Some("Crewmate".to_string())
    } else if impostors * 2 >= living.len() {
        Some("Impostor".to_string())
    } else {
        None
    }
}

/// Engine invariants that must hold after every step.
fn check_invariants(d: &EventDispatcher<RecordingHost>, summary: &RoundSummary) -> Vec<String> {
    let world = d.world();
    let mut violations = Vec::new();

    for (player, roles) in world.registry.iter() {
        let primaries = roles
            .all()
            .into_iter()
            .filter(|role| role.is_primary_capable())
            .count();
        if primaries > 1 {
            violations.push(format!("{player} holds {primaries} primary roles"));
        }
        if world.is_alive(player) && roles.primary.is_some_and(CustomRole::is_ghost_role) {
            violations.push(format!("{player} is alive with a ghost role"));
        }
    }

    let ghost = &world.round.ghost;
    for (team, cap) in [
        (RoleTeam::Crewmate, world.options.max_crew_ghost),
        (RoleTeam::Impostor, world.options.max_imp_ghost),
    ] {
        if ghost.team_count(team) > cap {
            violations.push(format!(
                "{team:?} ghost count {} exceeds cap {cap}",
                ghost.team_count(team)
            ));
        }
    }

    let mut seen = BTreeSet::new();
    for death in &summary.deaths {
        if death.ghost.granted().is_some() && !seen.insert(death.victim) {
            violations.push(format!("{} was granted a ghost role twice", death.victim));
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolecall_engine::RoleSettings;

    #[test]
    fn dealing_fills_every_seat_with_one_primary() {
        let options = GameOptions::load_from_static();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let lineup = deal_roles(&options, 10, 2, &mut rng);
        assert_eq!(lineup.primaries.len(), 10);
        let impostors = lineup
            .primaries
            .iter()
            .filter(|r| r.team() == RoleTeam::Impostor)
            .count();
        assert_eq!(impostors, 2);
        assert!(lineup.primaries.iter().all(|r| r.is_primary_capable()));
        assert!(lineup.add_ons.iter().all(|(_, r)| r.is_add_on()));
    }

    #[test]
    fn certain_roles_are_always_dealt() {
        let options = GameOptions::default()
            .with_role(CustomRole::Sheriff, RoleSettings::with_mode(100, 1))
            .with_role(CustomRole::Camouflager, RoleSettings::with_mode(100, 1));
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let lineup = deal_roles(&options, 6, 1, &mut rng);
        assert!(lineup.primaries.contains(&CustomRole::Sheriff));
        assert!(lineup.primaries.contains(&CustomRole::Camouflager));
        assert!(!lineup.primaries.contains(&CustomRole::Impostor));
    }

    #[test]
    fn rounds_are_reproducible_per_seed() {
        let plan = SimPlan::new(GameOptions::load_from_static());
        let a = run_round(&plan, 42);
        let b = run_round(&plan, 42);
        assert_eq!(a.lineup, b.lineup);
        assert_eq!(a.deaths, b.deaths);
        assert_eq!(a.winner, b.winner);
        assert_eq!(a.suppressed, b.suppressed);
    }

    #[test]
    fn default_rounds_keep_the_invariants() {
        let plan = SimPlan::new(GameOptions::load_from_static());
        for seed in 0..20 {
            let summary = run_round(&plan, seed);
            assert!(summary.violations.is_empty(), "seed {seed}: {:?}", summary.violations);
            assert!(summary.steps > 0);
        }
    }

    #[test]
    fn disabled_sabotage_never_lands() {
        let options = GameOptions {
            disable_sabotage: true,
            ..GameOptions::load_from_static()
        };
        let plan = SimPlan::new(options);
        for seed in 0..10 {
            let summary = run_round(&plan, seed);
            assert_eq!(summary.sabotages_applied, 0);
            assert_eq!(
                summary.suppressed_matching("sabotage/SabotageDisabled"),
                summary.sabotages_attempted
            );
        }
    }
}
