//! The event dispatcher: the only caller of role hooks.
//!
//! Every host event that can be refused runs as a named pipeline:
//! `GlobalPolicy → RoleOverride → Action → Notification`. Each stage is a
//! separate method returning [`StageResult`], so a refusal carries the stage
//! that produced it and a [`SuppressReason`].
//!
//! Hooks never call back into the dispatcher. Role changes and deaths they
//! cause are queued on the [`World`] and settled once the hook returns.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::behaviors::{BehaviorTable, BoxedBehavior};
use crate::constants::{FIXED_DELTA_TIME, LOG_PHASE_START, LOW_LOAD_INTERVAL};
use crate::ghost::GhostOutcome;
use crate::host::HostApi;
use crate::options::GameOptions;
use crate::player::{DeathReason, PlayerId, PlayerTable};
use crate::registry::AssignError;
use crate::roles::CustomRole;
use crate::round::RoundContext;
use crate::ship::ShipState;
use crate::world::{HookCtx, PendingDeath, World};

mod actions;
mod meeting;
mod murder;
mod presentation;
mod systems;

pub use meeting::{GuessOutcome, VoteTally};
pub use murder::MurderReport;
pub use presentation::{AbilityButtons, Decorations};

/// Upper bound on settle passes; hooks that keep queueing effects are cut off.
const MAX_SETTLE_PASSES: usize = 32;

/// Which side of the session this dispatcher runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    #[default]
    Host,
    /// Clients only log and let every action through.
    Client,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Online,
    /// Local or LAN play; diagnostic chat echoes are allowed.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    GlobalPolicy,
    RoleOverride,
    Action,
    Notification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SuppressReason {
    UnknownPlayer(PlayerId),
    NotAlive(PlayerId),
    MeetingInProgress,
    NoMeeting,
    SabotageDisabled,
    FoolBlocked,
    LightsPanelDisabled,
    UnluckySuicide,
    CloseDoorDisabled,
    TaskWinDisabled,
    NoGameEnd,
    NoTasks,
    NotEligible,
    /// A role hook refused or vetoed the action.
    RoleRefused(CustomRole),
    BootedFromVent(CustomRole),
}

/// Stage and reason that stopped an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suppression {
    pub stage: Stage,
    pub reason: SuppressReason,
}

impl Suppression {
    #[must_use]
    pub const fn new(stage: Stage, reason: SuppressReason) -> Self {
        Self { stage, reason }
    }
}

impl fmt::Display for Suppression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} at {:?}", self.reason, self.stage)
    }
}

pub type StageResult = Result<(), Suppression>;

/// Whether the host should carry on with the original action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Proceed,
    Suppressed(Suppression),
}

impl DispatchOutcome {
    #[must_use]
    pub const fn proceeds(&self) -> bool {
        matches!(self, Self::Proceed)
    }

    #[must_use]
    pub const fn suppression(&self) -> Option<Suppression> {
        match self {
            Self::Proceed => None,
            Self::Suppressed(s) => Some(*s),
        }
    }
}

impl From<StageResult> for DispatchOutcome {
    fn from(result: StageResult) -> Self {
        match result {
            Ok(()) => Self::Proceed,
            Err(suppression) => Self::Suppressed(suppression),
        }
    }
}

/// A death the dispatcher finished processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathRecord {
    pub victim: PlayerId,
    pub killer: PlayerId,
    pub reason: DeathReason,
    pub ghost: GhostOutcome,
}

pub struct EventDispatcher<H: HostApi> {
    behaviors: BehaviorTable,
    world: World,
    host: H,
    authority: Authority,
    session: SessionMode,
    deaths: Vec<DeathRecord>,
}

impl<H: HostApi> EventDispatcher<H> {
    /// Host-side dispatcher with the standard behavior table.
    #[must_use]
    pub fn new(options: GameOptions, players: PlayerTable, seed: u64, host: H) -> Self {
        Self {
            behaviors: BehaviorTable::standard(),
            world: World::new(options, players, seed),
            host,
            authority: Authority::Host,
            session: SessionMode::Online,
            deaths: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_behaviors(mut self, behaviors: BehaviorTable) -> Self {
        self.behaviors = behaviors;
        self
    }

    #[must_use]
    pub fn with_authority(mut self, authority: Authority) -> Self {
        self.authority = authority;
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: SessionMode) -> Self {
        self.session = session;
        self
    }

    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    #[must_use]
    pub const fn behaviors(&self) -> &BehaviorTable {
        &self.behaviors
    }

    pub fn behaviors_mut(&mut self) -> &mut BehaviorTable {
        &mut self.behaviors
    }

    #[must_use]
    pub const fn authority(&self) -> Authority {
        self.authority
    }

    #[must_use]
    pub const fn session(&self) -> SessionMode {
        self.session
    }

    #[must_use]
    pub const fn is_host(&self) -> bool {
        matches!(self.authority, Authority::Host)
    }

    /// Deal a primary role before the round starts.
    ///
    /// # Errors
    ///
    /// Returns [`AssignError::NotPrimary`] for add-ons and `NotAssigned`.
    pub fn assign_primary(
        &mut self,
        player: PlayerId,
        role: CustomRole,
    ) -> Result<Option<CustomRole>, AssignError> {
        self.world.registry.set_primary(player, role)
    }

    /// Deal an add-on before the round starts.
    ///
    /// # Errors
    ///
    /// Returns [`AssignError::NotAddOn`] for anything that is not an add-on.
    pub fn add_sub_role(&mut self, player: PlayerId, role: CustomRole) -> Result<bool, AssignError> {
        self.world.registry.add_sub_role(player, role)
    }

    /// Change a primary role mid-round, running `remove`/`add` and informing the host.
    ///
    /// # Errors
    ///
    /// Returns [`AssignError::NotPrimary`] if `role` cannot be a primary role.
    pub fn change_role(&mut self, player: PlayerId, role: CustomRole) -> Result<(), AssignError> {
        self.apply_role_change(player, role)?;
        self.settle();
        Ok(())
    }

    /// Deaths processed since the last call, oldest first.
    pub fn take_deaths(&mut self) -> Vec<DeathRecord> {
        std::mem::take(&mut self.deaths)
    }

    /// Start a round: fresh round state, `init` on every enabled or held
    /// role, then `add` for every assignment.
    pub fn round_start(&mut self) {
        log::info!(target: "Phase", "{LOG_PHASE_START}");
        let world = &mut self.world;
        world.round = RoundContext::new(&world.options);
        world.ship = ShipState::new();
        world.round.alive_at_start = world.players.alive_count();
        world.round.initial_total_tasks = world.players.total_tasks();
        log::info!(
            target: "CountAlivePlayers",
            "{} alive, {} tasks",
            world.round.alive_at_start,
            world.round.initial_total_tasks
        );
        self.deaths.clear();

        let held = self.world.registry.active_roles();
        for (role, behavior) in self.behaviors.iter_mut() {
            if held.contains(&role) || behavior.is_enabled(&self.world.options) {
                behavior.init();
            }
        }
        for (player, role) in self.holders() {
            self.invoke(role, |b, ctx| b.add(ctx, player));
        }
        self.settle();
    }

    /// One host fixed update: cooldown resync timer and role ticks.
    pub fn fixed_update(&mut self) {
        if !self.is_host() {
            return;
        }
        self.tick_refix_cooldown();
        self.world.round.tick += 1;
        let low_load = self.world.round.tick % LOW_LOAD_INTERVAL == 0;
        for (player, role) in self.holders() {
            if !self.world.is_alive(player) {
                continue;
            }
            self.invoke(role, |b, ctx| {
                b.on_fixed_update(ctx, player);
                if low_load {
                    b.on_fixed_update_low_load(ctx, player);
                }
            });
        }
        self.settle();
    }

    /// Resend everyone's settings once `delay` seconds of fixed updates pass.
    pub fn schedule_cooldown_refix(&mut self, delay: f32) {
        self.world.round.schedule_refix(delay);
    }

    fn tick_refix_cooldown(&mut self) {
        let round = &mut self.world.round;
        match round.refix_cooldown_delay {
            Some(delay) if round.is_fixed_cooldown && delay >= 0.0 => {
                round.refix_cooldown_delay = Some(delay - FIXED_DELTA_TIME);
            }
            Some(_) => {
                round.refix_cooldown_delay = None;
                self.host.mark_everyone_dirty_settings();
                log::info!(target: "CoolDown", "refix cooldown elapsed");
            }
            None => {}
        }
    }

    // Hook plumbing ----------------------------------------------------------

    /// Every `(holder, role)` pair, primary first, in player order.
    fn holders(&self) -> Vec<(PlayerId, CustomRole)> {
        self.world
            .registry
            .iter()
            .flat_map(|(player, roles)| roles.all().into_iter().map(move |role| (player, role)))
            .collect()
    }

    fn behaviors_of(&self, player: PlayerId) -> Vec<&BoxedBehavior> {
        self.world
            .registry
            .roles_of(player)
            .into_iter()
            .filter_map(|role| self.behaviors.get(role))
            .collect()
    }

    fn primary_behavior(&self, player: PlayerId) -> Option<&BoxedBehavior> {
        self.behaviors.get(self.world.primary(player))
    }

    /// Run `f` against one role's behavior; `None` if the role has none.
    fn invoke<R>(
        &mut self,
        role: CustomRole,
        f: impl FnOnce(&mut BoxedBehavior, &mut HookCtx<'_>) -> R,
    ) -> Option<R> {
        let behavior = self.behaviors.get_mut(role)?;
        let mut ctx = HookCtx::new(&mut self.world, &mut self.host);
        Some(f(behavior, &mut ctx))
    }

    fn for_each_role_of(
        &mut self,
        player: PlayerId,
        mut f: impl FnMut(&mut BoxedBehavior, &mut HookCtx<'_>),
    ) {
        for role in self.world.registry.roles_of(player) {
            self.invoke(role, &mut f);
        }
        self.settle();
    }

    /// First of `player`'s roles whose hook returns `false`.
    fn first_refusal(
        &mut self,
        player: PlayerId,
        mut f: impl FnMut(&mut BoxedBehavior, &mut HookCtx<'_>) -> bool,
    ) -> Option<CustomRole> {
        let mut refused = None;
        for role in self.world.registry.roles_of(player) {
            if self.invoke(role, &mut f) == Some(false) {
                refused = Some(role);
                break;
            }
        }
        self.settle();
        refused
    }

    /// Run `f` once per role currently held by anyone.
    fn for_each_active_role(&mut self, mut f: impl FnMut(&mut BoxedBehavior, &mut HookCtx<'_>)) {
        for role in self.world.registry.active_roles() {
            self.invoke(role, &mut f);
        }
        self.settle();
    }

    /// Apply role changes and deaths queued by hooks.
    fn settle(&mut self) {
        for _ in 0..MAX_SETTLE_PASSES {
            let pending = self.world.take_pending();
            if pending.is_empty() {
                return;
            }
            for (player, role) in pending.role_changes {
                if let Err(err) = self.apply_role_change(player, role) {
                    log::warn!(target: "Dispatcher", "role change for {player} rejected: {err}");
                }
            }
            for death in pending.deaths {
                self.handle_death(death);
            }
        }
        log::warn!(target: "Dispatcher", "effects still pending after {MAX_SETTLE_PASSES} passes");
    }

    fn apply_role_change(&mut self, player: PlayerId, role: CustomRole) -> Result<(), AssignError> {
        let previous = self.world.registry.set_primary(player, role)?;
        if previous == Some(role) {
            return Ok(());
        }
        if let Some(previous) = previous {
            self.invoke(previous, |b, ctx| b.remove(ctx, player));
        }
        log::info!(target: "RoleChange", "{player}: {previous:?} -> {role}");
        self.host.set_role(player, role);
        self.invoke(role, |b, ctx| b.add(ctx, player));
        Ok(())
    }

    /// Death follow-up: the victim's death tasks, then ghost assignment.
    fn handle_death(&mut self, death: PendingDeath) {
        let victim = death.victim;
        for role in self.world.registry.roles_of(victim) {
            self.invoke(role, |b, ctx| b.after_player_death_task(ctx, victim));
        }
        let ghost = self.world.roll_ghost_role(victim);
        if let Some(role) = ghost.granted()
            && let Err(err) = self.apply_role_change(victim, role)
        {
            log::warn!(target: "GhostRoleAssign", "{victim} could not become {role}: {err}");
        }
        self.deaths.push(DeathRecord {
            victim,
            killer: death.killer,
            reason: death.reason,
            ghost,
        });
    }

    fn recheck_camouflage(&mut self) {
        let world = &mut self.world;
        if world.round.camouflage.recheck(&world.options, &world.ship) {
            log::info!(target: "Camouflage", "camouflage active: {}", world.round.camouflage.active);
            self.host.mark_everyone_dirty_settings();
        }
    }

    // Shared global checks ---------------------------------------------------

    fn require_present(&self, player: PlayerId) -> StageResult {
        if self.world.players.contains(player) {
            Ok(())
        } else {
            Err(Suppression::new(
                Stage::GlobalPolicy,
                SuppressReason::UnknownPlayer(player),
            ))
        }
    }

    fn require_alive(&self, player: PlayerId) -> StageResult {
        self.require_present(player)?;
        if self.world.is_alive(player) {
            Ok(())
        } else {
            Err(Suppression::new(
                Stage::GlobalPolicy,
                SuppressReason::NotAlive(player),
            ))
        }
    }
}

impl<H: HostApi + fmt::Debug> fmt::Debug for EventDispatcher<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("behaviors", &self.behaviors)
            .field("world", &self.world)
            .field("host", &self.host)
            .field("authority", &self.authority)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostCommand, RecordingHost};
    use crate::options::RoleSettings;
    use crate::player::PlayerInfo;

    fn players(n: u8) -> PlayerTable {
        (0..n)
            .map(|i| PlayerInfo::new(PlayerId(i), format!("p{i}")).with_tasks(3))
            .collect()
    }

    fn dispatcher(options: GameOptions) -> EventDispatcher<RecordingHost> {
        EventDispatcher::new(options, players(4), 11, RecordingHost::new())
    }

    #[test]
    fn round_start_counts_players_and_tasks() {
        let mut d = dispatcher(GameOptions::default());
        d.round_start();
        assert_eq!(d.world().round.alive_at_start, 4);
        assert_eq!(d.world().round.initial_total_tasks, 12);
    }

    #[test]
    fn refix_timer_marks_settings_dirty_once() {
        let mut d = dispatcher(GameOptions::default());
        d.round_start();
        d.schedule_cooldown_refix(0.1);
        for _ in 0..10 {
            d.fixed_update();
        }
        assert_eq!(d.host().count(&HostCommand::MarkDirtySettings), 1);
        assert!(d.world().round.refix_cooldown_delay.is_none());
    }

    #[test]
    fn clients_skip_fixed_update() {
        let mut d = dispatcher(GameOptions::default()).with_authority(Authority::Client);
        d.round_start();
        d.fixed_update();
        assert_eq!(d.world().round.tick, 0);
    }

    #[test]
    fn role_change_runs_remove_and_add() {
        let options = GameOptions::default()
            .with_role(CustomRole::Sheriff, RoleSettings::with_mode(100, 1));
        let mut d = dispatcher(options);
        d.assign_primary(PlayerId(0), CustomRole::Crewmate).unwrap();
        d.round_start();
        d.change_role(PlayerId(0), CustomRole::Sheriff).unwrap();
        assert_eq!(d.world().primary(PlayerId(0)), CustomRole::Sheriff);
        assert_eq!(
            d.host().roles_set(),
            vec![(PlayerId(0), CustomRole::Sheriff)]
        );
        // Sheriff::add sets the kill cooldown.
        assert!(d.world().round.kill_cooldown(PlayerId(0)).is_some());
    }

    #[test]
    fn changing_to_the_same_role_is_a_no_op() {
        let mut d = dispatcher(GameOptions::default());
        d.assign_primary(PlayerId(1), CustomRole::Impostor).unwrap();
        d.round_start();
        d.change_role(PlayerId(1), CustomRole::Impostor).unwrap();
        assert!(d.host().roles_set().is_empty());
    }

    #[test]
    fn add_on_cannot_become_primary() {
        let mut d = dispatcher(GameOptions::default());
        assert_eq!(
            d.change_role(PlayerId(0), CustomRole::Fool),
            Err(AssignError::NotPrimary(CustomRole::Fool))
        );
    }
}
