//! The capability set every role implements.
//!
//! Every hook has a neutral default so a role only overrides what it cares
//! about. Only the dispatcher calls these hooks; it invokes them once per
//! player holding the role, passing that player's id as the acting party.
//! Mutating hooks receive a [`HookCtx`]; predicates only see the [`World`].
//!
//! Hooks run synchronously inside a host callback and must not block. A hook
//! that wants to change somebody's role queues the change through
//! [`World::request_role_change`] instead of re-entering the dispatcher.
use serde::{Deserialize, Serialize};

use crate::constants::KILL_BUTTON_TEXT;
use crate::options::GameOptions;
use crate::player::PlayerId;
use crate::roles::CustomRole;
use crate::ship::SystemType;
use crate::world::{HookCtx, World};

/// Vent identifier as used by the host map.
pub type VentId = u32;

/// Sprite identifier resolved by the presentation layer.
pub type SpriteId = &'static str;

/// Verdict of a role's pre-repair hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairVerdict {
    /// Let the host apply the update.
    Proceed,
    /// Suppress the host update.
    Veto,
}

/// One vote as shown on the meeting screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterState {
    pub voter: PlayerId,
    /// `None` is a skip.
    pub target: Option<PlayerId>,
}

/// Per-player game options the host sends with a settings sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerGameOptions {
    pub kill_cooldown: f32,
    pub vision_multiplier: f32,
    pub engineer_vent_cooldown: Option<f32>,
    pub guardian_protect_cooldown: Option<f32>,
}

pub trait RoleBehavior {
    /// Role this behavior implements.
    fn role(&self) -> CustomRole;

    /// Stock host role the custom role is presented as.
    fn base_role(&self) -> CustomRole {
        self.role().default_base()
    }

    fn is_enabled(&self, options: &GameOptions) -> bool {
        options.is_role_enabled(self.role())
    }

    // Lifecycle ----------------------------------------------------------

    /// Reset per-round state. Called once at round start, before any `add`.
    fn init(&mut self);

    /// The role was granted to `player`.
    fn add(&mut self, ctx: &mut HookCtx<'_>, player: PlayerId);

    /// The role was revoked from `player`.
    fn remove(&mut self, _ctx: &mut HookCtx<'_>, _player: PlayerId) {}

    // Eligibility -------------------------------------------------------

    fn can_use_kill_button(&self, world: &World, player: PlayerId) -> bool {
        world.is_impostor_aligned(player) && world.is_alive(player)
    }

    fn can_use_impostor_vent_button(&self, world: &World, player: PlayerId) -> bool {
        world.is_impostor_aligned(player) && world.is_alive(player)
    }

    fn can_use_sabotage(&self, world: &World, player: PlayerId) -> bool {
        world.is_impostor_aligned(player)
    }

    /// The player pressed the sabotage button; `false` cancels the sabotage.
    fn on_sabotage(&mut self, _ctx: &mut HookCtx<'_>, _player: PlayerId, _system: SystemType) -> bool {
        true
    }

    // Options -------------------------------------------------------------

    fn apply_game_options(&self, _world: &World, _opts: &mut PlayerGameOptions, _player: PlayerId) {}

    fn set_kill_cooldown(&self, world: &mut World, player: PlayerId) {
        let cooldown = world.options.kill_cooldown_for(self.role());
        world.round.kill_cooldowns.insert(player, cooldown);
    }

    // Ticks ---------------------------------------------------------------

    /// Time-critical checks, every fixed update.
    fn on_fixed_update(&mut self, _ctx: &mut HookCtx<'_>, _player: PlayerId) {}

    /// Deferred checks, every `LOW_LOAD_INTERVAL` fixed updates.
    fn on_fixed_update_low_load(&mut self, _ctx: &mut HookCtx<'_>, _player: PlayerId) {}

    // Tasks and protection ----------------------------------------------

    fn on_task_complete(&mut self, _ctx: &mut HookCtx<'_>, _player: PlayerId, _completed: u32, _total: u32) {}

    fn on_check_protect(&mut self, _ctx: &mut HookCtx<'_>, _angel: PlayerId, _target: PlayerId) {}

    // Vents ---------------------------------------------------------------

    fn on_enter_vent(&mut self, _ctx: &mut HookCtx<'_>, _player: PlayerId, _vent: VentId) {}

    /// `true` kicks the player back out of the vent.
    fn check_boot_from_vent(&self, _world: &World, _player: PlayerId, _vent: VentId) -> bool {
        false
    }

    fn on_co_enter_vent(&mut self, _ctx: &mut HookCtx<'_>, _player: PlayerId, _vent: VentId) {}

    fn on_exit_vent(&mut self, _ctx: &mut HookCtx<'_>, _player: PlayerId, _vent: VentId) {}

    // Systems -------------------------------------------------------------

    /// Runs before the host applies a system update by `player`.
    fn update_system(
        &mut self,
        _ctx: &mut HookCtx<'_>,
        _system: SystemType,
        _amount: u8,
        _player: PlayerId,
    ) -> RepairVerdict {
        RepairVerdict::Proceed
    }

    /// Runs after a lights switch flip by `player` while the lights are still out.
    fn switch_system_update(&mut self, _ctx: &mut HookCtx<'_>, _amount: u8, _player: PlayerId) {}

    // Murder --------------------------------------------------------------
    //
    // Both parties are known to exist by the time these run; the dispatcher
    // rejects attempts with a missing killer or target beforehand.

    fn forced_check_murder_as_killer(&mut self, _ctx: &mut HookCtx<'_>, _killer: PlayerId, _target: PlayerId) -> bool {
        true
    }

    fn on_check_murder_as_killer(&mut self, _ctx: &mut HookCtx<'_>, _killer: PlayerId, _target: PlayerId) -> bool {
        true
    }

    fn on_check_murder_as_target(&mut self, _ctx: &mut HookCtx<'_>, _killer: PlayerId, _target: PlayerId) -> bool {
        true
    }

    /// Called for every bystander; `holder` holds this role.
    fn check_murder_on_others_target(
        &mut self,
        _ctx: &mut HookCtx<'_>,
        _holder: PlayerId,
        _killer: PlayerId,
        _target: PlayerId,
    ) -> bool {
        true
    }

    fn on_murder(&mut self, _ctx: &mut HookCtx<'_>, _killer: PlayerId, _target: PlayerId) {}

    fn on_target_dead(&mut self, _ctx: &mut HookCtx<'_>, _killer: PlayerId, _target: PlayerId) {}

    /// Runs for the dead player's roles whenever they die, however they died.
    fn after_player_death_task(&mut self, _ctx: &mut HookCtx<'_>, _target: PlayerId) {}

    /// `true` shows the kill flash to `seer`, who holds this role.
    fn kill_flash_check(&self, _world: &World, _killer: PlayerId, _target: PlayerId, _seer: PlayerId) -> bool {
        false
    }

    fn on_shapeshift(
        &mut self,
        _ctx: &mut HookCtx<'_>,
        _shapeshifter: PlayerId,
        _target: PlayerId,
        _shapeshifting: bool,
        _hidden: bool,
    ) {
    }

    // Meetings ------------------------------------------------------------

    fn on_check_start_meeting(&self, world: &World, reporter: PlayerId) -> bool {
        world.is_alive(reporter)
    }

    fn on_check_report_dead_body(
        &self,
        world: &World,
        reporter: PlayerId,
        _body: PlayerId,
        _killer: Option<PlayerId>,
    ) -> bool {
        world.is_alive(reporter)
    }

    /// A meeting started; `target` is the reported body, `None` for the button.
    fn on_report_dead_body(&mut self, _ctx: &mut HookCtx<'_>, _reporter: PlayerId, _target: Option<PlayerId>) {}

    fn on_meeting_hud_start(&mut self, _ctx: &mut HookCtx<'_>, _player: PlayerId) {}

    fn meeting_hud_clear(&mut self) {}

    fn pva_name_text(&self, _world: &World, _holder: PlayerId, _target: PlayerId) -> String {
        String::new()
    }

    fn notify_after_meeting(&mut self, _ctx: &mut HookCtx<'_>) {}

    fn after_meeting_tasks(&mut self, _ctx: &mut HookCtx<'_>) {}

    fn on_co_end_game(&mut self, _ctx: &mut HookCtx<'_>) {}

    // Guessing ------------------------------------------------------------
    //
    // Both hooks return `true` to cancel the guess.

    fn guess_check(
        &mut self,
        _ctx: &mut HookCtx<'_>,
        _is_ui: bool,
        _guesser: PlayerId,
        target: Option<PlayerId>,
        _role: CustomRole,
    ) -> bool {
        target.is_none()
    }

    fn on_role_guess(
        &mut self,
        _ctx: &mut HookCtx<'_>,
        _is_ui: bool,
        target: Option<PlayerId>,
        _guesser: PlayerId,
        _role: CustomRole,
    ) -> bool {
        target.is_none()
    }

    // Voting and exile --------------------------------------------------

    fn on_vote(&mut self, _ctx: &mut HookCtx<'_>, _voter: PlayerId, _target: Option<PlayerId>) {}

    fn on_voted(&mut self, _ctx: &mut HookCtx<'_>, _voted: PlayerId, _voter: PlayerId) {}

    fn hide_vote(&self, _world: &World, _voter: PlayerId) -> bool {
        false
    }

    fn add_visual_votes(&self, _world: &World, _voter: VoterState, _states: &mut Vec<VoterState>) {}

    /// Extra weight added to `voter`'s vote.
    fn add_real_votes_num(&self, _world: &World, _voter: PlayerId) -> u32 {
        0
    }

    fn check_exile_target(&mut self, _ctx: &mut HookCtx<'_>, _player: PlayerId, _decided_winner: bool) {}

    /// `holder` holds this role; `exiled` is `None` when nobody was ejected.
    fn on_player_exiled(&mut self, _ctx: &mut HookCtx<'_>, _holder: PlayerId, _exiled: Option<PlayerId>) {}

    // Presentation --------------------------------------------------------

    fn ability_button_text(&self, _world: &World, _player: PlayerId) -> &'static str {
        KILL_BUTTON_TEXT
    }

    fn kill_button_sprite(&self, _world: &World, _player: PlayerId, _shapeshifting: bool) -> Option<SpriteId> {
        None
    }

    fn ability_button_sprite(&self, _world: &World, _player: PlayerId, _shapeshifting: bool) -> Option<SpriteId> {
        None
    }

    fn vent_button_sprite(&self) -> Option<SpriteId> {
        None
    }

    fn report_button_sprite(&self) -> Option<SpriteId> {
        None
    }

    fn notify_player_name(&self, _world: &World, _seer: PlayerId, _target: PlayerId, _for_meeting: bool) -> String {
        String::new()
    }

    fn get_mark(&self, _world: &World, _seer: PlayerId, _seen: Option<PlayerId>, _for_meeting: bool) -> String {
        String::new()
    }

    fn get_lower_text(
        &self,
        _world: &World,
        _seer: PlayerId,
        _seen: Option<PlayerId>,
        _for_meeting: bool,
        _for_hud: bool,
    ) -> String {
        String::new()
    }

    fn get_suffix(&self, _world: &World, _seer: PlayerId, _seen: Option<PlayerId>, _for_meeting: bool) -> String {
        String::new()
    }

    fn get_progress_text(&self, _world: &World, _player: PlayerId, _comms: bool) -> String {
        String::new()
    }

    fn know_role_target(&self, _world: &World, _seer: PlayerId, _target: PlayerId) -> bool {
        false
    }

    fn player_know_target_color(&self, _world: &World, _seer: PlayerId, _target: PlayerId) -> String {
        String::new()
    }

    fn others_know_target_role_color(&self, _world: &World, _seer: PlayerId, _target: PlayerId) -> bool {
        false
    }
}
