//! Ghost roles handed out to the dead.
use super::Charges;
use crate::behavior::RoleBehavior;
use crate::player::{DeathReason, PlayerId};
use crate::roles::CustomRole;
use crate::world::{HookCtx, World};

/// Crew ghost whose protect button kills impostors instead.
#[derive(Debug, Clone, Default)]
pub struct Hawk {
    slashes: Charges,
}

impl RoleBehavior for Hawk {
    fn role(&self) -> CustomRole {
        CustomRole::Hawk
    }

    fn init(&mut self) {
        self.slashes.clear();
    }

    fn add(&mut self, ctx: &mut HookCtx<'_>, player: PlayerId) {
        let uses = ctx.world.options.ability_uses(self.role());
        self.slashes.grant(player, uses);
    }

    fn on_check_protect(&mut self, ctx: &mut HookCtx<'_>, angel: PlayerId, target: PlayerId) {
        if !ctx.world.is_alive(target) || !ctx.world.is_impostor_aligned(target) {
            return;
        }
        if !self.slashes.try_use(angel) {
            return;
        }
        log::info!(target: "Hawk", "{angel} slashes {target}");
        ctx.force_kill(angel, target, DeathReason::Kill);
    }

    fn ability_button_text(&self, _world: &World, _player: PlayerId) -> &'static str {
        "HawkKillButtonText"
    }

    fn get_progress_text(&self, _world: &World, player: PlayerId, _comms: bool) -> String {
        self.slashes
            .remaining(player)
            .map(|left| format!("({left})"))
            .unwrap_or_default()
    }
}
