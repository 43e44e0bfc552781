//! Impostor-aligned roles.
use crate::behavior::RoleBehavior;
use crate::player::PlayerId;
use crate::roles::CustomRole;
use crate::world::{HookCtx, World};

/// Shapeshifting forces camouflage on everyone until the shift ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct Camouflager;

impl Camouflager {
    fn release(ctx: &mut HookCtx<'_>, player: PlayerId) {
        if ctx.world.round.camouflage.forced_by == Some(player) {
            ctx.world.round.camouflage.forced_by = None;
            let world = &mut *ctx.world;
            if world.round.camouflage.recheck(&world.options, &world.ship) {
                ctx.host.mark_everyone_dirty_settings();
            }
        }
    }
}

impl RoleBehavior for Camouflager {
    fn role(&self) -> CustomRole {
        CustomRole::Camouflager
    }

    fn init(&mut self) {}

    fn add(&mut self, ctx: &mut HookCtx<'_>, player: PlayerId) {
        self.set_kill_cooldown(ctx.world, player);
    }

    fn remove(&mut self, ctx: &mut HookCtx<'_>, player: PlayerId) {
        Self::release(ctx, player);
    }

    fn on_shapeshift(
        &mut self,
        ctx: &mut HookCtx<'_>,
        shapeshifter: PlayerId,
        _target: PlayerId,
        shapeshifting: bool,
        _hidden: bool,
    ) {
        if !shapeshifting {
            Self::release(ctx, shapeshifter);
            return;
        }
        let world = &mut *ctx.world;
        world.round.camouflage.forced_by = Some(shapeshifter);
        if world.round.camouflage.recheck(&world.options, &world.ship) {
            log::info!(target: "Camouflager", "{shapeshifter} camouflages everyone");
            ctx.host.mark_everyone_dirty_settings();
        }
    }

    fn after_player_death_task(&mut self, ctx: &mut HookCtx<'_>, target: PlayerId) {
        Self::release(ctx, target);
    }

    fn ability_button_text(&self, _world: &World, _player: PlayerId) -> &'static str {
        "CamouflagerShapeshiftText"
    }
}
