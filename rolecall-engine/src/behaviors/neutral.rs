//! Roles that win on their own.
use crate::behavior::RoleBehavior;
use crate::player::PlayerId;
use crate::roles::CustomRole;
use crate::round::DeclaredWinner;
use crate::world::{HookCtx, World};

/// Wins alone by getting voted out.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jester;

impl RoleBehavior for Jester {
    fn role(&self) -> CustomRole {
        CustomRole::Jester
    }

    fn init(&mut self) {}

    fn add(&mut self, _ctx: &mut HookCtx<'_>, _player: PlayerId) {}

    fn can_use_impostor_vent_button(&self, _world: &World, _player: PlayerId) -> bool {
        false
    }

    fn check_exile_target(&mut self, ctx: &mut HookCtx<'_>, player: PlayerId, decided_winner: bool) {
        if decided_winner {
            return;
        }
        log::info!(target: "Jester", "{player} was exiled and wins");
        ctx.world.round.declared_winner = Some(DeclaredWinner {
            role: CustomRole::Jester,
            player,
        });
    }

    fn get_mark(&self, world: &World, seer: PlayerId, seen: Option<PlayerId>, for_meeting: bool) -> String {
        // Jesters see a reminder on themselves during meetings.
        if for_meeting && seen.is_none_or(|seen| seen == seer) && world.has_role(seer, CustomRole::Jester) {
            "☺".to_string()
        } else {
            String::new()
        }
    }
}
