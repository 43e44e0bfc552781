//! Read-only presentation queries composed across a player's roles.
use serde::{Deserialize, Serialize};

use super::EventDispatcher;
use crate::behavior::SpriteId;
use crate::constants::KILL_BUTTON_TEXT;
use crate::host::HostApi;
use crate::player::PlayerId;
use crate::ship::SystemType;

/// Name decorations `seer` sees on `seen`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decorations {
    pub name: String,
    pub mark: String,
    pub lower_text: String,
    pub suffix: String,
    pub progress: String,
    /// Whether `seer` may see `seen`'s role.
    pub role_known: bool,
    /// Colour override for `seen`'s name, empty for none.
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbilityButtons {
    pub kill: bool,
    pub vent: bool,
    pub sabotage: bool,
    pub ability_text: &'static str,
    pub kill_sprite: Option<SpriteId>,
    pub ability_sprite: Option<SpriteId>,
    pub vent_sprite: Option<SpriteId>,
    pub report_sprite: Option<SpriteId>,
}

impl<H: HostApi> EventDispatcher<H> {
    /// Compose every decoration hook of `seer`'s roles (and, for visibility,
    /// `seen`'s roles) into one set of strings.
    #[must_use]
    pub fn decorations(&self, seer: PlayerId, seen: PlayerId, for_meeting: bool) -> Decorations {
        let world = &self.world;
        let seer_roles = self.behaviors_of(seer);
        let seen_roles = self.behaviors_of(seen);
        // Camouflage hides everything but your own name.
        if world.round.camouflage.active && seer != seen && !for_meeting {
            return Decorations::default();
        }
        let comms = world.ship.is_sabotaged(SystemType::Comms);

        let mut out = Decorations {
            role_known: seer == seen
                || seer_roles.iter().any(|b| b.know_role_target(world, seer, seen))
                || seen_roles
                    .iter()
                    .any(|b| b.others_know_target_role_color(world, seer, seen)),
            ..Decorations::default()
        };
        for b in &seer_roles {
            out.name.push_str(&b.notify_player_name(world, seer, seen, for_meeting));
            out.mark.push_str(&b.get_mark(world, seer, Some(seen), for_meeting));
            out.lower_text
                .push_str(&b.get_lower_text(world, seer, Some(seen), for_meeting, false));
            out.suffix.push_str(&b.get_suffix(world, seer, Some(seen), for_meeting));
            if out.color.is_empty() {
                out.color = b.player_know_target_color(world, seer, seen);
            }
        }
        if seer == seen {
            for b in &seen_roles {
                out.progress.push_str(&b.get_progress_text(world, seen, comms));
            }
        }
        out
    }

    /// HUD buttons for `player`, decided by their primary role.
    #[must_use]
    pub fn ability_buttons(&self, player: PlayerId) -> AbilityButtons {
        let world = &self.world;
        let shapeshifting = false;
        match self.primary_behavior(player) {
            Some(b) => AbilityButtons {
                kill: b.can_use_kill_button(world, player),
                vent: b.can_use_impostor_vent_button(world, player),
                sabotage: b.can_use_sabotage(world, player),
                ability_text: b.ability_button_text(world, player),
                kill_sprite: b.kill_button_sprite(world, player, shapeshifting),
                ability_sprite: b.ability_button_sprite(world, player, shapeshifting),
                vent_sprite: b.vent_button_sprite(),
                report_sprite: b.report_button_sprite(),
            },
            None => AbilityButtons {
                kill: false,
                vent: false,
                sabotage: false,
                ability_text: KILL_BUTTON_TEXT,
                kill_sprite: None,
                ability_sprite: None,
                vent_sprite: None,
                report_sprite: None,
            },
        }
    }
}
