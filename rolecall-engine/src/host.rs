//! Outbound calls into the host game.
//!
//! The engine never touches host state directly. Everything it wants the
//! host to do goes through `HostApi`, which the embedding layer implements
//! on top of its own RPCs.
use serde::{Deserialize, Serialize};

use crate::player::PlayerId;
use crate::roles::CustomRole;
use crate::ship::SystemType;

pub trait HostApi {
    /// Broadcast a new primary role for `player`.
    fn set_role(&mut self, player: PlayerId, role: CustomRole);

    /// Kill `victim` on behalf of `killer` (the same id for suicides).
    fn murder_player(&mut self, killer: PlayerId, victim: PlayerId);

    /// Push a system update, e.g. opening a door by id.
    fn update_system(&mut self, system: SystemType, amount: u8);

    /// Resend game settings to every client.
    fn mark_everyone_dirty_settings(&mut self);

    /// Finish the repair of `system` on the host's next tick.
    fn schedule_repair_completion(&mut self, system: SystemType);

    /// Diagnostic chat line shown to the local player.
    fn send_in_game(&mut self, message: &str);
}

/// Every call the engine made into the host, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostCommand {
    SetRole { player: PlayerId, role: CustomRole },
    MurderPlayer { killer: PlayerId, victim: PlayerId },
    UpdateSystem { system: SystemType, amount: u8 },
    MarkDirtySettings,
    ScheduleRepair { system: SystemType },
    SendInGame { message: String },
}

/// `HostApi` that only records what it was asked to do.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    commands: Vec<HostCommand>,
}

impl RecordingHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn commands(&self) -> &[HostCommand] {
        &self.commands
    }

    /// Drain recorded commands.
    pub fn take(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.commands)
    }

    #[must_use]
    pub fn murders(&self) -> Vec<(PlayerId, PlayerId)> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                HostCommand::MurderPlayer { killer, victim } => Some((*killer, *victim)),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn roles_set(&self) -> Vec<(PlayerId, CustomRole)> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                HostCommand::SetRole { player, role } => Some((*player, *role)),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn count(&self, wanted: &HostCommand) -> usize {
        self.commands.iter().filter(|cmd| *cmd == wanted).count()
    }
}

impl HostApi for RecordingHost {
    fn set_role(&mut self, player: PlayerId, role: CustomRole) {
        self.commands.push(HostCommand::SetRole { player, role });
    }

    fn murder_player(&mut self, killer: PlayerId, victim: PlayerId) {
        self.commands
            .push(HostCommand::MurderPlayer { killer, victim });
    }

    fn update_system(&mut self, system: SystemType, amount: u8) {
        self.commands
            .push(HostCommand::UpdateSystem { system, amount });
    }

    fn mark_everyone_dirty_settings(&mut self) {
        self.commands.push(HostCommand::MarkDirtySettings);
    }

    fn schedule_repair_completion(&mut self, system: SystemType) {
        self.commands.push(HostCommand::ScheduleRepair { system });
    }

    fn send_in_game(&mut self, message: &str) {
        self.commands.push(HostCommand::SendInGame {
            message: message.to_string(),
        });
    }
}
