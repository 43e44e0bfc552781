//! The closed set of roles a player can hold.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Team a role plays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleTeam {
    Crewmate,
    Impostor,
    Neutral,
}

/// How a role attaches to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Stock host roles every custom role is built on.
    Vanilla,
    /// Custom primary roles dealt at round start.
    Primary,
    /// Modifiers stacked on top of a primary role.
    AddOn,
    /// Roles granted only after death.
    Ghost,
    /// Non-playing roles such as the game master.
    Meta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CustomRole {
    // Vanilla bases
    Crewmate,
    Engineer,
    Scientist,
    GuardianAngel,
    Impostor,
    Shapeshifter,
    // Crewmate roles
    SabotageMaster,
    Alchemist,
    Mayor,
    Sheriff,
    Medic,
    NiceGuesser,
    Retributionist,
    // Impostor roles
    Camouflager,
    Nemesis,
    // Neutral roles
    Jester,
    // Ghost roles
    Hawk,
    Warden,
    Minion,
    Bloodmoon,
    // Add-ons
    Fool,
    Unlucky,
    Gravestone,
    Madmate,
    Charmed,
    // Meta
    GM,
    NotAssigned,
}

impl CustomRole {
    /// Every assignable role. `NotAssigned` is excluded.
    pub const ALL: [Self; 26] = [
        Self::Crewmate,
        Self::Engineer,
        Self::Scientist,
        Self::GuardianAngel,
        Self::Impostor,
        Self::Shapeshifter,
        Self::SabotageMaster,
        Self::Alchemist,
        Self::Mayor,
        Self::Sheriff,
        Self::Medic,
        Self::NiceGuesser,
        Self::Retributionist,
        Self::Camouflager,
        Self::Nemesis,
        Self::Jester,
        Self::Hawk,
        Self::Warden,
        Self::Minion,
        Self::Bloodmoon,
        Self::Fool,
        Self::Unlucky,
        Self::Gravestone,
        Self::Madmate,
        Self::Charmed,
        Self::GM,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Crewmate => "Crewmate",
            Self::Engineer => "Engineer",
            Self::Scientist => "Scientist",
            Self::GuardianAngel => "GuardianAngel",
            Self::Impostor => "Impostor",
            Self::Shapeshifter => "Shapeshifter",
            Self::SabotageMaster => "SabotageMaster",
            Self::Alchemist => "Alchemist",
            Self::Mayor => "Mayor",
            Self::Sheriff => "Sheriff",
            Self::Medic => "Medic",
            Self::NiceGuesser => "NiceGuesser",
            Self::Retributionist => "Retributionist",
            Self::Camouflager => "Camouflager",
            Self::Nemesis => "Nemesis",
            Self::Jester => "Jester",
            Self::Hawk => "Hawk",
            Self::Warden => "Warden",
            Self::Minion => "Minion",
            Self::Bloodmoon => "Bloodmoon",
            Self::Fool => "Fool",
            Self::Unlucky => "Unlucky",
            Self::Gravestone => "Gravestone",
            Self::Madmate => "Madmate",
            Self::Charmed => "Charmed",
            Self::GM => "GM",
            Self::NotAssigned => "NotAssigned",
        }
    }

    #[must_use]
    pub const fn team(self) -> RoleTeam {
        match self {
            Self::Impostor
            | Self::Shapeshifter
            | Self::Camouflager
            | Self::Nemesis
            | Self::Minion
            | Self::Bloodmoon
            | Self::Madmate => RoleTeam::Impostor,
            Self::Jester | Self::Charmed | Self::GM | Self::NotAssigned => RoleTeam::Neutral,
            _ => RoleTeam::Crewmate,
        }
    }

    #[must_use]
    pub const fn kind(self) -> RoleKind {
        match self {
            Self::Crewmate
            | Self::Engineer
            | Self::Scientist
            | Self::GuardianAngel
            | Self::Impostor
            | Self::Shapeshifter => RoleKind::Vanilla,
            Self::Hawk | Self::Warden | Self::Minion | Self::Bloodmoon => RoleKind::Ghost,
            Self::Fool | Self::Unlucky | Self::Gravestone | Self::Madmate | Self::Charmed => {
                RoleKind::AddOn
            }
            Self::GM | Self::NotAssigned => RoleKind::Meta,
            _ => RoleKind::Primary,
        }
    }

    /// Stock host role this custom role is presented as.
    #[must_use]
    pub const fn default_base(self) -> Self {
        match self {
            Self::Engineer | Self::Alchemist => Self::Engineer,
            Self::Scientist => Self::Scientist,
            Self::GuardianAngel | Self::Hawk | Self::Warden | Self::Minion | Self::Bloodmoon => {
                Self::GuardianAngel
            }
            Self::Shapeshifter | Self::Camouflager => Self::Shapeshifter,
            Self::Impostor | Self::Nemesis | Self::Sheriff | Self::Medic => Self::Impostor,
            _ => Self::Crewmate,
        }
    }

    #[must_use]
    pub const fn is_ghost_role(self) -> bool {
        matches!(self.kind(), RoleKind::Ghost)
    }

    #[must_use]
    pub const fn is_add_on(self) -> bool {
        matches!(self.kind(), RoleKind::AddOn)
    }

    /// Add-ons that flip a player's allegiance.
    #[must_use]
    pub const fn is_converted(self) -> bool {
        matches!(self, Self::Madmate | Self::Charmed)
    }

    #[must_use]
    pub const fn is_crewmate(self) -> bool {
        matches!(self.team(), RoleTeam::Crewmate)
    }

    #[must_use]
    pub const fn is_impostor(self) -> bool {
        matches!(self.team(), RoleTeam::Impostor)
    }

    #[must_use]
    pub const fn is_neutral(self) -> bool {
        matches!(self.team(), RoleTeam::Neutral)
    }

    /// Roles that can hold the primary slot.
    #[must_use]
    pub const fn is_primary_capable(self) -> bool {
        matches!(
            self.kind(),
            RoleKind::Vanilla | RoleKind::Primary | RoleKind::Ghost | RoleKind::Meta
        ) && !matches!(self, Self::NotAssigned)
    }

    /// Roles whose holders never receive a ghost role.
    #[must_use]
    pub const fn is_ghost_excluded(self) -> bool {
        matches!(self, Self::GM | Self::Nemesis | Self::Retributionist)
    }

    /// Ghost roles configured for the given team.
    pub fn ghost_roles_for(team: RoleTeam) -> impl Iterator<Item = Self> {
        Self::ALL
            .into_iter()
            .filter(move |role| role.is_ghost_role() && role.team() == team)
    }
}

impl fmt::Display for CustomRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_excludes_not_assigned_and_has_no_duplicates() {
        assert!(!CustomRole::ALL.contains(&CustomRole::NotAssigned));
        let mut sorted = CustomRole::ALL.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), CustomRole::ALL.len());
    }

    #[test]
    fn ghost_roles_split_by_team() {
        let crew: Vec<_> = CustomRole::ghost_roles_for(RoleTeam::Crewmate).collect();
        let imp: Vec<_> = CustomRole::ghost_roles_for(RoleTeam::Impostor).collect();
        assert_eq!(crew, vec![CustomRole::Hawk, CustomRole::Warden]);
        assert_eq!(imp, vec![CustomRole::Minion, CustomRole::Bloodmoon]);
    }

    #[test]
    fn add_ons_cannot_hold_primary_slot() {
        for role in CustomRole::ALL {
            assert_ne!(role.is_add_on(), role.is_primary_capable(), "{role}");
        }
        assert!(!CustomRole::NotAssigned.is_primary_capable());
    }

    #[test]
    fn ghost_roles_present_as_guardian_angels() {
        assert_eq!(CustomRole::Hawk.default_base(), CustomRole::GuardianAngel);
        assert_eq!(CustomRole::Sheriff.default_base(), CustomRole::Impostor);
        assert_eq!(CustomRole::Mayor.default_base(), CustomRole::Crewmate);
    }
}
