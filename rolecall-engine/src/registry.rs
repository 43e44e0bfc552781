//! Player → role assignments.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::player::PlayerId;
use crate::roles::{CustomRole, RoleTeam};

/// Add-ons stored inline without additional allocations.
pub type SubRoleSet = SmallVec<[CustomRole; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AssignError {
    #[error("{0} cannot hold the primary slot")]
    NotPrimary(CustomRole),
    #[error("{0} is not an add-on")]
    NotAddOn(CustomRole),
}

/// Roles attached to one player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRoles {
    pub primary: Option<CustomRole>,
    #[serde(default)]
    pub sub_roles: SubRoleSet,
}

impl PlayerRoles {
    /// Primary role first, then add-ons in grant order.
    #[must_use]
    pub fn all(&self) -> SubRoleSet {
        let mut roles = SubRoleSet::new();
        roles.extend(self.primary);
        roles.extend(self.sub_roles.iter().copied());
        roles
    }

    #[must_use]
    pub fn has(&self, role: CustomRole) -> bool {
        self.primary == Some(role) || self.sub_roles.contains(&role)
    }

    #[must_use]
    pub fn any_sub_role(&self, pred: impl Fn(CustomRole) -> bool) -> bool {
        self.sub_roles.iter().any(|role| pred(*role))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRegistry {
    entries: BTreeMap<PlayerId, PlayerRoles>,
}

impl RoleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the primary role, returning the one it displaced.
    ///
    /// # Errors
    ///
    /// Returns [`AssignError::NotPrimary`] for add-ons and `NotAssigned`.
    pub fn set_primary(
        &mut self,
        player: PlayerId,
        role: CustomRole,
    ) -> Result<Option<CustomRole>, AssignError> {
        if !role.is_primary_capable() {
            return Err(AssignError::NotPrimary(role));
        }
        let entry = self.entries.entry(player).or_default();
        Ok(entry.primary.replace(role))
    }

    /// Attach an add-on; returns `false` if the player already carried it.
    ///
    /// # Errors
    ///
    /// Returns [`AssignError::NotAddOn`] for anything that is not an add-on,
    /// which includes every ghost role.
    pub fn add_sub_role(&mut self, player: PlayerId, role: CustomRole) -> Result<bool, AssignError> {
        if !role.is_add_on() {
            return Err(AssignError::NotAddOn(role));
        }
        let entry = self.entries.entry(player).or_default();
        if entry.sub_roles.contains(&role) {
            return Ok(false);
        }
        entry.sub_roles.push(role);
        Ok(true)
    }

    pub fn remove_sub_role(&mut self, player: PlayerId, role: CustomRole) -> bool {
        let Some(entry) = self.entries.get_mut(&player) else {
            return false;
        };
        let before = entry.sub_roles.len();
        entry.sub_roles.retain(|r| *r != role);
        before != entry.sub_roles.len()
    }

    /// Drop every role held by `player`.
    pub fn revoke(&mut self, player: PlayerId) -> Option<PlayerRoles> {
        self.entries.remove(&player)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn get(&self, player: PlayerId) -> Option<&PlayerRoles> {
        self.entries.get(&player)
    }

    /// Primary role, `NotAssigned` when the player has none.
    #[must_use]
    pub fn primary(&self, player: PlayerId) -> CustomRole {
        self.get(player)
            .and_then(|roles| roles.primary)
            .unwrap_or(CustomRole::NotAssigned)
    }

    #[must_use]
    pub fn roles_of(&self, player: PlayerId) -> SubRoleSet {
        self.get(player).map(PlayerRoles::all).unwrap_or_default()
    }

    #[must_use]
    pub fn has_role(&self, player: PlayerId, role: CustomRole) -> bool {
        self.get(player).is_some_and(|roles| roles.has(role))
    }

    #[must_use]
    pub fn team_of(&self, player: PlayerId) -> Option<RoleTeam> {
        self.get(player)
            .and_then(|roles| roles.primary)
            .map(CustomRole::team)
    }

    /// Players holding `role` in any slot, in id order.
    #[must_use]
    pub fn players_with(&self, role: CustomRole) -> Vec<PlayerId> {
        self.entries
            .iter()
            .filter(|(_, roles)| roles.has(role))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Distinct roles currently held by anyone.
    #[must_use]
    pub fn active_roles(&self) -> Vec<CustomRole> {
        let mut roles: Vec<CustomRole> = self.entries.values().flat_map(PlayerRoles::all).collect();
        roles.sort();
        roles.dedup();
        roles
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &PlayerRoles)> {
        self.entries.iter().map(|(id, roles)| (*id, roles))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
