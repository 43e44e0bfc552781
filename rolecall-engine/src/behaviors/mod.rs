//! Concrete role behaviors and the table that maps roles to them.
use std::collections::BTreeMap;
use std::fmt;

use crate::behavior::RoleBehavior;
use crate::player::PlayerId;
use crate::roles::CustomRole;
use crate::world::HookCtx;

pub mod crewmate;
pub mod ghosts;
pub mod impostor;
pub mod neutral;

pub use crewmate::{Alchemist, Mayor, Medic, NiceGuesser, SabotageMaster, Sheriff};
pub use ghosts::Hawk;
pub use impostor::Camouflager;
pub use neutral::Jester;

pub type BoxedBehavior = Box<dyn RoleBehavior>;

/// Behavior for roles that only use the defaults: vanilla roles, passive
/// add-ons whose effects are global policy, and plain ghost roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassiveBehavior {
    role: CustomRole,
}

impl PassiveBehavior {
    #[must_use]
    pub const fn new(role: CustomRole) -> Self {
        Self { role }
    }
}

impl RoleBehavior for PassiveBehavior {
    fn role(&self) -> CustomRole {
        self.role
    }

    fn init(&mut self) {}

    fn add(&mut self, _ctx: &mut HookCtx<'_>, player: PlayerId) {
        log::debug!(target: "RoleBehavior", "{player} granted {}", self.role);
    }
}

/// Build the behavior for `role`, or `None` for the `NotAssigned` placeholder.
#[must_use]
pub fn build_behavior(role: CustomRole) -> Option<BoxedBehavior> {
    let behavior: BoxedBehavior = match role {
        CustomRole::NotAssigned => return None,
        CustomRole::SabotageMaster => Box::new(SabotageMaster::default()),
        CustomRole::Alchemist => Box::new(Alchemist::default()),
        CustomRole::Mayor => Box::new(Mayor),
        CustomRole::Sheriff => Box::new(Sheriff::default()),
        CustomRole::Medic => Box::new(Medic::default()),
        CustomRole::NiceGuesser => Box::new(NiceGuesser::default()),
        CustomRole::Camouflager => Box::new(Camouflager),
        CustomRole::Jester => Box::new(Jester),
        CustomRole::Hawk => Box::new(Hawk::default()),
        other => Box::new(PassiveBehavior::new(other)),
    };
    Some(behavior)
}

/// Role → behavior lookup, built once from the closed role set.
pub struct BehaviorTable {
    behaviors: BTreeMap<CustomRole, BoxedBehavior>,
}

impl BehaviorTable {
    /// One behavior per entry of [`CustomRole::ALL`].
    #[must_use]
    pub fn standard() -> Self {
        let behaviors = CustomRole::ALL
            .into_iter()
            .filter_map(|role| build_behavior(role).map(|b| (role, b)))
            .collect();
        Self { behaviors }
    }

    /// Empty table; every role resolves to "no behavior".
    #[must_use]
    pub fn empty() -> Self {
        Self {
            behaviors: BTreeMap::new(),
        }
    }

    /// Install `behavior` under its own role, returning what it replaced.
    pub fn insert(&mut self, behavior: BoxedBehavior) -> Option<BoxedBehavior> {
        self.behaviors.insert(behavior.role(), behavior)
    }

    #[must_use]
    pub fn with(mut self, behavior: BoxedBehavior) -> Self {
        self.insert(behavior);
        self
    }

    #[must_use]
    pub fn get(&self, role: CustomRole) -> Option<&BoxedBehavior> {
        self.behaviors.get(&role)
    }

    pub fn get_mut(&mut self, role: CustomRole) -> Option<&mut BoxedBehavior> {
        self.behaviors.get_mut(&role)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (CustomRole, &mut BoxedBehavior)> {
        self.behaviors.iter_mut().map(|(role, b)| (*role, b))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

impl Default for BehaviorTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for BehaviorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.behaviors.keys()).finish()
    }
}

/// Per-player ability charges; `None` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Charges {
    left: BTreeMap<PlayerId, Option<u32>>,
}

impl Charges {
    pub(crate) fn clear(&mut self) {
        self.left.clear();
    }

    pub(crate) fn grant(&mut self, player: PlayerId, limit: Option<u32>) {
        self.left.insert(player, limit);
    }

    /// Spend one charge; `false` when the player has none left or never had any.
    pub(crate) fn try_use(&mut self, player: PlayerId) -> bool {
        match self.left.get_mut(&player) {
            Some(None) => true,
            Some(Some(n)) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn has_any(&self, player: PlayerId) -> bool {
        matches!(self.left.get(&player), Some(None)) || self.remaining(player).is_some_and(|n| n > 0)
    }

    pub(crate) fn remaining(&self, player: PlayerId) -> Option<u32> {
        self.left.get(&player).copied().flatten()
    }
}
