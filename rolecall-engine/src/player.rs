//! Mirror of the host's player list.
//!
//! Players are owned by the host engine. The engine only keeps enough state
//! to answer eligibility questions (alive, connected, position) without
//! calling back into the host.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable per-game player identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position on the ship map in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f32, f32)> for Vec2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathReason {
    Kill,
    Suicide,
    Misfire,
    Vote,
    Guess,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    #[serde(default = "PlayerInfo::default_alive")]
    pub alive: bool,
    #[serde(default)]
    pub disconnected: bool,
    #[serde(default)]
    pub position: Vec2,
    #[serde(default)]
    pub tasks_completed: u32,
    #[serde(default)]
    pub tasks_total: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_reason: Option<DeathReason>,
}

impl PlayerInfo {
    const fn default_alive() -> bool {
        true
    }

    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            alive: true,
            disconnected: false,
            position: Vec2::default(),
            tasks_completed: 0,
            tasks_total: 0,
            death_reason: None,
        }
    }

    #[must_use]
    pub fn with_tasks(mut self, total: u32) -> Self {
        self.tasks_total = total;
        self
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive && !self.disconnected
    }

    pub fn kill(&mut self, reason: DeathReason) {
        self.alive = false;
        self.death_reason = Some(reason);
    }
}

/// Players keyed by id, iterated in id order so simulations stay deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerTable {
    players: BTreeMap<PlayerId, PlayerInfo>,
}

impl PlayerTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: PlayerInfo) -> Option<PlayerInfo> {
        self.players.insert(info.id, info)
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<PlayerInfo> {
        self.players.remove(&id)
    }

    #[must_use]
    pub fn get(&self, id: PlayerId) -> Option<&PlayerInfo> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut PlayerInfo> {
        self.players.get_mut(&id)
    }

    #[must_use]
    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    /// Absent players are never alive.
    #[must_use]
    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.get(id).is_some_and(PlayerInfo::is_alive)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerInfo> {
        self.players.values()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    #[must_use]
    pub fn living_ids(&self) -> Vec<PlayerId> {
        self.players
            .values()
            .filter(|p| p.is_alive())
            .map(|p| p.id)
            .collect()
    }

    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.players.values().filter(|p| p.is_alive()).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Sum of assigned tasks across every player.
    #[must_use]
    pub fn total_tasks(&self) -> u32 {
        self.players.values().map(|p| p.tasks_total).sum()
    }
}

impl FromIterator<PlayerInfo> for PlayerTable {
    fn from_iter<T: IntoIterator<Item = PlayerInfo>>(iter: T) -> Self {
        let mut table = Self::new();
        for info in iter {
            table.insert(info);
        }
        table
    }
}
