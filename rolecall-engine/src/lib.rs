//! Rolecall Engine
//!
//! Role assignment and role-behavior dispatch for a crew-versus-impostors
//! social-deduction game. The host game owns networking, rendering and the
//! authoritative player list; this crate decides what each role does when
//! the host reports an event, and tells the host what to do through
//! [`HostApi`].

pub mod behavior;
pub mod behaviors;
pub mod constants;
pub mod dispatch;
pub mod ghost;
pub mod host;
pub mod options;
pub mod player;
pub mod registry;
pub mod rng;
pub mod roles;
pub mod round;
pub mod ship;
pub mod world;

// Re-export commonly used types
pub use behavior::{PlayerGameOptions, RepairVerdict, RoleBehavior, SpriteId, VentId, VoterState};
pub use behaviors::{BehaviorTable, BoxedBehavior, PassiveBehavior, build_behavior};
pub use dispatch::{
    AbilityButtons, Authority, DeathRecord, Decorations, DispatchOutcome, EventDispatcher,
    GuessOutcome, MurderReport, SessionMode, Stage, StageResult, SuppressReason, Suppression,
    VoteTally,
};
pub use ghost::{GhostOutcome, GhostPhase, GhostSkip, GhostState, NoGrantReason};
pub use host::{HostApi, HostCommand, RecordingHost};
pub use options::{GameOptions, OptionsError, RoleSettings};
pub use player::{DeathReason, PlayerId, PlayerInfo, PlayerTable, Vec2};
pub use registry::{AssignError, PlayerRoles, RoleRegistry};
pub use rng::RngBundle;
pub use roles::{CustomRole, RoleKind, RoleTeam};
pub use round::{Camouflage, DeclaredWinner, RoundContext};
pub use ship::{ShipState, SwitchSystem, SystemType};
pub use world::{HookCtx, World};
