//! Arena simulation modules

pub mod combat;
pub mod events;
pub mod geometry;
pub mod r#match;
pub mod physics;
pub mod player;
pub mod round;
pub mod session;
pub mod snapshot;
pub mod weapon;

pub use combat::{CombatConfig, CombatSystem, MeleeHitPolicy};
pub use events::GameEvent;
pub use geometry::{Playfield, Rect, SharedPlatforms, Vec2};
pub use physics::PhysicsConfig;
pub use player::{AttackKind, Intent, Player};
pub use r#match::{MatchController, MatchSettings};
pub use round::{RoundOutcome, RoundRule};
pub use session::{GameSession, SessionHandle, SessionInput, SessionMsg, SessionSettings};
pub use snapshot::PlayerSnapshot;
pub use weapon::{ForgedWeapon, Weapon, WeaponDescriptor, WeaponMode, WeaponStats};

/// Roster identifier; also the join order in a relay room
pub type PlayerId = i32;
