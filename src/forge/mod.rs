//! Weapon forging: prompt-to-descriptor generators and the async forge worker

pub mod armory;
pub mod keywords;
pub mod service;

pub use armory::Armory;
pub use keywords::KeywordSmith;
pub use service::{ForgeError, ForgeService};

use crate::game::WeaponDescriptor;

/// Turns a player's prompt into a weapon descriptor.
///
/// Implementations may block (a remote generator is an HTTP round trip);
/// `ForgeService` always calls them off the simulation thread.
pub trait WeaponSmith: Send + Sync {
    fn forge(&self, prompt: &str) -> WeaponDescriptor;
}
