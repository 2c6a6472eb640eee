//! Simulation events, queued during a tick and drained by the owner

use serde::{Deserialize, Serialize};

use super::geometry::Rect;
use super::player::AttackKind;
use super::PlayerId;

/// What happened during simulation, in the order it happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    /// Health changed (damage, death or respawn); carries the clamped value
    HealthChanged { player_id: PlayerId, health: i32 },

    /// A melee attack began
    AttackStarted {
        player_id: PlayerId,
        kind: AttackKind,
        hitbox: Rect,
    },

    /// Melee or projectile hit landed
    Hit {
        attacker_id: PlayerId,
        target_id: PlayerId,
        damage: i32,
    },

    /// A forged weapon entered play
    WeaponSpawned {
        owner_id: PlayerId,
        name: String,
        equipped: bool,
    },

    PlayerDied { player_id: PlayerId },

    PlayerRespawned { player_id: PlayerId },

    RoundStarted { round: u32 },

    RoundEnded { round: u32, scorers: Vec<PlayerId> },
}

/// FIFO of pending events
#[derive(Debug, Default, Clone)]
pub struct EventQueue {
    events: Vec<GameEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Move every pending event into `out`, preserving order
    pub fn drain_into(&mut self, out: &mut Vec<GameEvent>) {
        out.append(&mut self.events);
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
