//! Per-player state snapshots exchanged with the network collaborator

use serde::{Deserialize, Serialize};

use crate::util::time::{SIMULATION_TPS, SNAPSHOT_TPS};

use super::events::GameEvent;
use super::player::{ActiveAttack, AttackKind, Player};
use super::PlayerId;

/// Wire shape of one player's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub health: i32,
    pub alive: bool,
    pub facing_right: bool,
    pub attack_state: Option<AttackKind>,
}

impl PlayerSnapshot {
    pub fn capture(player: &Player) -> Self {
        Self {
            player_id: player.player_id,
            x: player.rect.x,
            y: player.rect.y,
            vx: player.vx,
            vy: player.vy,
            health: player.health,
            alive: player.alive,
            facing_right: player.facing_right,
            attack_state: player.attack_kind(),
        }
    }

    /// Last-writer-wins overwrite of the replicated fields. Nothing is merged.
    pub fn apply_to(&self, player: &mut Player) {
        let health = self.health.clamp(0, player.max_health());
        let health_changed = health != player.health;
        let was_alive = player.alive;

        player.remote = true;
        player.rect.x = self.x;
        player.rect.y = self.y;
        player.vx = self.vx;
        player.vy = self.vy;
        player.health = health;
        player.alive = self.alive && health > 0;
        player.facing_right = self.facing_right;

        match self.attack_state {
            Some(kind) if player.attack_kind() != Some(kind) => {
                let hitbox = player.hitbox_for(kind);
                player.attack = Some(ActiveAttack {
                    kind,
                    hitbox,
                    remaining: player.combat.attack_duration,
                    struck: Vec::new(),
                });
            }
            Some(kind) => {
                let hitbox = player.hitbox_for(kind);
                if let Some(attack) = player.attack.as_mut() {
                    attack.hitbox = hitbox;
                }
            }
            None => player.attack = None,
        }

        if health_changed {
            player.notify(GameEvent::HealthChanged {
                player_id: player.player_id,
                health,
            });
        }
        if was_alive && !player.alive {
            player.respawn_timer = player.combat.respawn_time;
            player.notify(GameEvent::PlayerDied {
                player_id: player.player_id,
            });
        }
    }
}

/// Decides which simulation ticks publish a snapshot
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    pub fn build(&self, players: &[Player]) -> Vec<PlayerSnapshot> {
        players.iter().map(PlayerSnapshot::capture).collect()
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new(SIMULATION_TPS / SNAPSHOT_TPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{CombatConfig, MatchController, MatchSettings, PhysicsConfig};

    fn player(id: PlayerId) -> Player {
        Player::new(id, 100.0, 100.0, [0, 0, 255], PhysicsConfig::default(), CombatConfig::default())
    }

    fn remote_state() -> PlayerSnapshot {
        PlayerSnapshot {
            player_id: 1,
            x: 640.0,
            y: 300.0,
            vx: -120.0,
            vy: 60.0,
            health: 55,
            alive: true,
            facing_right: false,
            attack_state: Some(AttackKind::Thrust),
        }
    }

    #[test]
    fn cadence_halves_the_tick_rate() {
        let mut builder = SnapshotBuilder::default();
        let sent = (0..60).filter(|_| builder.should_send()).count();
        assert_eq!(sent, SNAPSHOT_TPS as usize);
    }

    #[test]
    fn force_next_sends_immediately() {
        let mut builder = SnapshotBuilder::new(10);
        builder.should_send();
        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn remote_state_overwrites_fields() {
        let mut p = player(1);
        remote_state().apply_to(&mut p);

        assert_eq!((p.rect.x, p.rect.y), (640.0, 300.0));
        assert_eq!((p.vx, p.vy), (-120.0, 60.0));
        assert_eq!(p.health, 55);
        assert!(!p.facing_right);
        let hitbox = p.attack_hitbox().unwrap();
        assert_eq!(hitbox.right(), p.rect.left());
        assert_eq!(PlayerSnapshot::capture(&p), remote_state());

        let mut events = Vec::new();
        p.drain_events_into(&mut events);
        assert_eq!(
            events,
            vec![GameEvent::HealthChanged {
                player_id: 1,
                health: 55
            }]
        );
    }

    #[test]
    fn remote_death_is_reported() {
        let mut p = player(1);
        let dead = PlayerSnapshot {
            health: 0,
            alive: false,
            attack_state: None,
            ..remote_state()
        };
        dead.apply_to(&mut p);
        assert!(!p.alive);
        assert!(p.attack.is_none());

        let mut events = Vec::new();
        p.drain_events_into(&mut events);
        assert!(events.contains(&GameEvent::PlayerDied { player_id: 1 }));
        assert!(p.remote);
        assert!(!p.respawn_ready());
    }

    #[test]
    fn remote_death_survives_local_ticks() {
        let mut m = MatchController::new(MatchSettings::default());
        for id in 0..2 {
            let p = m.create_player(id, [0, 0, 255]);
            m.add_player(p);
        }
        m.start_round();

        let dead = PlayerSnapshot {
            health: 0,
            alive: false,
            attack_state: None,
            ..remote_state()
        };
        assert!(m.apply_remote_state(&dead));

        let ticks = (m.settings().combat.respawn_time * 60.0) as usize + 30;
        for _ in 0..ticks {
            m.update(1.0 / 60.0, &[]);
            let p = m.player(1).unwrap();
            assert!(!p.alive);
            assert_eq!(p.health, 0);
        }
        assert!(!m
            .drain_events()
            .contains(&GameEvent::PlayerRespawned { player_id: 1 }));

        let back = PlayerSnapshot {
            health: 100,
            alive: true,
            ..dead
        };
        m.apply_remote_state(&back);
        assert!(m.player(1).unwrap().alive);
    }

    #[test]
    fn snapshot_json_shape() {
        let json = serde_json::to_value(remote_state()).unwrap();
        assert_eq!(json["attack_state"], "thrust");
        assert_eq!(json["facing_right"], false);
    }
}
