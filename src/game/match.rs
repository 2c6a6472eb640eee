//! Match state: roster, weapon bag, rounds and scoring

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::combat::{CombatConfig, CombatSystem, HitResult};
use super::events::{EventQueue, GameEvent};
use super::geometry::{Rect, Vec2};
use super::physics::PhysicsConfig;
use super::player::{Intent, Player};
use super::round::RoundRule;
use super::snapshot::PlayerSnapshot;
use super::weapon::{Armament, ForgedWeapon, Rgb, Weapon, WeaponMode};
use super::PlayerId;

/// Arena capacity
pub const MAX_PLAYERS: usize = 4;

pub fn default_spawn_points() -> Vec<Vec2> {
    vec![
        Vec2::new(200.0, 400.0),
        Vec2::new(900.0, 400.0),
        Vec2::new(300.0, 200.0),
        Vec2::new(800.0, 200.0),
    ]
}

/// Tuning shared by every player in a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSettings {
    pub physics: PhysicsConfig,
    pub combat: CombatConfig,
    pub weapon_mode: WeaponMode,
    pub round_rule: RoundRule,
    pub spawn_points: Vec<Vec2>,
    pub max_players: usize,
}

impl MatchSettings {
    /// Timed rounds bring the dead back; elimination rounds do not
    pub fn respawn_during_round(&self) -> bool {
        self.round_rule == RoundRule::Timed
    }
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            combat: CombatConfig::default(),
            weapon_mode: WeaponMode::default(),
            round_rule: RoundRule::default(),
            spawn_points: default_spawn_points(),
            max_players: MAX_PLAYERS,
        }
    }
}

/// Owns the roster and drives one tick of the arena
#[derive(Debug)]
pub struct MatchController {
    settings: MatchSettings,
    players: Vec<Player>,
    weapons: Vec<Weapon>,
    round_active: bool,
    round_number: u32,
    scores: HashMap<PlayerId, u32>,
    events: EventQueue,
}

impl MatchController {
    pub fn new(settings: MatchSettings) -> Self {
        Self {
            settings,
            players: Vec::new(),
            weapons: Vec::new(),
            round_active: false,
            round_number: 1,
            scores: HashMap::new(),
            events: EventQueue::new(),
        }
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// Build a player placed at the spawn point its roster slot will use
    pub fn create_player(&self, player_id: PlayerId, color: Rgb) -> Player {
        let spawn = self
            .settings
            .spawn_points
            .get(self.players.len())
            .copied()
            .unwrap_or_default();
        Player::new(
            player_id,
            spawn.x,
            spawn.y,
            color,
            self.settings.physics,
            self.settings.combat,
        )
    }

    pub fn add_player(&mut self, player: Player) {
        if self.players.len() >= self.settings.max_players {
            warn!(player_id = player.player_id, "Arena full, player not added");
            return;
        }
        if self.player(player.player_id).is_some() {
            warn!(player_id = player.player_id, "Player already in match");
            return;
        }

        self.scores.insert(player.player_id, 0);
        debug!(player_id = player.player_id, "Player added");
        self.players.push(player);
    }

    pub fn add_weapon(&mut self, weapon: Weapon) {
        self.weapons.push(weapon);
    }

    /// Turn a forged descriptor into a projectile or an equipped weapon,
    /// according to the weapon mode. Returns false if the owner is unknown.
    pub fn deliver_weapon(&mut self, forged: ForgedWeapon) -> bool {
        let mode = self.settings.weapon_mode;
        let gravity = self.settings.physics.gravity;
        let stats = forged.descriptor.resolve();

        let Some(owner) = self.players.iter_mut().find(|p| p.player_id == forged.owner_id) else {
            warn!(owner_id = forged.owner_id, "Forged weapon for unknown player");
            return false;
        };

        let name = stats.name.clone();
        let equipped = match Armament::forge(mode, stats, owner, gravity) {
            Armament::Projectile(weapon) => {
                self.weapons.push(weapon);
                false
            }
            Armament::EquippedMelee(stats) => {
                owner.equip(stats);
                true
            }
        };

        info!(owner_id = forged.owner_id, weapon = %name, equipped, "Weapon delivered");
        self.events.push(GameEvent::WeaponSpawned {
            owner_id: forged.owner_id,
            name,
            equipped,
        });
        true
    }

    /// Route an input intent to its player
    pub fn apply_intent(&mut self, player_id: PlayerId, intent: Intent) {
        if let Some(player) = self.player_mut(player_id) {
            player.apply_intent(intent);
        }
    }

    pub fn start_round(&mut self) {
        self.round_active = true;

        for (i, player) in self.players.iter_mut().enumerate() {
            if let Some(point) = self.settings.spawn_points.get(i) {
                player.respawn(Some(*point));
            }
        }
        self.weapons.clear();

        info!(round = self.round_number, players = self.players.len(), "Round started");
        self.events.push(GameEvent::RoundStarted {
            round: self.round_number,
        });
        self.collect_player_events();
    }

    /// Close the round. Every player still standing scores a point.
    pub fn end_round(&mut self) -> Vec<PlayerId> {
        self.round_active = false;
        let round = self.round_number;
        self.round_number += 1;

        let scorers: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.alive)
            .map(|p| p.player_id)
            .collect();
        for id in &scorers {
            *self.scores.entry(*id).or_insert(0) += 1;
        }

        info!(round, scorers = ?scorers, "Round ended");
        self.events.push(GameEvent::RoundEnded {
            round,
            scorers: scorers.clone(),
        });
        scorers
    }

    /// Advance the arena by `dt` seconds
    pub fn update(&mut self, dt: f32, platforms: &[Rect]) {
        if !self.round_active {
            return;
        }

        for player in self.players.iter_mut() {
            player.update(platforms, dt);
        }
        if self.settings.respawn_during_round() {
            self.respawn_ready_players();
        }
        self.collect_player_events();

        let melee = CombatSystem::resolve_melee(&mut self.players, self.settings.combat.hit_policy);
        self.record_hits(melee);

        let playfield = self.settings.physics.playfield;
        for weapon in self.weapons.iter_mut() {
            weapon.update(dt, &playfield);
        }
        let ranged = CombatSystem::resolve_weapons(&mut self.weapons, &mut self.players);
        self.record_hits(ranged);
        self.weapons.retain(|w| w.active);
    }

    /// Remote players come back through their own snapshots
    fn respawn_ready_players(&mut self) {
        for (i, player) in self.players.iter_mut().enumerate() {
            if player.respawn_ready() && !player.remote {
                let point = self.settings.spawn_points.get(i).copied();
                player.respawn(point);
                debug!(player_id = player.player_id, "Player respawned");
            }
        }
    }

    fn record_hits(&mut self, hits: Vec<HitResult>) {
        for hit in hits {
            if hit.target_killed {
                info!(
                    attacker_id = hit.attacker_id,
                    target_id = hit.target_id,
                    "Player killed"
                );
            }
            self.events.push(GameEvent::Hit {
                attacker_id: hit.attacker_id,
                target_id: hit.target_id,
                damage: hit.damage,
            });
        }
        self.collect_player_events();
    }

    fn collect_player_events(&mut self) {
        let mut pending = Vec::new();
        for player in self.players.iter_mut() {
            player.drain_events_into(&mut pending);
        }
        for event in pending {
            self.events.push(event);
        }
    }

    /// Everything that happened since the last drain, in order
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.collect_player_events();
        self.events.drain()
    }

    /// Overwrite a remote player's state with the latest received snapshot
    pub fn apply_remote_state(&mut self, snapshot: &PlayerSnapshot) -> bool {
        match self.player_mut(snapshot.player_id) {
            Some(player) => {
                snapshot.apply_to(player);
                true
            }
            None => false,
        }
    }

    /// Outbound state for the locally controlled player
    pub fn local_snapshot(&self, player_id: PlayerId) -> Option<PlayerSnapshot> {
        self.player(player_id).map(PlayerSnapshot::capture)
    }

    pub fn snapshots(&self) -> Vec<PlayerSnapshot> {
        self.players.iter().map(PlayerSnapshot::capture).collect()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    pub fn player_mut(&mut self, player_id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.player_id == player_id)
    }

    pub fn weapons(&self) -> &[Weapon] {
        &self.weapons
    }

    pub fn is_round_active(&self) -> bool {
        self.round_active
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn score(&self, player_id: PlayerId) -> u32 {
        self.scores.get(&player_id).copied().unwrap_or(0)
    }

    pub fn scores(&self) -> &HashMap<PlayerId, u32> {
        &self.scores
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }
}
