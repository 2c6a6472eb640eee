//! Combat tuning and hit resolution between attacks, projectiles and players

use serde::{Deserialize, Serialize};

use crate::util::time::REFERENCE_FPS;

use super::player::{AttackKind, Player};
use super::weapon::Weapon;
use super::PlayerId;

/// Whether a single swing may strike the same target on consecutive ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeleeHitPolicy {
    /// Every overlapping tick lands a hit
    #[default]
    EveryTick,
    /// Each target is struck at most once per swing
    OncePerSwing,
}

/// Combat tuning (seconds, px, px/s)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatConfig {
    pub max_health: i32,
    pub melee_damage: i32,
    pub melee_knockback_x: f32,
    pub melee_knockback_y: f32,
    pub attack_duration: f32,
    pub attack_cooldown: f32,
    pub swing_width: f32,
    pub swing_height: f32,
    pub thrust_width: f32,
    pub thrust_height: f32,
    pub hit_stun_time: f32,
    pub hit_flash_time: f32,
    pub invuln_time: f32,
    pub respawn_time: f32,
    pub fall_damage: i32,
    pub hit_policy: MeleeHitPolicy,
}

impl CombatConfig {
    /// Hitbox size for an attack kind, lengthened by an equipped weapon
    pub fn hitbox_size(&self, kind: AttackKind, weapon_size: Option<f32>) -> (f32, f32) {
        let (w, h) = match kind {
            AttackKind::Swing => (self.swing_width, self.swing_height),
            AttackKind::Thrust => (self.thrust_width, self.thrust_height),
        };
        let reach = weapon_size.map(|s| s * 0.5).unwrap_or(0.0);
        (w + reach, h)
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            max_health: 100,
            melee_damage: 15,
            melee_knockback_x: 12.0 * REFERENCE_FPS,
            melee_knockback_y: -6.0 * REFERENCE_FPS,
            attack_duration: 0.2,
            attack_cooldown: 0.45,
            swing_width: 70.0,
            swing_height: 50.0,
            thrust_width: 90.0,
            thrust_height: 24.0,
            hit_stun_time: 0.25,
            hit_flash_time: 0.15,
            invuln_time: 2.0,
            respawn_time: 3.0,
            fall_damage: 50,
            hit_policy: MeleeHitPolicy::EveryTick,
        }
    }
}

/// Hit result from combat resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitResult {
    pub attacker_id: PlayerId,
    pub target_id: PlayerId,
    pub damage: i32,
    pub target_killed: bool,
}

/// Per-tick hit resolution
pub struct CombatSystem;

impl CombatSystem {
    /// Test every live attack hitbox against every other live player.
    /// Knockback follows the attacker's facing, not relative position.
    pub fn resolve_melee(players: &mut [Player], policy: MeleeHitPolicy) -> Vec<HitResult> {
        let mut hits = Vec::new();

        for i in 0..players.len() {
            let attacker = &players[i];
            if !attacker.alive {
                continue;
            }
            let Some(attack) = attacker.attack.as_ref() else {
                continue;
            };

            let attacker_id = attacker.player_id;
            let hitbox = attack.hitbox;
            let already_struck = attack.struck.clone();
            let direction = if attacker.facing_right { 1.0 } else { -1.0 };
            let (damage, knockback_x, knockback_y) = match &attacker.equipped {
                Some(weapon) => (weapon.damage, weapon.knockback, -weapon.knockback * 0.5),
                None => (
                    attacker.combat.melee_damage,
                    attacker.combat.melee_knockback_x,
                    attacker.combat.melee_knockback_y,
                ),
            };

            let mut struck_now = Vec::new();
            for (j, defender) in players.iter_mut().enumerate() {
                if j == i || !defender.alive {
                    continue;
                }
                if policy == MeleeHitPolicy::OncePerSwing
                    && already_struck.contains(&defender.player_id)
                {
                    continue;
                }
                if !hitbox.intersects(&defender.rect) {
                    continue;
                }

                if defender.take_damage(damage, direction * knockback_x, knockback_y) {
                    struck_now.push(defender.player_id);
                    hits.push(HitResult {
                        attacker_id,
                        target_id: defender.player_id,
                        damage,
                        target_killed: !defender.alive,
                    });
                }
            }

            if let Some(attack) = players[i].attack.as_mut() {
                attack.struck.extend(struck_now);
            }
        }

        hits
    }

    /// Test every active weapon against every player
    pub fn resolve_weapons(weapons: &mut [Weapon], players: &mut [Player]) -> Vec<HitResult> {
        let mut hits = Vec::new();

        for weapon in weapons.iter_mut() {
            for player in players.iter_mut() {
                let health_before = player.health;
                if weapon.check_collision(player) {
                    hits.push(HitResult {
                        attacker_id: weapon.owner_id,
                        target_id: player.player_id,
                        damage: health_before - player.health,
                        target_killed: !player.alive,
                    });
                }
            }
        }

        hits
    }
}
