//! Forged weapons: the descriptor record, projectile entities and equipped melee adjuncts

use serde::{Deserialize, Serialize};

use crate::util::time::REFERENCE_FPS;

use super::geometry::{Playfield, Rect, Vec2};
use super::player::Player;
use super::PlayerId;

pub type Rgb = [u8; 3];

pub const NEUTRAL_COLOR: Rgb = [128, 128, 128];

pub const DEFAULT_WEAPON_NAME: &str = "Unknown Weapon";
pub const DEFAULT_DAMAGE: i32 = 10;
pub const DEFAULT_KNOCKBACK: f32 = 5.0;
pub const DEFAULT_SIZE: u32 = 30;
pub const DEFAULT_SPEED: f32 = 3.0;
pub const DEFAULT_LIFETIME: f32 = 5.0;

/// Vertical knockback as a fraction of the horizontal magnitude
const LIFT_RATIO: f32 = 0.5;

/// Fraction of world gravity applied to gravity-affected projectiles
pub const PROJECTILE_GRAVITY_SCALE: f32 = 0.5;

/// Weapon record delivered by the forge.
///
/// Every field may be missing; `resolve` fills the gaps with the documented
/// defaults. Knockback and speed are in reference-frame units (px/frame).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeaponDescriptor {
    pub name: Option<String>,
    pub damage: Option<i32>,
    pub knockback: Option<f32>,
    pub size: Option<u32>,
    pub speed: Option<f32>,
    pub color: Option<Rgb>,
    pub gravity_affected: Option<bool>,
    pub lifetime: Option<f32>,
}

impl WeaponDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn damage(mut self, damage: i32) -> Self {
        self.damage = Some(damage);
        self
    }

    pub fn knockback(mut self, knockback: f32) -> Self {
        self.knockback = Some(knockback);
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn gravity_affected(mut self, gravity_affected: bool) -> Self {
        self.gravity_affected = Some(gravity_affected);
        self
    }

    pub fn lifetime(mut self, lifetime: f32) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Apply defaults and convert to simulation units
    pub fn resolve(&self) -> WeaponStats {
        WeaponStats {
            name: self
                .name
                .clone()
                .unwrap_or_else(|| DEFAULT_WEAPON_NAME.to_string()),
            damage: self.damage.unwrap_or(DEFAULT_DAMAGE).max(0),
            knockback: self.knockback.unwrap_or(DEFAULT_KNOCKBACK).abs() * REFERENCE_FPS,
            size: self.size.unwrap_or(DEFAULT_SIZE).max(1) as f32,
            speed: self.speed.unwrap_or(DEFAULT_SPEED) * REFERENCE_FPS,
            color: self.color.unwrap_or(NEUTRAL_COLOR),
            gravity_affected: self.gravity_affected.unwrap_or(false),
            lifetime: self.lifetime.unwrap_or(DEFAULT_LIFETIME).max(0.0),
        }
    }
}

/// A descriptor addressed to the player who forged it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForgedWeapon {
    pub owner_id: PlayerId,
    pub descriptor: WeaponDescriptor,
}

/// Resolved weapon stats in simulation units (px, px/s, seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub name: String,
    pub damage: i32,
    pub knockback: f32,
    pub size: f32,
    pub speed: f32,
    pub color: Rgb,
    pub gravity_affected: bool,
    pub lifetime: f32,
}

/// How forged weapons enter play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponMode {
    /// Thrown as a free-flying projectile
    #[default]
    Projectile,
    /// Held by the owner and used by their melee attacks
    EquippedMelee,
}

/// A forged weapon after the game mode has decided what it is
#[derive(Debug, Clone, PartialEq)]
pub enum Armament {
    Projectile(Weapon),
    EquippedMelee(WeaponStats),
}

impl Armament {
    /// Turn forged stats into a playable weapon for `owner`
    pub fn forge(mode: WeaponMode, stats: WeaponStats, owner: &Player, world_gravity: f32) -> Self {
        match mode {
            WeaponMode::Projectile => Self::Projectile(Weapon::launch(
                stats,
                owner.player_id,
                owner.rect.center(),
                owner.facing_right,
                world_gravity,
            )),
            WeaponMode::EquippedMelee => Self::EquippedMelee(stats),
        }
    }
}

/// Free-flying weapon entity
#[derive(Debug, Clone, PartialEq)]
pub struct Weapon {
    pub owner_id: PlayerId,
    pub stats: WeaponStats,
    pub rect: Rect,
    pub vx: f32,
    pub vy: f32,
    pub gravity: f32,
    pub elapsed: f32,
    pub active: bool,
}

impl Weapon {
    /// Create a projectile centred on `center`, travelling in the facing direction
    pub fn launch(
        stats: WeaponStats,
        owner_id: PlayerId,
        center: Vec2,
        facing_right: bool,
        world_gravity: f32,
    ) -> Self {
        let size = stats.size;
        let direction = if facing_right { 1.0 } else { -1.0 };
        let gravity = if stats.gravity_affected {
            world_gravity * PROJECTILE_GRAVITY_SCALE
        } else {
            0.0
        };

        Self {
            owner_id,
            rect: Rect::new(center.x - size / 2.0, center.y - size / 2.0, size, size),
            vx: stats.speed * direction,
            vy: 0.0,
            gravity,
            elapsed: 0.0,
            active: true,
            stats,
        }
    }

    /// Advance lifetime and motion
    pub fn update(&mut self, dt: f32, playfield: &Playfield) {
        if !self.active {
            return;
        }

        self.elapsed += dt;
        if self.elapsed >= self.stats.lifetime {
            self.active = false;
            return;
        }

        self.rect.x += self.vx * dt;
        self.rect.y += self.vy * dt;
        self.vy += self.gravity * dt;

        if playfield.fully_outside(&self.rect) {
            self.active = false;
        }
    }

    /// Hit `player` if overlapping. Consumes the weapon on contact.
    pub fn check_collision(&mut self, player: &mut Player) -> bool {
        if !self.active || !player.alive || player.player_id == self.owner_id {
            return false;
        }

        if !self.rect.intersects(&player.rect) {
            return false;
        }

        let sign = if self.vx < 0.0 { -1.0 } else { 1.0 };
        let knockback_x = sign * self.stats.knockback;
        let knockback_y = -self.stats.knockback * LIFT_RATIO;

        player.take_damage(self.stats.damage, knockback_x, knockback_y);
        self.active = false;
        true
    }
}
