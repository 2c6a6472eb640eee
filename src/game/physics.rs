//! Platformer physics: gravity, friction and axis-separated platform collision

use serde::{Deserialize, Serialize};

use crate::util::time::REFERENCE_FPS;

use super::geometry::{Playfield, Rect};

/// Movement tuning. Speeds are px/s, accelerations px/s², friction factors
/// are per reference frame and rescaled by `dt`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    pub player_width: f32,
    pub player_height: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    /// Gravity multiplier for the cosmetic fall of a dead player
    pub dead_gravity_scale: f32,
    pub accel_ground: f32,
    pub accel_air: f32,
    pub speed_ground: f32,
    pub speed_air: f32,
    pub ground_friction: f32,
    pub air_friction: f32,
    /// Extra braking applied by `stop_move` while grounded
    pub stop_friction: f32,
    /// `stop_move` only brakes below this multiple of `speed_ground`
    pub stop_threshold: f32,
    /// Horizontal speeds below this snap to zero
    pub velocity_epsilon: f32,
    pub jump_impulse: f32,
    pub coyote_time: f32,
    pub double_jump: bool,
    pub playfield: Playfield,
}

impl PhysicsConfig {
    /// Jump charges restored on landing
    pub fn max_jump_charges(&self) -> u8 {
        if self.double_jump {
            2
        } else {
            1
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        let fps = REFERENCE_FPS;
        Self {
            player_width: 40.0,
            player_height: 60.0,
            gravity: 0.8 * fps * fps,
            max_fall_speed: 20.0 * fps,
            dead_gravity_scale: 0.5,
            accel_ground: 0.8 * fps * fps,
            accel_air: 0.5 * fps * fps,
            speed_ground: 5.0 * fps,
            speed_air: 4.5 * fps,
            ground_friction: 0.9,
            air_friction: 0.97,
            stop_friction: 0.7,
            stop_threshold: 1.2,
            velocity_epsilon: 0.1 * fps,
            jump_impulse: 15.0 * fps,
            coyote_time: 0.1,
            double_jump: true,
            playfield: Playfield::default(),
        }
    }
}

/// Result of the vertical collision pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerticalContact {
    pub landed: bool,
    pub hit_ceiling: bool,
}

/// Stateless physics helpers
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Add gravity to a vertical velocity, capped at the terminal fall speed
    pub fn apply_gravity(vy: f32, gravity: f32, max_fall_speed: f32, dt: f32) -> f32 {
        (vy + gravity * dt).min(max_fall_speed)
    }

    /// Multiplicative decay of a velocity component, frame-rate independent
    pub fn apply_friction(v: f32, factor_per_frame: f32, epsilon: f32, dt: f32) -> f32 {
        let decayed = v * factor_per_frame.powf(dt * REFERENCE_FPS);
        if decayed.abs() < epsilon {
            0.0
        } else {
            decayed
        }
    }

    /// Accelerate toward `target` along the sign of `direction`, clamped
    /// to the target speed
    pub fn accelerate(vx: f32, direction: f32, accel: f32, target: f32, dt: f32) -> f32 {
        (vx + direction * accel * dt).clamp(-target, target)
    }

    /// Horizontal pass: integrate x, then push out of every platform
    pub fn move_horizontal(body: &mut Rect, vx: &mut f32, platforms: &[Rect], dt: f32) {
        body.x += *vx * dt;

        for platform in platforms {
            if !body.intersects(platform) {
                continue;
            }
            if *vx > 0.0 {
                body.x = platform.left() - body.w;
                *vx = 0.0;
            } else if *vx < 0.0 {
                body.x = platform.right();
                *vx = 0.0;
            }
        }
    }

    /// Vertical pass: integrate y, then land on or bump under platforms
    pub fn move_vertical(
        body: &mut Rect,
        vy: &mut f32,
        platforms: &[Rect],
        dt: f32,
    ) -> VerticalContact {
        let mut contact = VerticalContact::default();
        body.y += *vy * dt;

        for platform in platforms {
            if !body.intersects(platform) {
                continue;
            }
            if *vy > 0.0 {
                body.y = platform.top() - body.h;
                *vy = 0.0;
                contact.landed = true;
            } else if *vy < 0.0 {
                body.y = platform.bottom();
                *vy = 0.0;
                contact.hit_ceiling = true;
            }
        }

        contact
    }

    /// Keep a body inside the horizontal screen bounds
    pub fn clamp_to_screen(body: &mut Rect, vx: &mut f32, playfield: &Playfield) {
        if body.x < 0.0 {
            body.x = 0.0;
            *vx = 0.0;
        } else if body.right() > playfield.width {
            body.x = playfield.width - body.w;
            *vx = 0.0;
        }
    }
}
