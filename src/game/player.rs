//! Player entity: movement intents, physics integration and the combat state machine

use serde::{Deserialize, Serialize};

use crate::util::time::REFERENCE_FPS;

use super::combat::CombatConfig;
use super::events::{EventQueue, GameEvent};
use super::geometry::{Rect, Vec2};
use super::physics::{PhysicsConfig, PhysicsSystem};
use super::weapon::{Rgb, WeaponStats};
use super::PlayerId;

/// Melee attack variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    /// Wide arc in front of the player
    Swing,
    /// Long, narrow stab
    Thrust,
}

/// An attack in progress. Exists only while the attack phase is active,
/// so a hitbox without a phase cannot be represented.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveAttack {
    pub kind: AttackKind,
    pub hitbox: Rect,
    /// Seconds until the attack ends
    pub remaining: f32,
    /// Targets already struck by this attack
    pub struck: Vec<PlayerId>,
}

/// Input intents, one per semantic action per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Move { direction: i8 },
    StopMove,
    Jump,
    Attack { kind: AttackKind },
}

#[derive(Debug, Clone)]
pub struct Player {
    pub player_id: PlayerId,
    pub color: Rgb,

    // Kinematics
    pub rect: Rect,
    pub vx: f32,
    pub vy: f32,
    pub facing_right: bool,

    // Ground state
    pub on_ground: bool,
    pub jump_charges: u8,
    pub coyote_timer: f32,

    // Health and liveness
    pub health: i32,
    pub alive: bool,
    pub respawn_timer: f32,
    pub invuln_timer: f32,
    pub hit_stun_timer: f32,
    pub hit_flash_timer: f32,

    // Combat
    pub attack: Option<ActiveAttack>,
    pub attack_cooldown: f32,
    pub equipped: Option<WeaponStats>,

    /// Driven by received snapshots rather than local intents
    pub remote: bool,

    pub physics: PhysicsConfig,
    pub combat: CombatConfig,
    events: EventQueue,
}

impl Player {
    pub fn new(
        player_id: PlayerId,
        x: f32,
        y: f32,
        color: Rgb,
        physics: PhysicsConfig,
        combat: CombatConfig,
    ) -> Self {
        Self {
            player_id,
            color,
            rect: Rect::new(x, y, physics.player_width, physics.player_height),
            vx: 0.0,
            vy: 0.0,
            facing_right: true,
            on_ground: false,
            jump_charges: physics.max_jump_charges(),
            coyote_timer: 0.0,
            health: combat.max_health,
            alive: true,
            respawn_timer: 0.0,
            invuln_timer: 0.0,
            hit_stun_timer: 0.0,
            hit_flash_timer: 0.0,
            attack: None,
            attack_cooldown: 0.0,
            equipped: None,
            remote: false,
            physics,
            combat,
            events: EventQueue::new(),
        }
    }

    pub fn max_health(&self) -> i32 {
        self.combat.max_health
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invuln_timer > 0.0
    }

    pub fn is_hit_stunned(&self) -> bool {
        self.hit_stun_timer > 0.0
    }

    /// Dead and the respawn countdown has elapsed
    pub fn respawn_ready(&self) -> bool {
        !self.alive && self.respawn_timer <= 0.0
    }

    pub fn attack_kind(&self) -> Option<AttackKind> {
        self.attack.as_ref().map(|a| a.kind)
    }

    pub fn attack_hitbox(&self) -> Option<Rect> {
        self.attack.as_ref().map(|a| a.hitbox)
    }

    /// Events raised since the last drain
    pub fn drain_events_into(&mut self, out: &mut Vec<GameEvent>) {
        self.events.drain_into(out);
    }

    pub(crate) fn notify(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    fn can_act(&self) -> bool {
        self.alive && !self.is_hit_stunned()
    }

    pub fn apply_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Move { direction } => self.move_dir(direction),
            Intent::StopMove => self.stop_move(),
            Intent::Jump => self.jump(),
            Intent::Attack { kind } => self.attack(kind),
        }
    }

    /// Accelerate toward the ground or air target speed. Called once per
    /// tick while a direction is held, so each call is one reference frame
    /// of acceleration.
    pub fn move_dir(&mut self, direction: i8) {
        if !self.can_act() {
            return;
        }
        let direction = direction.signum();
        if direction != 0 {
            self.facing_right = direction > 0;
        }

        let (accel, target) = if self.on_ground {
            (self.physics.accel_ground, self.physics.speed_ground)
        } else {
            (self.physics.accel_air, self.physics.speed_air)
        };
        self.vx = PhysicsSystem::accelerate(
            self.vx,
            direction as f32,
            accel,
            target,
            1.0 / REFERENCE_FPS,
        );
    }

    /// Brake on the ground. Speeds above the threshold (knockback) are kept.
    pub fn stop_move(&mut self) {
        if !self.can_act() || !self.on_ground {
            return;
        }
        if self.vx.abs() < self.physics.speed_ground * self.physics.stop_threshold {
            self.vx *= self.physics.stop_friction;
            if self.vx.abs() < self.physics.velocity_epsilon {
                self.vx = 0.0;
            }
        }
    }

    pub fn jump(&mut self) {
        if !self.can_act() {
            return;
        }
        if !(self.on_ground || self.coyote_timer > 0.0 || self.jump_charges > 0) {
            return;
        }

        self.vy = -self.physics.jump_impulse;
        if !self.on_ground {
            self.jump_charges = self.jump_charges.saturating_sub(1);
        }
        self.on_ground = false;
        self.coyote_timer = 0.0;
    }

    pub fn attack(&mut self, kind: AttackKind) {
        if !self.can_act() || self.attack_cooldown > 0.0 {
            return;
        }

        let hitbox = self.hitbox_for(kind);
        self.attack = Some(ActiveAttack {
            kind,
            hitbox,
            remaining: self.combat.attack_duration,
            struck: Vec::new(),
        });
        self.attack_cooldown = self.combat.attack_cooldown;
        self.events.push(GameEvent::AttackStarted {
            player_id: self.player_id,
            kind,
            hitbox,
        });
    }

    /// Rectangle flush against the leading edge, vertically centred
    pub(crate) fn hitbox_for(&self, kind: AttackKind) -> Rect {
        let weapon_size = self.equipped.as_ref().map(|w| w.size);
        let (w, h) = self.combat.hitbox_size(kind, weapon_size);
        let x = if self.facing_right {
            self.rect.right()
        } else {
            self.rect.left() - w
        };
        Rect::new(x, self.rect.center_y() - h / 2.0, w, h)
    }

    /// Hold a forged weapon as a melee adjunct
    pub fn equip(&mut self, weapon: WeaponStats) {
        self.equipped = Some(weapon);
    }

    pub fn update(&mut self, platforms: &[Rect], dt: f32) {
        self.tick_timers(dt);

        if !self.alive {
            // Cosmetic ragdoll fall only
            self.respawn_timer = (self.respawn_timer - dt).max(0.0);
            self.vy = PhysicsSystem::apply_gravity(
                self.vy,
                self.physics.gravity * self.physics.dead_gravity_scale,
                self.physics.max_fall_speed,
                dt,
            );
            self.rect.y += self.vy * dt;
            return;
        }

        self.vy = PhysicsSystem::apply_gravity(
            self.vy,
            self.physics.gravity,
            self.physics.max_fall_speed,
            dt,
        );
        let friction = if self.on_ground {
            self.physics.ground_friction
        } else {
            self.physics.air_friction
        };
        self.vx = PhysicsSystem::apply_friction(self.vx, friction, self.physics.velocity_epsilon, dt);

        let was_on_ground = self.on_ground;
        PhysicsSystem::move_horizontal(&mut self.rect, &mut self.vx, platforms, dt);
        let contact = PhysicsSystem::move_vertical(&mut self.rect, &mut self.vy, platforms, dt);

        if contact.landed {
            self.on_ground = true;
            self.jump_charges = self.physics.max_jump_charges();
        } else {
            if was_on_ground {
                self.coyote_timer = self.physics.coyote_time;
            }
            self.on_ground = false;
        }

        PhysicsSystem::clamp_to_screen(&mut self.rect, &mut self.vx, &self.physics.playfield);

        if let Some(kind) = self.attack_kind() {
            let hitbox = self.hitbox_for(kind);
            if let Some(attack) = self.attack.as_mut() {
                attack.hitbox = hitbox;
            }
        }

        if self.rect.top() > self.physics.playfield.height {
            self.take_damage(self.combat.fall_damage, 0.0, 0.0);
            if self.alive {
                // Survivors drop back in from the top edge
                self.rect.y = 0.0;
                self.vy = 0.0;
                self.on_ground = false;
                self.coyote_timer = 0.0;
            }
        }
    }

    fn tick_timers(&mut self, dt: f32) {
        fn tick(timer: &mut f32, dt: f32) {
            *timer = (*timer - dt).max(0.0);
        }

        tick(&mut self.invuln_timer, dt);
        tick(&mut self.hit_stun_timer, dt);
        tick(&mut self.hit_flash_timer, dt);
        tick(&mut self.coyote_timer, dt);
        tick(&mut self.attack_cooldown, dt);

        if let Some(attack) = self.attack.as_mut() {
            tick(&mut attack.remaining, dt);
            if attack.remaining <= 0.0 {
                self.attack = None;
            }
        }
    }

    /// Apply damage and additive knockback. Returns false when rejected
    /// (dead or invulnerable), in which case nothing changes.
    pub fn take_damage(&mut self, amount: i32, knockback_x: f32, knockback_y: f32) -> bool {
        if !self.alive || self.is_invulnerable() {
            return false;
        }

        self.health = (self.health - amount.max(0)).max(0);
        self.vx += knockback_x;
        self.vy += knockback_y;
        self.hit_stun_timer = self.combat.hit_stun_time;
        self.hit_flash_timer = self.combat.hit_flash_time;
        self.events.push(GameEvent::HealthChanged {
            player_id: self.player_id,
            health: self.health,
        });

        if self.health == 0 {
            self.die();
        }
        true
    }

    pub fn die(&mut self) {
        if !self.alive {
            return;
        }

        self.alive = false;
        self.health = 0;
        self.vx = 0.0;
        self.attack = None;
        self.respawn_timer = self.combat.respawn_time;
        self.events.push(GameEvent::HealthChanged {
            player_id: self.player_id,
            health: 0,
        });
        self.events.push(GameEvent::PlayerDied {
            player_id: self.player_id,
        });
    }

    /// Full reset to a fresh, briefly invulnerable player
    pub fn respawn(&mut self, position: Option<Vec2>) {
        if let Some(pos) = position {
            self.rect.x = pos.x;
            self.rect.y = pos.y;
        }

        self.alive = true;
        self.health = self.combat.max_health;
        self.vx = 0.0;
        self.vy = 0.0;
        self.on_ground = false;
        self.coyote_timer = 0.0;
        self.jump_charges = self.physics.max_jump_charges();
        self.respawn_timer = 0.0;
        self.invuln_timer = self.combat.invuln_time;
        self.hit_stun_timer = 0.0;
        self.hit_flash_timer = 0.0;
        self.attack = None;
        self.attack_cooldown = 0.0;

        self.events.push(GameEvent::HealthChanged {
            player_id: self.player_id,
            health: self.health,
        });
        self.events.push(GameEvent::PlayerRespawned {
            player_id: self.player_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn player() -> Player {
        Player::new(0, 200.0, 400.0, [0, 100, 255], PhysicsConfig::default(), CombatConfig::default())
    }

    fn floor() -> Vec<Rect> {
        vec![Rect::new(0.0, 500.0, 1280.0, 40.0)]
    }

    /// A player standing on the floor after settling
    fn grounded() -> Player {
        let mut p = player();
        let platforms = floor();
        for _ in 0..60 {
            p.update(&platforms, DT);
        }
        assert!(p.on_ground);
        p
    }

    fn events(p: &mut Player) -> Vec<GameEvent> {
        let mut out = Vec::new();
        p.drain_events_into(&mut out);
        out
    }

    #[test]
    fn health_never_negative() {
        let mut p = player();
        for amount in [30, 45, 80, 5, 1000] {
            p.take_damage(amount, 0.0, 0.0);
            assert!(p.health >= 0);
            p.invuln_timer = 0.0;
        }
        assert_eq!(p.health, 0);
        assert!(!p.alive);
    }

    #[test]
    fn zero_health_means_dead() {
        let mut p = player();
        p.take_damage(100, 0.0, 0.0);
        assert_eq!(p.health, 0);
        assert!(!p.alive);
        assert!(p.respawn_timer > 0.0);
    }

    #[test]
    fn invulnerable_player_ignores_damage_entirely() {
        let mut p = player();
        p.respawn(None);
        events(&mut p);
        let before = p.clone();

        assert!(!p.take_damage(40, 300.0, -200.0));
        assert_eq!(p.health, before.health);
        assert_eq!(p.vx, before.vx);
        assert_eq!(p.vy, before.vy);
        assert_eq!(p.hit_stun_timer, before.hit_stun_timer);
        assert_eq!(p.hit_flash_timer, before.hit_flash_timer);
        assert_eq!(p.invuln_timer, before.invuln_timer);
        assert!(events(&mut p).is_empty());
    }

    #[test]
    fn knockback_is_additive() {
        let mut p = player();
        p.vx = 100.0;
        p.take_damage(10, 250.0, -60.0);
        assert_eq!(p.vx, 350.0);
        assert_eq!(p.vy, -60.0);
        assert!(p.is_hit_stunned());
    }

    #[test]
    fn damage_reports_clamped_health() {
        let mut p = player();
        p.take_damage(130, 0.0, 0.0);
        let ev = events(&mut p);
        assert_eq!(
            ev[0],
            GameEvent::HealthChanged {
                player_id: 0,
                health: 0
            }
        );
        assert!(ev.contains(&GameEvent::PlayerDied { player_id: 0 }));
    }

    #[test]
    fn attack_cooldown_gates_second_attack() {
        let mut p = player();
        p.attack(AttackKind::Swing);
        let first = p.attack.clone();
        let cooldown = p.attack_cooldown;

        p.update(&[], DT);
        let mid = p.attack.clone();
        let mid_cooldown = p.attack_cooldown;
        p.attack(AttackKind::Thrust);

        assert!(first.is_some());
        assert_eq!(p.attack, mid);
        assert_eq!(p.attack_cooldown, mid_cooldown);
        assert!(mid_cooldown < cooldown);
        assert_eq!(p.attack_kind(), Some(AttackKind::Swing));
    }

    #[test]
    fn attack_clears_after_duration() {
        let mut p = player();
        p.attack(AttackKind::Swing);
        let ticks = (p.combat.attack_duration / DT).ceil() as usize + 1;
        for _ in 0..ticks {
            p.update(&[], DT);
        }
        assert!(p.attack.is_none());
        assert!(p.attack_hitbox().is_none());
    }

    #[test]
    fn hitbox_sits_on_leading_edge() {
        let mut p = player();
        p.facing_right = true;
        p.attack(AttackKind::Swing);
        let hb = p.attack_hitbox().unwrap();
        assert_eq!(hb.left(), p.rect.right());
        assert_eq!(hb.center_y(), p.rect.center_y());

        let mut q = player();
        q.facing_right = false;
        q.attack(AttackKind::Thrust);
        let hb = q.attack_hitbox().unwrap();
        assert_eq!(hb.right(), q.rect.left());
        assert!(matches!(
            events(&mut q).as_slice(),
            [GameEvent::AttackStarted { kind: AttackKind::Thrust, .. }]
        ));
    }

    #[test]
    fn dead_player_ignores_intents() {
        let mut p = player();
        p.die();
        p.move_dir(1);
        p.jump();
        p.attack(AttackKind::Swing);
        assert_eq!(p.vx, 0.0);
        assert_eq!(p.vy, 0.0);
        assert!(p.attack.is_none());
    }

    #[test]
    fn hit_stun_suppresses_intents() {
        let mut p = player();
        p.take_damage(10, 0.0, 0.0);
        p.move_dir(1);
        p.attack(AttackKind::Swing);
        assert_eq!(p.vx, 0.0);
        assert!(p.attack.is_none());
    }

    #[test]
    fn die_is_idempotent() {
        let mut p = player();
        p.die();
        events(&mut p);
        let timer = p.respawn_timer;
        p.update(&[], DT);
        let snapshot = (p.alive, p.health, p.vx, p.respawn_timer);

        p.die();
        assert_eq!((p.alive, p.health, p.vx, p.respawn_timer), snapshot);
        assert!(p.respawn_timer < timer);
        assert!(events(&mut p).is_empty());
    }

    #[test]
    fn move_accelerates_and_clamps() {
        let mut p = grounded();
        p.move_dir(1);
        assert!(p.vx > 0.0 && p.vx < p.physics.speed_ground);
        for _ in 0..30 {
            p.move_dir(1);
        }
        assert_eq!(p.vx, p.physics.speed_ground);

        p.move_dir(-1);
        assert!(!p.facing_right);
        assert!(p.vx < p.physics.speed_ground);
    }

    #[test]
    fn stop_move_brakes_only_on_ground() {
        let mut p = grounded();
        p.vx = 200.0;
        p.stop_move();
        assert!(p.vx < 200.0);

        let mut air = player();
        air.vx = 200.0;
        air.stop_move();
        assert_eq!(air.vx, 200.0);
    }

    #[test]
    fn stop_move_keeps_knockback_speed() {
        let mut p = grounded();
        p.vx = 900.0;
        p.stop_move();
        assert_eq!(p.vx, 900.0);
    }

    #[test]
    fn ground_jump_keeps_charges() {
        let mut p = grounded();
        let max = p.physics.max_jump_charges();
        p.jump();
        assert_eq!(p.vy, -p.physics.jump_impulse);
        assert!(!p.on_ground);
        assert_eq!(p.jump_charges, max);
    }

    #[test]
    fn air_jump_spends_one_charge_and_landing_restores() {
        let platforms = floor();
        let mut p = grounded();
        let max = p.physics.max_jump_charges();

        p.jump();
        p.update(&platforms, DT);
        p.jump();
        assert_eq!(p.jump_charges, max - 1);

        for _ in 0..240 {
            p.update(&platforms, DT);
            if p.on_ground {
                break;
            }
        }
        assert!(p.on_ground);
        assert_eq!(p.jump_charges, max);
    }

    #[test]
    fn jump_refused_without_charges() {
        let mut p = player();
        p.jump_charges = 0;
        p.jump();
        assert_eq!(p.vy, 0.0);
    }

    #[test]
    fn walking_off_a_ledge_starts_coyote_time() {
        let ledge = vec![Rect::new(0.0, 500.0, 300.0, 40.0)];
        let mut p = Player::new(0, 250.0, 440.0, [0, 0, 0], PhysicsConfig::default(), CombatConfig::default());
        p.update(&ledge, DT);
        assert!(p.on_ground);

        p.rect.x = 320.0;
        p.update(&ledge, DT);
        assert!(!p.on_ground);
        assert!(p.coyote_timer > 0.0);

        p.jump_charges = 0;
        p.jump();
        assert_eq!(p.vy, -p.physics.jump_impulse);
        assert_eq!(p.coyote_timer, 0.0);
    }

    #[test]
    fn fall_below_screen_is_lethal_once() {
        let mut p = player();
        p.health = 40;
        let mut crossings = 0;
        for _ in 0..600 {
            let before = p.health;
            p.update(&[], DT);
            if p.health < before {
                crossings += 1;
            }
        }
        assert_eq!(crossings, 1);
        assert!(!p.alive);
        assert_eq!(p.health, 0);
    }

    #[test]
    fn non_lethal_fall_damages_once_per_crossing() {
        let mut p = player();
        let mut ticks = 0;
        while p.health == p.max_health() {
            p.update(&[], DT);
            ticks += 1;
            assert!(ticks < 600, "never fell out");
        }

        assert!(p.alive);
        assert_eq!(p.health, p.max_health() - p.combat.fall_damage);
        assert_eq!(p.rect.y, 0.0);
        assert_eq!(p.vy, 0.0);
        let field = p.physics.playfield;
        assert!(p.rect.top() >= 0.0 && p.rect.bottom() <= field.height);

        // Back in play: no further damage until the next crossing
        p.update(&[], DT);
        assert_eq!(p.health, p.max_health() - p.combat.fall_damage);
        assert!(p.rect.top() <= field.height);
    }

    #[test]
    fn fall_survivor_lands_back_on_the_floor() {
        let platforms = floor();
        let mut p = player();
        p.rect.x = 200.0;
        p.rect.y = 800.0;
        p.update(&platforms, DT);
        assert!(p.alive);
        assert_eq!(p.rect.y, 0.0);

        for _ in 0..240 {
            p.update(&platforms, DT);
            if p.on_ground {
                break;
            }
        }
        assert!(p.on_ground);
        assert_eq!(p.rect.bottom(), 500.0);
        assert_eq!(p.health, p.max_health() - p.combat.fall_damage);
    }

    #[test]
    fn respawn_resets_everything() {
        let mut p = player();
        p.take_damage(100, 0.0, 0.0);
        p.respawn(Some(Vec2::new(900.0, 400.0)));
        assert!(p.alive);
        assert_eq!(p.health, p.max_health());
        assert_eq!((p.rect.x, p.rect.y), (900.0, 400.0));
        assert_eq!((p.vx, p.vy), (0.0, 0.0));
        assert!(p.is_invulnerable());
        assert_eq!(p.jump_charges, p.physics.max_jump_charges());
    }

    #[test]
    fn respawn_timer_counts_down_while_dead() {
        let mut p = player();
        p.die();
        assert!(!p.respawn_ready());
        let ticks = (p.combat.respawn_time / DT).ceil() as usize + 1;
        for _ in 0..ticks {
            p.update(&[], DT);
        }
        assert!(p.respawn_ready());
        assert!(!p.alive);
    }

    #[test]
    fn screen_edges_stop_the_player() {
        let mut p = player();
        p.rect.x = 2.0;
        p.vx = -600.0;
        p.update(&[], DT);
        assert_eq!(p.rect.x, 0.0);
        assert_eq!(p.vx, 0.0);
    }
}
