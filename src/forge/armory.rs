//! Fixed weapon templates for offline play and testing

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::game::weapon::Rgb;
use crate::game::WeaponDescriptor;

use super::WeaponSmith;

#[derive(Debug, Clone, Copy)]
struct Template {
    key: &'static str,
    name: &'static str,
    damage: i32,
    knockback: f32,
    speed: f32,
    size: u32,
    color: Rgb,
    lifetime: f32,
    gravity_affected: bool,
}

impl Template {
    fn descriptor(&self) -> WeaponDescriptor {
        WeaponDescriptor::named(self.name)
            .damage(self.damage)
            .knockback(self.knockback)
            .speed(self.speed)
            .size(self.size)
            .color(self.color)
            .lifetime(self.lifetime)
            .gravity_affected(self.gravity_affected)
    }
}

const TEMPLATES: [Template; 5] = [
    Template {
        key: "fireball",
        name: "Fireball",
        damage: 20,
        knockback: 10.0,
        speed: 8.0,
        size: 30,
        color: [255, 100, 50],
        lifetime: 3.0,
        gravity_affected: false,
    },
    Template {
        key: "ice_shard",
        name: "Ice Shard",
        damage: 15,
        knockback: 8.0,
        speed: 10.0,
        size: 25,
        color: [100, 200, 255],
        lifetime: 2.5,
        gravity_affected: false,
    },
    Template {
        key: "boulder",
        name: "Boulder",
        damage: 30,
        knockback: 15.0,
        speed: 5.0,
        size: 45,
        color: [120, 100, 80],
        lifetime: 4.0,
        gravity_affected: true,
    },
    Template {
        key: "energy_blast",
        name: "Energy Blast",
        damage: 18,
        knockback: 12.0,
        speed: 12.0,
        size: 28,
        color: [255, 255, 100],
        lifetime: 2.0,
        gravity_affected: false,
    },
    Template {
        key: "poison_cloud",
        name: "Poison Cloud",
        damage: 12,
        knockback: 5.0,
        speed: 4.0,
        size: 50,
        color: [100, 255, 100],
        lifetime: 5.0,
        gravity_affected: false,
    },
];

/// Returned for names that match no template
const FALLBACK: Template = Template {
    key: "magic_missile",
    name: "Magic Missile",
    damage: 15,
    knockback: 8.0,
    speed: 7.0,
    size: 25,
    color: [200, 100, 255],
    lifetime: 3.0,
    gravity_affected: false,
};

/// Template weapons with a seedable random pick
pub struct Armory {
    rng: Mutex<ChaCha8Rng>,
}

impl Armory {
    /// `None` seeds from the thread RNG
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        TEMPLATES.iter().map(|t| t.key)
    }

    /// Template by key; unknown keys get the fallback missile
    pub fn get(&self, key: &str) -> WeaponDescriptor {
        TEMPLATES
            .iter()
            .find(|t| t.key == key)
            .unwrap_or(&FALLBACK)
            .descriptor()
    }

    pub fn random(&self) -> WeaponDescriptor {
        let mut rng = self.rng.lock();
        TEMPLATES.choose(&mut *rng).unwrap_or(&FALLBACK).descriptor()
    }
}

impl WeaponSmith for Armory {
    /// A prompt naming a template ("ice shard") gets it, anything else a random pick
    fn forge(&self, prompt: &str) -> WeaponDescriptor {
        let key = prompt.trim().to_lowercase().replace(' ', "_");
        if TEMPLATES.iter().any(|t| t.key == key) {
            self.get(&key)
        } else {
            self.random()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_template() {
        let armory = Armory::new(Some(1));
        let boulder = armory.get("boulder");
        assert_eq!(boulder.name.as_deref(), Some("Boulder"));
        assert_eq!(boulder.damage, Some(30));
        assert_eq!(boulder.gravity_affected, Some(true));
        assert_eq!(boulder.lifetime, Some(4.0));
    }

    #[test]
    fn unknown_template_falls_back() {
        let armory = Armory::new(Some(1));
        let missile = armory.get("banana");
        assert_eq!(missile.name.as_deref(), Some("Magic Missile"));
        assert_eq!(missile.damage, Some(15));
    }

    #[test]
    fn seeded_picks_repeat() {
        let a = Armory::new(Some(42));
        let b = Armory::new(Some(42));
        for _ in 0..10 {
            assert_eq!(a.random(), b.random());
        }
    }

    #[test]
    fn prompt_selects_template_by_name() {
        let armory = Armory::new(Some(7));
        assert_eq!(armory.forge("  Ice Shard "), armory.get("ice_shard"));

        let picked = armory.forge("something else");
        let names: Vec<_> = TEMPLATES.iter().map(|t| Some(t.name.to_string())).collect();
        assert!(names.contains(&picked.name));
    }

    #[test]
    fn lists_every_template() {
        assert_eq!(Armory::names().count(), 5);
        assert!(Armory::names().any(|n| n == "poison_cloud"));
    }
}
