//! Offline weapon generator driven by keywords in the prompt

use crate::game::weapon::Rgb;
use crate::game::WeaponDescriptor;

use super::WeaponSmith;

const BASE_COLOR: Rgb = [255, 255, 0];

const MASSIVE_WORDS: [&str; 4] = ["massive", "huge", "giant", "powerful"];
const SWIFT_WORDS: [&str; 4] = ["quick", "fast", "swift", "rapid"];

const MAX_DAMAGE: i32 = 50;
const MAX_KNOCKBACK: f32 = 15.0;
const MAX_SIZE: u32 = 60;
const MIN_SPEED: f32 = 1.0;
const MAX_SPEED: f32 = 10.0;

/// Prompt-keyword generator used when no remote generator is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordSmith;

impl WeaponSmith for KeywordSmith {
    fn forge(&self, prompt: &str) -> WeaponDescriptor {
        weapon_from_keywords(prompt)
    }
}

/// Build a descriptor from intensity, weapon-type and element words.
/// Later matches override the name chosen by earlier ones.
pub fn weapon_from_keywords(prompt: &str) -> WeaponDescriptor {
    let lower = prompt.to_lowercase();
    let mentions_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    let first_word = capitalize(prompt.split_whitespace().next().unwrap_or_default());

    let mut damage = 10;
    let mut knockback = 5.0;
    let mut size = 30;
    let mut speed = 3.0;
    let mut color = BASE_COLOR;
    let mut name = String::from("Forged Weapon");

    if mentions_any(&MASSIVE_WORDS) {
        damage += 15;
        size += 20;
        knockback += 3.0;
        name = format!("Massive {first_word}");
    } else if mentions_any(&SWIFT_WORDS) {
        damage += 5;
        speed += 4.0;
        name = format!("Swift {first_word}");
    }

    if lower.contains("sword") {
        damage += 10;
        color = [200, 200, 255];
        name = "Forged Sword".into();
    } else if lower.contains("hammer") {
        damage += 15;
        knockback += 5.0;
        speed -= 1.0;
        color = [150, 150, 150];
        name = "Mighty Hammer".into();
    } else if lower.contains("spear") {
        damage += 12;
        speed += 2.0;
        size = 40;
        color = [255, 200, 100];
        name = "Sharp Spear".into();
    } else if lower.contains("axe") {
        damage += 13;
        knockback += 3.0;
        color = [180, 100, 100];
        name = "Heavy Axe".into();
    }

    if lower.contains("fire") {
        damage += 8;
        color = [255, 100, 0];
        name = format!("Flaming {name}");
    } else if lower.contains("ice") {
        damage += 5;
        speed -= 1.0;
        color = [100, 200, 255];
        name = format!("Frozen {name}");
    } else if lower.contains("lightning") {
        damage += 10;
        speed += 3.0;
        color = [255, 255, 100];
        name = format!("Lightning {name}");
    }

    WeaponDescriptor::named(name)
        .damage(damage.min(MAX_DAMAGE))
        .knockback(f32::min(knockback, MAX_KNOCKBACK))
        .size(size.min(MAX_SIZE))
        .speed(f32::clamp(speed, MIN_SPEED, MAX_SPEED))
        .color(color)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}
