//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::session::SessionSettings;
use crate::game::{MatchSettings, MeleeHitPolicy, RoundRule, WeaponMode};

/// Port the LAN game has always used
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:5555";

/// Which generator answers forge requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForgeBackend {
    /// Keyword-driven mock generator
    #[default]
    Keywords,
    /// Fixed templates, random pick for unknown prompts
    Armory,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated, `*` for any)
    pub client_origin: String,

    /// Minimum time between two forge requests from one connection
    pub forge_cooldown: Duration,
    pub forge_backend: ForgeBackend,
    /// Seed for the armory's random pick
    pub armory_seed: Option<u64>,

    /// Tuning handed to every client when a match starts
    pub match_settings: MatchSettings,
    pub session: SessionSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 5555)),
            log_level: "info".to_string(),
            client_origin: "*".to_string(),
            forge_cooldown: Duration::from_secs(5),
            forge_backend: ForgeBackend::default(),
            armory_seed: None,
            match_settings: MatchSettings::default(),
            session: SessionSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Hosting platforms provide PORT; fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
        };
        config.server_addr = server_addr
            .parse()
            .map_err(|_| ConfigError::InvalidAddress)?;

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(origin) = lookup("CLIENT_ORIGIN") {
            config.client_origin = origin;
        }

        let cooldown: u64 = parse_or(&lookup, "FORGE_COOLDOWN_SECS", 5)?;
        config.forge_cooldown = Duration::from_secs(cooldown);
        config.forge_backend = match lookup("FORGE_BACKEND").as_deref() {
            None | Some("keywords") => ForgeBackend::Keywords,
            Some("armory") => ForgeBackend::Armory,
            Some(other) => return Err(ConfigError::invalid("FORGE_BACKEND", other)),
        };
        config.armory_seed = match lookup("ARMORY_SEED") {
            Some(raw) => Some(
                raw.parse()
                    .map_err(|_| ConfigError::invalid("ARMORY_SEED", &raw))?,
            ),
            None => None,
        };

        let settings = &mut config.match_settings;
        settings.combat.max_health = parse_or(&lookup, "MAX_HEALTH", settings.combat.max_health)?;
        if settings.combat.max_health <= 0 {
            return Err(ConfigError::NonPositive("MAX_HEALTH"));
        }
        settings.combat.respawn_time = parse_or(&lookup, "RESPAWN_SECONDS", settings.combat.respawn_time)?;
        if !settings.combat.respawn_time.is_finite() || settings.combat.respawn_time < 0.0 {
            return Err(ConfigError::NonPositive("RESPAWN_SECONDS"));
        }
        settings.physics.double_jump = parse_or(&lookup, "DOUBLE_JUMP", settings.physics.double_jump)?;

        settings.weapon_mode = match lookup("WEAPON_MODE").as_deref() {
            None => settings.weapon_mode,
            Some("projectile") => WeaponMode::Projectile,
            Some("equipped_melee") => WeaponMode::EquippedMelee,
            Some(other) => return Err(ConfigError::invalid("WEAPON_MODE", other)),
        };
        settings.round_rule = match lookup("ROUND_RULE").as_deref() {
            None => settings.round_rule,
            Some("timed") => RoundRule::Timed,
            Some("elimination") => RoundRule::Elimination,
            Some(other) => return Err(ConfigError::invalid("ROUND_RULE", other)),
        };
        settings.combat.hit_policy = match lookup("MELEE_HIT_POLICY").as_deref() {
            None => settings.combat.hit_policy,
            Some("every_tick") => MeleeHitPolicy::EveryTick,
            Some("once_per_swing") => MeleeHitPolicy::OncePerSwing,
            Some(other) => return Err(ConfigError::invalid("MELEE_HIT_POLICY", other)),
        };

        let session = &mut config.session;
        session.round_seconds = parse_or(&lookup, "ROUND_SECONDS", session.round_seconds)?;
        if !session.round_seconds.is_finite() || session.round_seconds <= 0.0 {
            return Err(ConfigError::NonPositive("ROUND_SECONDS"));
        }
        session.forge_timeout_secs = parse_or(&lookup, "FORGE_TIMEOUT_SECS", session.forge_timeout_secs)?;
        if !session.forge_timeout_secs.is_finite() || session.forge_timeout_secs < 0.0 {
            return Err(ConfigError::NonPositive("FORGE_TIMEOUT_SECS"));
        }

        Ok(config)
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid(key, &raw)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("{0} must be positive")]
    NonPositive(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str) -> Self {
        ConfigError::Invalid {
            name,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr.port(), 5555);
        assert_eq!(config.client_origin, "*");
        assert_eq!(config.session.round_seconds, 180.0);
        assert_eq!(config.session.forge_timeout_secs, 20.0);
        assert_eq!(config.match_settings.combat.max_health, 100);
        assert_eq!(config.forge_cooldown, Duration::from_secs(5));
        assert_eq!(config.forge_backend, ForgeBackend::Keywords);
    }

    #[test]
    fn port_overrides_server_addr() {
        let config = load(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]).unwrap();
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn game_modes_parse() {
        let config = load(&[
            ("WEAPON_MODE", "equipped_melee"),
            ("ROUND_RULE", "elimination"),
            ("MELEE_HIT_POLICY", "once_per_swing"),
            ("DOUBLE_JUMP", "false"),
            ("ARMORY_SEED", "42"),
        ])
        .unwrap();
        assert_eq!(config.match_settings.weapon_mode, WeaponMode::EquippedMelee);
        assert_eq!(config.match_settings.round_rule, RoundRule::Elimination);
        assert_eq!(config.match_settings.combat.hit_policy, MeleeHitPolicy::OncePerSwing);
        assert!(!config.match_settings.physics.double_jump);
        assert_eq!(config.armory_seed, Some(42));
    }

    #[test]
    fn rejects_non_positive_max_health() {
        assert!(matches!(
            load(&[("MAX_HEALTH", "-5")]),
            Err(ConfigError::NonPositive("MAX_HEALTH"))
        ));
        assert!(matches!(
            load(&[("MAX_HEALTH", "0")]),
            Err(ConfigError::NonPositive("MAX_HEALTH"))
        ));
    }

    #[test]
    fn rejects_nan_and_infinite_durations() {
        for value in ["NaN", "inf", "-1"] {
            assert!(matches!(
                load(&[("ROUND_SECONDS", value)]),
                Err(ConfigError::NonPositive("ROUND_SECONDS"))
            ));
            assert!(matches!(
                load(&[("RESPAWN_SECONDS", value)]),
                Err(ConfigError::NonPositive("RESPAWN_SECONDS"))
            ));
            assert!(matches!(
                load(&[("FORGE_TIMEOUT_SECS", value)]),
                Err(ConfigError::NonPositive("FORGE_TIMEOUT_SECS"))
            ));
        }
        assert_eq!(load(&[("RESPAWN_SECONDS", "0")]).unwrap().match_settings.combat.respawn_time, 0.0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            load(&[("ROUND_SECONDS", "soon")]),
            Err(ConfigError::Invalid { name: "ROUND_SECONDS", .. })
        ));
        assert!(matches!(
            load(&[("WEAPON_MODE", "laser")]),
            Err(ConfigError::Invalid { name: "WEAPON_MODE", .. })
        ));
        assert!(matches!(
            load(&[("SERVER_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress)
        ));
    }
}
