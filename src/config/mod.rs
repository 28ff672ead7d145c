//! Configuration module - environment variable parsing

use std::env;

use crate::game::weapon::WeaponKind;
use crate::game::SceneKind;
use crate::net::protocol::GameMap;
use crate::util::time::DEFAULT_FRAME_RATE;

/// Client configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Which mode to play
    pub mode: SceneKind,
    /// HTTP directory base URL; None runs against the in-process directory
    pub directory_url: Option<String>,

    /// Frames per second of the simulation loop
    pub frame_rate: u32,
    /// How long the headless session runs (seconds)
    pub session_secs: u64,

    /// Starting weapon
    pub weapon: WeaponKind,
    /// Seed for weapon spread and scripted input
    pub rng_seed: u64,
    /// Map selected when hosting
    pub map: GameMap,
    /// Bot peers joining a hosted lobby on the in-process directory
    pub local_peers: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            mode: match var("GAME_MODE") {
                Some(v) => v.parse::<SceneKind>().map_err(|e| ConfigError::Unrecognized("GAME_MODE", format!("{e}")))?,
                None => SceneKind::Skirmish,
            },
            directory_url: var("DIRECTORY_URL"),

            frame_rate: match var("FRAME_RATE") {
                Some(v) => v
                    .trim()
                    .parse()
                    .ok()
                    .filter(|rate: &u32| (1..=1_000).contains(rate))
                    .ok_or(ConfigError::Invalid("FRAME_RATE"))?,
                None => DEFAULT_FRAME_RATE,
            },
            session_secs: match var("SESSION_SECS") {
                Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid("SESSION_SECS"))?,
                None => 30,
            },

            weapon: match var("WEAPON") {
                Some(v) => v.parse::<WeaponKind>().map_err(|e| ConfigError::Unrecognized("WEAPON", format!("{e}")))?,
                None => WeaponKind::Rifle,
            },
            rng_seed: match var("RNG_SEED") {
                Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid("RNG_SEED"))?,
                None => rand::random(),
            },
            map: match var("MAP") {
                Some(v) => v.parse::<GameMap>().map_err(|e| ConfigError::Unrecognized("MAP", format!("{e}")))?,
                None => GameMap::Island,
            },
            local_peers: match var("LOCAL_PEERS") {
                Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid("LOCAL_PEERS"))?,
                None => 2,
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid value for environment variable {0}: {1}")]
    Unrecognized(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).expect("defaults");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.mode, SceneKind::Skirmish);
        assert_eq!(config.directory_url, None);
        assert_eq!(config.frame_rate, 60);
        assert_eq!(config.session_secs, 30);
        assert_eq!(config.weapon, WeaponKind::Rifle);
        assert_eq!(config.map, GameMap::Island);
        assert_eq!(config.local_peers, 2);
    }

    #[test]
    fn values_are_parsed() {
        let config = load(&[
            ("GAME_MODE", "online"),
            ("DIRECTORY_URL", "http://localhost:9000"),
            ("FRAME_RATE", "30"),
            ("WEAPON", "smg"),
            ("RNG_SEED", "42"),
            ("MAP", "desert"),
        ])
        .expect("valid");
        assert_eq!(config.mode, SceneKind::OnlineMatch);
        assert_eq!(config.directory_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.frame_rate, 30);
        assert_eq!(config.weapon, WeaponKind::Smg);
        assert_eq!(config.rng_seed, 42);
        assert_eq!(config.map, GameMap::Desert);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        assert!(matches!(load(&[("GAME_MODE", "arcade")]), Err(ConfigError::Unrecognized("GAME_MODE", _))));
        assert!(matches!(load(&[("FRAME_RATE", "0")]), Err(ConfigError::Invalid("FRAME_RATE"))));
        assert!(matches!(load(&[("WEAPON", "bow")]), Err(ConfigError::Unrecognized("WEAPON", _))));
        assert!(matches!(load(&[("SESSION_SECS", "-1")]), Err(ConfigError::Invalid("SESSION_SECS"))));
    }

    #[test]
    fn unrecognized_names_carry_the_reason() {
        let err = load(&[("MAP", "moon")]).err().expect("moon is not a map");
        assert_eq!(
            err.to_string(),
            "Invalid value for environment variable MAP: unknown map: moon"
        );
    }
}
