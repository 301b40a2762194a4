//! Run configuration, stored as JSON.
//!
//! Every section falls back to its defaults, so a partial file such as
//! `{"board": {"width": 10, "height": 10}}` is a valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub board: BoardConfig,
    pub fitness: FitnessConfig,
    pub evolution: EvolutionConfig,
    pub logging: LoggingConfig,
}

/// Grid dimensions, fixed for the lifetime of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub width: u16,
    pub height: u16,
}

/// Constants of the shaped fitness protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    /// Episode ends after this many consecutive ticks without eating.
    pub max_steps_without_food: u32,
    /// Capacity of the recent head position window.
    pub memory_window: usize,
    /// A head position seen more than this many times in the window is a loop.
    pub repeat_limit: usize,
    /// Scale factor is `max(1, length_scale * length)`.
    pub length_scale: f64,
    /// Reward per cell moved toward food, multiplied by the scale factor.
    pub approach_reward: f64,
    /// Penalty per cell moved away from food.
    pub retreat_penalty: f64,
    pub step_cost: f64,
    /// Reward per food eaten, multiplied by the scale factor.
    pub food_reward: f64,
    pub loop_penalty: f64,
    /// Applied once when the episode ends in a collision.
    pub collision_penalty: f64,
}

/// Parameters of the bundled policy search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population: usize,
    pub generations: usize,
    /// Episodes averaged into one individual's fitness.
    pub episodes: usize,
    pub mutation_sigma: f32,
    pub hidden: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter (error, warn, info, debug, trace); `RUST_LOG` wins.
    pub level: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self { width: 17, height: 17 }
    }
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            max_steps_without_food: 150,
            memory_window: 10,
            repeat_limit: 2,
            length_scale: 0.2,
            approach_reward: 0.3,
            retreat_penalty: 0.3,
            step_cost: 0.5,
            food_reward: 20.0,
            loop_penalty: 0.5,
            collision_penalty: 24.0,
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population: 50,
            generations: 100,
            episodes: 3,
            mutation_sigma: 0.25,
            hidden: 16,
            seed: 42,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board.width == 0 || self.board.height == 0 {
            return Err(ConfigError::Invalid("board width and height must be > 0".to_string()));
        }
        if self.fitness.memory_window == 0 {
            return Err(ConfigError::Invalid("fitness.memory_window must be > 0".to_string()));
        }
        self.evolution.validate()
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population == 0 {
            return Err(ConfigError::Invalid("evolution.population must be > 0".to_string()));
        }
        if self.episodes == 0 {
            return Err(ConfigError::Invalid("evolution.episodes must be > 0".to_string()));
        }
        if !self.mutation_sigma.is_finite() || self.mutation_sigma <= 0.0 {
            return Err(ConfigError::Invalid(
                "evolution.mutation_sigma must be finite and > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.board.width, 17);
        assert_eq!(config.fitness.max_steps_without_food, 150);
        assert_eq!(config.fitness.collision_penalty, 24.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"board": {"width": 10}, "fitness": {"step_cost": 1.0}}"#).unwrap();
        assert_eq!(config.board, BoardConfig { width: 10, height: 17 });
        assert_eq!(config.fitness.step_cost, 1.0);
        assert_eq!(config.fitness.memory_window, 10);
        assert_eq!(config.evolution, EvolutionConfig::default());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.evolution.population = 8;
        config.save(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn mutation_sigma_must_be_finite_and_positive() {
        for sigma in [0.0, -0.1, f32::NAN, f32::INFINITY] {
            let mut config = Config::default();
            config.evolution.mutation_sigma = sigma;
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))), "sigma {sigma}");
        }
    }

    #[test]
    fn zero_board_is_invalid() {
        let mut config = Config::default();
        config.board.height = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
