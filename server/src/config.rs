//! Tunable game constants
//!
//! Every magnitude the simulation uses (speeds, growth, effect strengths,
//! event intervals) lives here so it can be adjusted from a JSON file
//! without touching the engine. Missing keys fall back to the reference
//! values in [`GameConfig::default`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub(crate) fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,

    pub width: f32,
    pub height: f32,
    /// Strip along the bottom reserved for the score panel.
    pub panel_height: f32,
    /// Random placement keeps this far from the field edges.
    pub edge_margin: f32,

    pub snake_size: f32,
    pub snake_start_length: usize,
    pub start_speed: f32,
    /// Head advances `speed / head_speed_divisor` units per tick.
    pub head_speed_divisor: f32,
    pub passive_speed_increment: f32,
    pub min_speed: f32,
    pub max_speed: f32,
    /// Food items kept on the field.
    pub food_count: usize,
    pub growth_per_food: usize,
    /// Leading segments a snake's own head never collides with.
    pub self_collision_exempt: usize,

    pub bonus_points: f32,
    pub bonus_speed_factor: f32,
    pub bonus_slow_factor: f32,
    pub terrain_slow_rate: f32,
    pub terrain_speedup_rate: f32,
    pub holy_grail_points: f32,
    pub mushroom_disorient_ms: u64,

    pub bonus_spawn_interval_ms: u64,
    pub grail_move_interval_ms: u64,
    pub mushroom_grow_interval_ms: u64,

    /// Pause between the final game-over notice and the simulation stopping.
    pub game_over_grace_ms: u64,
    pub spawn_attempts: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: 120,
            width: 800.0,
            height: 600.0,
            panel_height: 50.0,
            edge_margin: 20.0,
            snake_size: 14.0,
            snake_start_length: 60,
            start_speed: 4.0,
            head_speed_divisor: 4.0,
            passive_speed_increment: 0.00005,
            min_speed: 1.0,
            max_speed: 32.0,
            food_count: 1,
            growth_per_food: 10,
            self_collision_exempt: 200,
            bonus_points: 5.0,
            bonus_speed_factor: 1.2,
            bonus_slow_factor: 0.5,
            terrain_slow_rate: 0.999,
            terrain_speedup_rate: 1.0003,
            holy_grail_points: 0.1,
            mushroom_disorient_ms: 3000,
            bonus_spawn_interval_ms: 20_000,
            grail_move_interval_ms: 60_000,
            mushroom_grow_interval_ms: 50_000,
            game_over_grace_ms: 2000,
            spawn_attempts: 256,
        }
    }
}

impl GameConfig {
    pub fn from_json(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: GameConfig =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse {
                origin: origin.to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read_file(path)?;
        Self::from_json(&text, &path.display().to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be positive".into()));
        }
        if self.head_speed_divisor <= 0.0 {
            return Err(ConfigError::Invalid(
                "head_speed_divisor must be positive".into(),
            ));
        }
        if self.min_speed <= 0.0 || self.min_speed > self.max_speed {
            return Err(ConfigError::Invalid(format!(
                "speed range {}..={} is empty or non-positive",
                self.min_speed, self.max_speed
            )));
        }
        if self.width - 2.0 * self.edge_margin < 1.0
            || self.play_height() - 2.0 * self.edge_margin < 1.0
        {
            return Err(ConfigError::Invalid(
                "playfield is smaller than its edge margins".into(),
            ));
        }
        if self.play_height() < 3.0 * self.snake_size {
            return Err(ConfigError::Invalid(
                "playfield too short to spawn snakes".into(),
            ));
        }
        if self.snake_start_length == 0 || self.spawn_attempts == 0 {
            return Err(ConfigError::Invalid(
                "snake_start_length and spawn_attempts must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Height of the area snakes and pickups live in.
    pub fn play_height(&self) -> f32 {
        self.height - self.panel_height
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate as f64)
    }

    pub fn ticks_for(&self, ms: u64) -> u32 {
        (ms.saturating_mul(self.tick_rate as u64) / 1000).min(u32::MAX as u64) as u32
    }

    pub fn bonus_spawn_interval(&self) -> Duration {
        Duration::from_millis(self.bonus_spawn_interval_ms)
    }

    pub fn grail_move_interval(&self) -> Duration {
        Duration::from_millis(self.grail_move_interval_ms)
    }

    pub fn mushroom_grow_interval(&self) -> Duration {
        Duration::from_millis(self.mushroom_grow_interval_ms)
    }

    pub fn game_over_grace(&self) -> Duration {
        Duration::from_millis(self.game_over_grace_ms)
    }
}
