//! Level descriptions loaded at startup
//!
//! A level fixes the win threshold, the bonus kinds that may appear and
//! the initial terrain layout. Levels are JSON documents:
//!
//! ```json
//! {
//!   "points_to_complete": 50,
//!   "possible_bonus_types": ["speed_up", "add_points"],
//!   "terrains": [{ "position": [400, 275], "type": "wall" }]
//! }
//! ```

use crate::config::{read_file, ConfigError};
use serde::{Deserialize, Serialize};
use shared::{BonusKind, Position, Terrain, TerrainKind};
use std::path::Path;

const BUILTIN_LEVEL: &str = include_str!("../levels/level_1.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTerrain {
    pub position: (f32, f32),
    #[serde(rename = "type")]
    pub kind: TerrainKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub points_to_complete: u32,
    #[serde(default)]
    pub possible_bonus_types: Vec<BonusKind>,
    #[serde(default)]
    pub terrains: Vec<LevelTerrain>,
}

impl Level {
    /// The level shipped with the server binary.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN_LEVEL, "built-in level")
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read_file(path)?;
        Self::from_json(&text, &path.display().to_string())
    }

    pub fn from_json(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let level: Level = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        if level.points_to_complete == 0 {
            return Err(ConfigError::Invalid(format!(
                "{}: points_to_complete must be positive",
                origin
            )));
        }
        Ok(level)
    }

    /// Terrain tiles in placement order.
    pub fn terrains(&self) -> Vec<Terrain> {
        self.terrains
            .iter()
            .map(|t| Terrain::new(t.kind, Position::from(t.position)))
            .collect()
    }
}
