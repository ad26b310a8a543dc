use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod codec;

pub type PlayerId = u32;

pub const FOOD_SIZE: f32 = 20.0;

/// One of the four orthogonal headings. Screen coordinates: `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit vector for this heading.
    pub fn vector(self) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the position `distance` units further along `direction`.
    pub fn step(&self, direction: Direction, distance: f32) -> Position {
        let (dx, dy) = direction.vector();
        Position {
            x: self.x + dx * distance,
            y: self.y + dy * distance,
        }
    }

    pub fn distance_squared(&self, other: &Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

impl From<(f32, f32)> for Position {
    fn from((x, y): (f32, f32)) -> Self {
        Position { x, y }
    }
}

/// Axis-aligned square around an entity's centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Hitbox {
    pub fn centered(center: Position, size: f32) -> Self {
        let half = size / 2.0;
        Self {
            left: center.x - half,
            top: center.y - half,
            right: center.x + half,
            bottom: center.y + half,
        }
    }

    /// Strict overlap: boxes that only share an edge do not collide.
    pub fn overlaps(&self, other: &Hitbox) -> bool {
        !(self.right <= other.left
            || other.right <= self.left
            || self.bottom <= other.top
            || other.bottom <= self.top)
    }
}

pub fn check_collision(a: Position, a_size: f32, b: Position, b_size: f32) -> bool {
    Hitbox::centered(a, a_size).overlaps(&Hitbox::centered(b, b_size))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    SlowDown,
    SpeedUp,
    Wall,
    Mushroom,
    HolyGrail,
}

impl TerrainKind {
    pub fn size(self) -> f32 {
        match self {
            TerrainKind::SpeedUp => 35.0,
            TerrainKind::Wall => 50.0,
            TerrainKind::SlowDown => 25.0,
            TerrainKind::Mushroom => 10.0,
            TerrainKind::HolyGrail => 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    SpeedUp,
    AddPoints,
    SlowDown,
}

impl BonusKind {
    pub fn size(self) -> f32 {
        match self {
            BonusKind::SpeedUp => 15.0,
            BonusKind::AddPoints => 10.0,
            BonusKind::SlowDown => 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    pub kind: TerrainKind,
    pub position: Position,
}

impl Terrain {
    pub fn new(kind: TerrainKind, position: Position) -> Self {
        Self { kind, position }
    }

    pub fn size(&self) -> f32 {
        self.kind.size()
    }

    pub fn hitbox(&self) -> Hitbox {
        Hitbox::centered(self.position, self.size())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub position: Position,
}

impl Food {
    pub fn hitbox(&self) -> Hitbox {
        Hitbox::centered(self.position, FOOD_SIZE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bonus {
    pub kind: BonusKind,
    pub position: Position,
}

impl Bonus {
    pub fn hitbox(&self) -> Hitbox {
        Hitbox::centered(self.position, self.kind.size())
    }
}

/// Public projection of a live snake, head first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnakeState {
    pub body: Vec<Position>,
    pub direction: Direction,
    pub speed: f32,
    pub points: f32,
}

impl SnakeState {
    pub fn head(&self) -> Option<Position> {
        self.body.first().copied()
    }
}

/// Consistent view of the world, built under the game-state lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub terrains: Vec<Terrain>,
    pub snakes: BTreeMap<PlayerId, SnakeState>,
    pub foods: Vec<Food>,
    pub bonuses: Vec<Bonus>,
    pub points_to_complete: u32,
    /// Unix milliseconds at which the simulation started.
    pub start_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    YouLost,
    HostLost,
    Win { winner: PlayerId },
    ServerClosed,
}

impl GameOverReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameOverReason::YouLost => "you_lost",
            GameOverReason::HostLost => "host_lost",
            GameOverReason::Win { .. } => "win",
            GameOverReason::ServerClosed => "server_closed",
        }
    }
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOverReason::Win { winner } => write!(f, "win (player {})", winner),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    UpdateDirection {
        player_id: PlayerId,
        direction: Direction,
    },
    RequestSnapshot,
    Disconnecting {
        player_id: PlayerId,
    },
}

/// Server to client. `AssignId` is always the first frame on a new connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    AssignId(PlayerId),
    Snapshot(WorldSnapshot),
    GameOver(GameOverReason),
}
