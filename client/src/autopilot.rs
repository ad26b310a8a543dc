//! Headless steering for the bundled client
//!
//! Picks a heading toward the nearest food each poll, never requesting a
//! reversal and avoiding headings that run straight into a wall within a
//! short lookahead.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shared::{Direction, Hitbox, PlayerId, Position, TerrainKind, WorldSnapshot};

/// Distance ahead of the head checked for walls.
const LOOKAHEAD: f32 = 40.0;

// Snapshots carry no segment size; this matches the server default.
const SNAKE_SIZE: f32 = 14.0;

pub struct Autopilot {
    rng: StdRng,
}

impl Autopilot {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Heading to request for player `me`, or `None` to keep going.
    pub fn choose_direction(&mut self, snapshot: &WorldSnapshot, me: PlayerId) -> Option<Direction> {
        let snake = snapshot.snakes.get(&me)?;
        let head = snake.head()?;
        let allowed: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|d| *d != snake.direction.opposite())
            .filter(|d| !wall_ahead(snapshot, head, *d))
            .collect();

        let nearest = snapshot.foods.iter().min_by(|a, b| {
            head.distance_squared(&a.position)
                .total_cmp(&head.distance_squared(&b.position))
        });

        let choice = match nearest {
            Some(food) => preferred(head, food.position)
                .into_iter()
                .find(|d| allowed.contains(d))
                .or_else(|| allowed.first().copied()),
            None if allowed.contains(&snake.direction) => Some(snake.direction),
            None => allowed.choose(&mut self.rng).copied(),
        }?;

        (choice != snake.direction).then_some(choice)
    }
}

/// Headings toward `target`, larger axis first.
fn preferred(from: Position, target: Position) -> [Direction; 2] {
    let dx = target.x - from.x;
    let dy = target.y - from.y;
    let horizontal = if dx >= 0.0 {
        Direction::Right
    } else {
        Direction::Left
    };
    let vertical = if dy >= 0.0 {
        Direction::Down
    } else {
        Direction::Up
    };
    if dx.abs() >= dy.abs() {
        [horizontal, vertical]
    } else {
        [vertical, horizontal]
    }
}

fn wall_ahead(snapshot: &WorldSnapshot, head: Position, direction: Direction) -> bool {
    let probe = Hitbox::centered(head.step(direction, LOOKAHEAD), SNAKE_SIZE);
    snapshot
        .terrains
        .iter()
        .any(|t| t.kind == TerrainKind::Wall && t.hitbox().overlaps(&probe))
}
