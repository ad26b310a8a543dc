//! Snake bodies and movement
//!
//! A snake is a queue of segment centres with the head at the front. Each
//! tick the head advances by `speed / head_speed_divisor` units and the tail
//! is trimmed unless growth is still owed, so the body slides along the
//! path the head has taken.

use crate::config::GameConfig;
use shared::{Direction, Hitbox, Position, SnakeState};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct Snake {
    /// Segment centres, head first. Never empty.
    body: VecDeque<Position>,
    direction: Direction,
    speed: f32,
    points: f32,
    size: f32,
    lost: bool,
    /// Segments still to be added before the tail starts moving again.
    pending_growth: usize,
    /// Ticks of inverted steering left.
    disoriented_ticks: u32,
}

impl Snake {
    /// Creates a snake coiled up on `start`, heading right.
    ///
    /// All segments begin stacked on the spawn point and unroll as the
    /// head moves away.
    pub fn new(start: Position, config: &GameConfig) -> Self {
        Self {
            body: std::iter::repeat(start)
                .take(config.snake_start_length.max(1))
                .collect(),
            direction: Direction::Right,
            speed: config.start_speed,
            points: 0.0,
            size: config.snake_size,
            lost: false,
            pending_growth: 0,
            disoriented_ticks: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn from_body(body: Vec<Position>, direction: Direction, config: &GameConfig) -> Self {
        assert!(!body.is_empty(), "snake body must have a head");
        Self {
            body: body.into(),
            direction,
            ..Self::new(Position::default(), config)
        }
    }

    pub fn head(&self) -> Position {
        self.body.front().copied().unwrap_or_default()
    }

    pub fn body(&self) -> impl Iterator<Item = &Position> + '_ {
        self.body.iter()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn points(&self) -> f32 {
        self.points
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn pending_growth(&self) -> usize {
        self.pending_growth
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }

    pub fn is_disoriented(&self) -> bool {
        self.disoriented_ticks > 0
    }

    /// Moves the snake one tick forward.
    pub fn advance(&mut self, config: &GameConfig) {
        self.speed = (self.speed + config.passive_speed_increment)
            .clamp(config.min_speed, config.max_speed);

        let head = self
            .head()
            .step(self.direction, self.speed / config.head_speed_divisor);
        self.body.push_front(head);

        if self.pending_growth > 0 {
            self.pending_growth -= 1;
        } else {
            self.body.pop_back();
        }

        self.disoriented_ticks = self.disoriented_ticks.saturating_sub(1);
    }

    /// Applies a steering request, returning whether the heading changed.
    ///
    /// While disoriented every request is mirrored. A request for the
    /// reverse of the current heading is ignored.
    pub fn steer(&mut self, requested: Direction) -> bool {
        let requested = if self.is_disoriented() {
            requested.opposite()
        } else {
            requested
        };

        if requested == self.direction || requested == self.direction.opposite() {
            return false;
        }
        self.direction = requested;
        true
    }

    pub fn grow(&mut self, segments: usize) {
        self.pending_growth += segments;
    }

    pub fn scale_speed(&mut self, factor: f32, config: &GameConfig) {
        self.speed = (self.speed * factor).clamp(config.min_speed, config.max_speed);
    }

    pub fn add_points(&mut self, points: f32) {
        self.points += points;
    }

    pub fn disorient(&mut self, ticks: u32) {
        self.disoriented_ticks = self.disoriented_ticks.max(ticks);
    }

    pub fn mark_lost(&mut self) {
        self.lost = true;
    }

    /// Whether any segment after the first `skip` overlaps `hitbox`.
    pub fn hits(&self, hitbox: &Hitbox, skip: usize) -> bool {
        self.body
            .iter()
            .skip(skip)
            .any(|segment| Hitbox::centered(*segment, self.size).overlaps(hitbox))
    }

    pub fn head_hitbox(&self) -> Hitbox {
        Hitbox::centered(self.head(), self.size)
    }

    pub fn state(&self) -> SnakeState {
        SnakeState {
            body: self.body.iter().copied().collect(),
            direction: self.direction,
            speed: self.speed,
            points: self.points,
        }
    }
}
