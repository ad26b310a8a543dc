//! Authoritative tick processing
//!
//! Each tick runs the same phases in a fixed order, all under the world
//! lock held by the caller:
//!
//! 1. Advance every active snake
//! 2. Food pickups (credit, growth, respawn)
//! 3. Bonus pickups (one-shot effects, no respawn)
//! 4. Terrain effects on every overlapping snake
//! 5. Timed events: holy grail relocation, mushroom growth, bonus spawns
//! 6. Head collisions against bodies
//! 7. End-of-game evaluation
//!
//! Only the last phase produces messages. They are returned as [`Notice`]s
//! for the caller to queue once the tick is complete.

use crate::world::{Notice, World};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{
    Bonus, BonusKind, Food, GameOverReason, Hitbox, PlayerId, Position, Terrain, TerrainKind,
    FOOD_SIZE,
};
use std::time::Duration;

impl World {
    /// Runs one tick using the wall-clock time since the world was created.
    pub fn tick_now(&mut self) -> Vec<Notice> {
        let elapsed = self.elapsed();
        self.tick(elapsed)
    }

    /// Runs one tick at simulation time `elapsed`.
    ///
    /// Once the game is over the world is frozen and every further call is
    /// a no-op.
    pub fn tick(&mut self, elapsed: Duration) -> Vec<Notice> {
        if self.outcome.is_some() {
            return Vec::new();
        }
        self.tick += 1;

        self.advance_snakes();
        self.resolve_food();
        self.resolve_bonuses();
        self.resolve_terrain();
        self.run_timed_events(elapsed);
        self.resolve_head_collisions();
        self.evaluate_end_conditions()
    }

    fn advance_snakes(&mut self) {
        let config = &self.config;
        for session in self.sessions.iter_mut().filter(|s| s.is_active()) {
            session.snake.advance(config);
        }
    }

    /// The player credited with a pickup under `hitbox`.
    ///
    /// When several snakes overlap the same item the lowest player id wins.
    pub(crate) fn claimant(&self, hitbox: &Hitbox) -> Option<PlayerId> {
        self.sessions
            .active()
            .find(|s| s.snake.hits(hitbox, 0))
            .map(|s| s.id)
    }

    fn resolve_food(&mut self) {
        self.replenish_food();

        let mut index = 0;
        while index < self.foods.len() {
            let hitbox = self.foods[index].hitbox();
            let Some(eater) = self.claimant(&hitbox) else {
                index += 1;
                continue;
            };

            if let Some(session) = self.sessions.get_mut(eater) {
                session.snake.grow(self.config.growth_per_food);
                session.snake.add_points(1.0);
                debug!(
                    "Player {} ate food, {} points",
                    eater,
                    session.snake.points()
                );
            }
            self.foods.swap_remove(index);
            self.spawn_food();
        }
    }

    fn resolve_bonuses(&mut self) {
        let mut index = 0;
        while index < self.bonuses.len() {
            let bonus = self.bonuses[index];
            let Some(taker) = self.claimant(&bonus.hitbox()) else {
                index += 1;
                continue;
            };

            let config = &self.config;
            if let Some(session) = self.sessions.get_mut(taker) {
                let snake = &mut session.snake;
                match bonus.kind {
                    BonusKind::SpeedUp => snake.scale_speed(config.bonus_speed_factor, config),
                    BonusKind::SlowDown => snake.scale_speed(config.bonus_slow_factor, config),
                    BonusKind::AddPoints => snake.add_points(config.bonus_points),
                }
                debug!("Player {} took bonus {:?}", taker, bonus.kind);
            }
            self.bonuses.swap_remove(index);
        }
    }

    fn resolve_terrain(&mut self) {
        let config = &self.config;
        let disorient_ticks = config.ticks_for(config.mushroom_disorient_ms);
        let mut wrecked = Vec::new();

        for terrain in &self.terrains {
            let hitbox = terrain.hitbox();
            for session in self.sessions.iter_mut().filter(|s| s.is_active()) {
                if !session.snake.hits(&hitbox, 0) {
                    continue;
                }
                let snake = &mut session.snake;
                match terrain.kind {
                    TerrainKind::SlowDown => snake.scale_speed(config.terrain_slow_rate, config),
                    TerrainKind::SpeedUp => snake.scale_speed(config.terrain_speedup_rate, config),
                    TerrainKind::HolyGrail => snake.add_points(config.holy_grail_points),
                    TerrainKind::Mushroom => snake.disorient(disorient_ticks),
                    TerrainKind::Wall => wrecked.push(session.id),
                }
            }
        }

        wrecked.sort_unstable();
        wrecked.dedup();
        for id in wrecked {
            info!("Player {} hit a wall", id);
            self.mark_lost(id);
        }
    }

    fn run_timed_events(&mut self, elapsed: Duration) {
        if elapsed.saturating_sub(self.clock.grail_moved) > self.config.grail_move_interval() {
            self.clock.grail_moved = elapsed;
            self.move_holy_grail();
        }
        if elapsed.saturating_sub(self.clock.mushrooms_grown) > self.config.mushroom_grow_interval()
        {
            self.clock.mushrooms_grown = elapsed;
            self.grow_mushroom();
        }
        if elapsed.saturating_sub(self.clock.bonus_spawned) > self.config.bonus_spawn_interval() {
            self.clock.bonus_spawned = elapsed;
            self.spawn_bonus();
        }
    }

    /// A head touching any other body, or its own body past the exempt
    /// leading segments, loses. All heads are checked before anyone is
    /// marked, so mutual collisions take out both snakes.
    fn resolve_head_collisions(&mut self) {
        let exempt = self.config.self_collision_exempt.max(1);
        let mut smashed = Vec::new();

        for session in self.sessions.active() {
            let head = session.snake.head_hitbox();
            let hit = self.sessions.active().any(|other| {
                let skip = if other.id == session.id { exempt } else { 0 };
                other.snake.hits(&head, skip)
            });
            if hit {
                smashed.push(session.id);
            }
        }

        for id in smashed {
            info!("Player {} crashed", id);
            self.mark_lost(id);
        }
    }

    fn evaluate_end_conditions(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        if self.outcome.is_some() {
            return notices;
        }

        if self.host_lost {
            warn!("Host lost, ending the game");
            self.finish(GameOverReason::HostLost, &mut notices);
            return notices;
        }

        let threshold = self.points_to_complete as f32;
        let winners: Vec<PlayerId> = self
            .sessions
            .active()
            .filter(|s| s.snake.points() >= threshold)
            .map(|s| s.id)
            .collect();

        for winner in winners {
            let reason = GameOverReason::Win { winner };
            if self.sessions.is_host(winner) {
                info!("Host {} won, ending the game", winner);
                self.finish(reason, &mut notices);
                return notices;
            }
            info!("Player {} reached {} points", winner, threshold);
            if let Some(session) = self.sessions.get_mut(winner) {
                session.set_outcome(reason);
            }
            notices.push(Notice { to: winner, reason });
        }

        for session in self.sessions.iter_mut() {
            if session.snake.is_lost() && session.outcome().is_none() {
                session.set_outcome(GameOverReason::YouLost);
                notices.push(Notice {
                    to: session.id,
                    reason: GameOverReason::YouLost,
                });
            }
        }
        notices
    }

    /// Ends the game with `reason` for everyone not already told their
    /// own result.
    fn finish(&mut self, reason: GameOverReason, notices: &mut Vec<Notice>) {
        self.outcome = Some(reason);
        for session in self.sessions.iter_mut().filter(|s| s.outcome().is_none()) {
            session.set_outcome(reason);
            notices.push(Notice {
                to: session.id,
                reason,
            });
        }
    }

    /// Uniform random point on the integer grid inside the edge margins.
    fn random_point(&mut self) -> Position {
        let margin = self.config.edge_margin;
        let x = self
            .rng
            .gen_range(margin as i32..=(self.config.width - margin) as i32);
        let y = self
            .rng
            .gen_range(margin as i32..=(self.config.play_height() - margin) as i32);
        Position::new(x as f32, y as f32)
    }

    pub(crate) fn touches_snake(&self, hitbox: &Hitbox) -> bool {
        self.sessions.active().any(|s| s.snake.hits(hitbox, 0))
    }

    pub(crate) fn touches_wall(&self, hitbox: &Hitbox) -> bool {
        self.terrains
            .iter()
            .any(|t| t.kind == TerrainKind::Wall && t.hitbox().overlaps(hitbox))
    }

    fn touches_pickup(&self, hitbox: &Hitbox) -> bool {
        self.foods.iter().any(|f| f.hitbox().overlaps(hitbox))
            || self.bonuses.iter().any(|b| b.hitbox().overlaps(hitbox))
    }

    /// A random point where an item of `size` overlaps no snake, wall or
    /// other pickup.
    fn free_spot(&mut self, size: f32) -> Option<Position> {
        for _ in 0..self.config.spawn_attempts {
            let candidate = self.random_point();
            let hitbox = Hitbox::centered(candidate, size);
            if !self.touches_snake(&hitbox)
                && !self.touches_wall(&hitbox)
                && !self.touches_pickup(&hitbox)
            {
                return Some(candidate);
            }
        }
        None
    }

    /// Tops the field back up to `food_count` items. Spawns that found no
    /// free spot earlier are retried here.
    pub(crate) fn replenish_food(&mut self) {
        for _ in self.foods.len()..self.config.food_count {
            self.spawn_food();
        }
    }

    fn spawn_food(&mut self) {
        match self.free_spot(FOOD_SIZE) {
            Some(position) => self.foods.push(Food { position }),
            None => warn!("No free spot for food"),
        }
    }

    pub(crate) fn spawn_bonus(&mut self) {
        let Some(&kind) = self.bonus_kinds.choose(&mut self.rng) else {
            return;
        };
        match self.free_spot(kind.size()) {
            Some(position) => {
                debug!("Spawned {:?} bonus at ({}, {})", kind, position.x, position.y);
                self.bonuses.push(Bonus { kind, position });
            }
            None => warn!("No free spot for {:?} bonus", kind),
        }
    }

    pub(crate) fn move_holy_grail(&mut self) {
        if !self.terrains.iter().any(|t| t.kind == TerrainKind::HolyGrail) {
            return;
        }
        let position = self.random_point();
        for terrain in self
            .terrains
            .iter_mut()
            .filter(|t| t.kind == TerrainKind::HolyGrail)
        {
            terrain.position = position;
        }
        debug!("Holy grail moved to ({}, {})", position.x, position.y);
    }

    /// Spreads a random mushroom onto one free neighbouring tile.
    ///
    /// Candidates are the four tiles one mushroom-width away that lie on the
    /// field and hold no mushroom yet. Growth is skipped if the chosen tile
    /// overlaps a wall.
    pub(crate) fn grow_mushroom(&mut self) {
        let step = TerrainKind::Mushroom.size();
        let existing: Vec<Position> = self
            .terrains
            .iter()
            .filter(|t| t.kind == TerrainKind::Mushroom)
            .map(|t| t.position)
            .collect();
        let Some(&origin) = existing.choose(&mut self.rng) else {
            return;
        };

        let (width, height) = (self.config.width, self.config.play_height());
        let candidates: Vec<Position> = [(step, 0.0), (-step, 0.0), (0.0, step), (0.0, -step)]
            .iter()
            .map(|(dx, dy)| Position::new(origin.x + dx, origin.y + dy))
            .filter(|p| (0.0..=width).contains(&p.x) && (0.0..=height).contains(&p.y))
            .filter(|p| !self.has_mushroom_at(p))
            .collect();
        let Some(&spot) = candidates.choose(&mut self.rng) else {
            return;
        };

        if self.touches_wall(&Hitbox::centered(spot, step)) {
            debug!("Mushroom growth at ({}, {}) blocked by a wall", spot.x, spot.y);
            return;
        }
        self.terrains.push(Terrain::new(TerrainKind::Mushroom, spot));
        debug!("Mushroom grew at ({}, {})", spot.x, spot.y);
    }

    fn has_mushroom_at(&self, position: &Position) -> bool {
        self.terrains
            .iter()
            .any(|t| t.kind == TerrainKind::Mushroom && t.position == *position)
    }

    /// Spawn point for a new snake: two snake-widths in from the left edge
    /// at a random height clear of walls and other snakes.
    pub(crate) fn snake_spawn_point(&mut self) -> Position {
        let size = self.config.snake_size;
        let x = 2.0 * size;
        let low = x as i32;
        let high = ((self.config.play_height() - size) as i32).max(low);

        let mut candidate = Position::new(x, low as f32);
        for _ in 0..self.config.spawn_attempts {
            candidate = Position::new(x, self.rng.gen_range(low..=high) as f32);
            let hitbox = Hitbox::centered(candidate, size);
            if !self.touches_wall(&hitbox) && !self.touches_snake(&hitbox) {
                return candidate;
            }
        }
        warn!("No clear spawn point, placing snake at ({}, {})", candidate.x, candidate.y);
        candidate
    }
}

#[cfg(test)]
mod tests {
    use crate::snake::Snake;
    use crate::world::testing::{join, level, world};
    use crate::world::{Notice, World};
    use assert_approx_eq::assert_approx_eq;
    use shared::{
        Bonus, BonusKind, Direction, Food, GameOverReason, Hitbox, PlayerId, Position,
        ServerMessage, TerrainKind, FOOD_SIZE,
    };
    use std::time::Duration;

    const EARLY: Duration = Duration::from_millis(10);

    /// Straight snake with its head at `head`, body trailing behind it.
    fn place(world: &mut World, id: PlayerId, head: (f32, f32), direction: Direction) {
        let head = Position::new(head.0, head.1);
        let body = (0..20)
            .map(|i| head.step(direction.opposite(), i as f32 * 2.0))
            .collect();
        let snake = Snake::from_body(body, direction, &world.config);
        world.sessions.get_mut(id).unwrap().snake = snake;
    }

    fn quiet_world(terrains: Vec<(TerrainKind, (f32, f32))>) -> World {
        let mut world = world(&level(terrains));
        world.foods.clear();
        world.config.food_count = 0;
        world.config.passive_speed_increment = 0.0;
        world
    }

    #[test]
    fn test_active_snakes_advance() {
        let mut world = quiet_world(vec![]);
        let (id, _rx) = join(&mut world);
        place(&mut world, id, (200.0, 200.0), Direction::Down);

        world.tick(EARLY);

        let head = world.sessions.get(id).unwrap().snake.head();
        assert_approx_eq!(head.x, 200.0);
        assert_approx_eq!(head.y, 201.0);
        assert_eq!(world.tick_count(), 1);
    }

    #[test]
    fn test_food_credited_to_lowest_id() {
        let mut world = quiet_world(vec![(TerrainKind::Wall, (600.0, 300.0))]);
        let (a, _rx_a) = join(&mut world);
        let (b, _rx_b) = join(&mut world);
        // Side by side, edges touching, both reaching the same food.
        place(&mut world, a, (300.0, 100.0), Direction::Up);
        place(&mut world, b, (314.0, 100.0), Direction::Up);
        world.foods.push(Food {
            position: Position::new(307.0, 90.0),
        });

        world.tick(EARLY);

        let snake_a = &world.sessions.get(a).unwrap().snake;
        let snake_b = &world.sessions.get(b).unwrap().snake;
        assert_eq!(snake_a.points(), 1.0);
        assert_eq!(snake_a.pending_growth(), world.config.growth_per_food);
        assert_eq!(snake_b.points(), 0.0);

        assert_eq!(world.foods.len(), 1);
        let fresh = Hitbox::centered(world.foods[0].position, FOOD_SIZE);
        assert!(!world.touches_snake(&fresh));
        assert!(!world.touches_wall(&fresh));
    }

    #[test]
    fn test_missing_food_is_replenished() {
        let mut world = quiet_world(vec![]);
        let (id, _rx) = join(&mut world);
        place(&mut world, id, (300.0, 100.0), Direction::Right);
        world.foods.push(Food {
            position: Position::new(303.0, 100.0),
        });
        world.config.food_count = 1;
        world.config.spawn_attempts = 0;

        world.tick(EARLY);
        assert_eq!(world.sessions.get(id).unwrap().snake.points(), 1.0);
        assert!(world.foods.is_empty());

        world.config.spawn_attempts = 256;
        world.tick(EARLY);

        assert_eq!(world.foods.len(), 1);
        let fresh = Hitbox::centered(world.foods[0].position, FOOD_SIZE);
        assert!(!world.touches_snake(&fresh));
    }

    #[test]
    fn test_bonus_effects_and_no_respawn() {
        let mut world = quiet_world(vec![]);
        let (a, _rx_a) = join(&mut world);
        let (b, _rx_b) = join(&mut world);
        place(&mut world, a, (300.0, 100.0), Direction::Right);
        place(&mut world, b, (300.0, 300.0), Direction::Right);
        world.bonuses.push(Bonus {
            kind: BonusKind::AddPoints,
            position: Position::new(303.0, 100.0),
        });
        world.bonuses.push(Bonus {
            kind: BonusKind::SpeedUp,
            position: Position::new(303.0, 300.0),
        });

        world.tick(EARLY);

        assert_eq!(
            world.sessions.get(a).unwrap().snake.points(),
            world.config.bonus_points
        );
        assert_approx_eq!(
            world.sessions.get(b).unwrap().snake.speed(),
            world.config.start_speed * world.config.bonus_speed_factor
        );
        assert!(world.bonuses.is_empty());
    }

    #[test]
    fn test_terrain_effects() {
        let mut world = quiet_world(vec![
            (TerrainKind::SlowDown, (300.0, 100.0)),
            (TerrainKind::HolyGrail, (300.0, 200.0)),
            (TerrainKind::Mushroom, (300.0, 300.0)),
        ]);
        let (a, _rx_a) = join(&mut world);
        let (b, _rx_b) = join(&mut world);
        let (c, _rx_c) = join(&mut world);
        place(&mut world, a, (300.0, 100.0), Direction::Right);
        place(&mut world, b, (300.0, 200.0), Direction::Right);
        place(&mut world, c, (300.0, 300.0), Direction::Right);

        world.tick(EARLY);

        let config = world.config.clone();
        assert_approx_eq!(
            world.sessions.get(a).unwrap().snake.speed(),
            config.start_speed * config.terrain_slow_rate
        );
        assert_approx_eq!(
            world.sessions.get(b).unwrap().snake.points(),
            config.holy_grail_points
        );
        let snake_c = &mut world.sessions.get_mut(c).unwrap().snake;
        assert!(snake_c.is_disoriented());
        snake_c.steer(Direction::Up);
        assert_eq!(snake_c.direction(), Direction::Down);
    }

    #[test]
    fn test_wall_loses_and_notifies_once() {
        let mut world = quiet_world(vec![(TerrainKind::Wall, (400.0, 300.0))]);
        let (host, _rx_host) = join(&mut world);
        let (guest, mut rx_guest) = join(&mut world);
        place(&mut world, host, (100.0, 100.0), Direction::Right);
        place(&mut world, guest, (370.0, 300.0), Direction::Right);

        let notices = world.tick(EARLY);
        assert_eq!(
            notices,
            vec![Notice {
                to: guest,
                reason: GameOverReason::YouLost
            }]
        );
        world.dispatch(&notices);
        assert_eq!(
            rx_guest.try_recv().unwrap(),
            ServerMessage::GameOver(GameOverReason::YouLost)
        );

        assert!(world.tick(EARLY).is_empty());
        assert!(!world.is_over());
        assert!(!world.snapshot().snakes.contains_key(&guest));
    }

    #[test]
    fn test_head_into_other_body() {
        let mut world = quiet_world(vec![]);
        let (first, _rx_first) = join(&mut world);
        let (second, _rx_second) = join(&mut world);
        // first lies along y = 200 from x = 162 to 200, heading right.
        place(&mut world, first, (200.0, 200.0), Direction::Right);
        // second's head sits on first's body, heading up.
        let body = (0..20)
            .map(|i| Position::new(180.0, 206.0 + i as f32 * 2.0))
            .collect();
        world.sessions.get_mut(second).unwrap().snake =
            Snake::from_body(body, Direction::Up, &world.config);

        world.tick(EARLY);

        assert!(world.sessions.get(second).unwrap().snake.is_lost());
        assert!(!world.sessions.get(first).unwrap().snake.is_lost());
    }

    #[test]
    fn test_own_neck_is_exempt() {
        let mut world = quiet_world(vec![]);
        let (id, _rx) = join(&mut world);
        place(&mut world, id, (200.0, 200.0), Direction::Right);

        for _ in 0..10 {
            world.tick(EARLY);
        }

        assert!(!world.sessions.get(id).unwrap().snake.is_lost());
    }

    #[test]
    fn test_host_loss_broadcasts_once() {
        let mut world = quiet_world(vec![]);
        let (host, mut rx_host) = join(&mut world);
        let (guest, mut rx_guest) = join(&mut world);
        place(&mut world, host, (100.0, 100.0), Direction::Right);
        place(&mut world, guest, (100.0, 300.0), Direction::Right);

        world.remove_session(host);
        let notices = world.tick(EARLY);

        assert_eq!(
            notices,
            vec![Notice {
                to: guest,
                reason: GameOverReason::HostLost
            }]
        );
        assert_eq!(world.outcome(), Some(GameOverReason::HostLost));
        world.dispatch(&notices);
        assert_eq!(
            rx_guest.try_recv().unwrap(),
            ServerMessage::GameOver(GameOverReason::HostLost)
        );
        assert!(rx_host.try_recv().is_err());

        let frozen = world.sessions.get(guest).unwrap().snake.head();
        assert!(world.tick(EARLY).is_empty());
        assert_eq!(world.sessions.get(guest).unwrap().snake.head(), frozen);
    }

    #[test]
    fn test_guest_win_only_tells_winner() {
        let mut world = quiet_world(vec![]);
        let (host, _rx_host) = join(&mut world);
        let (guest, _rx_guest) = join(&mut world);
        place(&mut world, host, (100.0, 100.0), Direction::Right);
        place(&mut world, guest, (100.0, 300.0), Direction::Right);
        let threshold = world.points_to_complete as f32;
        world
            .sessions
            .get_mut(guest)
            .unwrap()
            .snake
            .add_points(threshold);

        let notices = world.tick(EARLY);
        assert_eq!(
            notices,
            vec![Notice {
                to: guest,
                reason: GameOverReason::Win { winner: guest }
            }]
        );
        assert!(!world.is_over());
        assert!(!world.is_active(guest));

        let before = world.sessions.get(host).unwrap().snake.head();
        assert!(world.tick(EARLY).is_empty());
        let after = world.sessions.get(host).unwrap().snake.head();
        assert!(after.x > before.x);
    }

    #[test]
    fn test_host_win_ends_game_for_everyone() {
        let mut world = quiet_world(vec![]);
        let (host, _rx_host) = join(&mut world);
        let (guest, _rx_guest) = join(&mut world);
        place(&mut world, host, (100.0, 100.0), Direction::Right);
        place(&mut world, guest, (100.0, 300.0), Direction::Right);
        let threshold = world.points_to_complete as f32;
        world
            .sessions
            .get_mut(host)
            .unwrap()
            .snake
            .add_points(threshold);

        let notices = world.tick(EARLY);
        let reason = GameOverReason::Win { winner: host };
        assert_eq!(
            notices,
            vec![
                Notice { to: host, reason },
                Notice { to: guest, reason }
            ]
        );
        assert_eq!(world.outcome(), Some(reason));
    }

    #[test]
    fn test_host_loss_skips_players_already_finished() {
        let mut world = quiet_world(vec![]);
        let (host, _rx_host) = join(&mut world);
        let (winner, _rx_winner) = join(&mut world);
        let (loser, _rx_loser) = join(&mut world);
        place(&mut world, host, (100.0, 100.0), Direction::Right);
        place(&mut world, winner, (100.0, 300.0), Direction::Right);
        place(&mut world, loser, (100.0, 450.0), Direction::Right);
        let threshold = world.points_to_complete as f32;
        world
            .sessions
            .get_mut(winner)
            .unwrap()
            .snake
            .add_points(threshold);
        world.mark_lost(loser);

        let notices = world.tick(EARLY);
        assert_eq!(notices.len(), 2);

        world.mark_lost(host);
        let notices = world.tick(EARLY);

        assert_eq!(
            notices,
            vec![Notice {
                to: host,
                reason: GameOverReason::HostLost
            }]
        );
        assert_eq!(world.outcome(), Some(GameOverReason::HostLost));
        assert_eq!(
            world.sessions.get(winner).unwrap().outcome(),
            Some(GameOverReason::Win { winner })
        );
    }

    #[test]
    fn test_timed_events_fire_after_interval() {
        let mut world = quiet_world(vec![
            (TerrainKind::HolyGrail, (700.0, 500.0)),
            (TerrainKind::Mushroom, (400.0, 400.0)),
        ]);
        let late = world.config.grail_move_interval() + Duration::from_secs(1);

        world.tick(EARLY);
        assert!(world.bonuses.is_empty());

        world.tick(late);

        assert_eq!(world.bonuses.len(), 1);
        let patch = mushrooms(&world);
        assert_eq!(patch.len(), 2);
        assert!(adjacent(patch[1], patch[0]));
        assert_eq!(world.clock.grail_moved, late);
    }

    fn mushrooms(world: &World) -> Vec<Position> {
        world
            .terrains
            .iter()
            .filter(|t| t.kind == TerrainKind::Mushroom)
            .map(|t| t.position)
            .collect()
    }

    fn adjacent(a: Position, b: Position) -> bool {
        let step = TerrainKind::Mushroom.size();
        ((a.x - b.x).abs() == step && a.y == b.y) || ((a.y - b.y).abs() == step && a.x == b.x)
    }

    #[test]
    fn test_mushrooms_spread_to_free_neighbours() {
        let mut world = quiet_world(vec![(TerrainKind::Mushroom, (400.0, 400.0))]);

        for _ in 0..5 {
            world.grow_mushroom();
        }

        // A tile with all four neighbours taken cannot spread, which can
        // only happen once the patch has five tiles.
        let patch = mushrooms(&world);
        assert!(patch.len() >= 5 && patch.len() <= 6);
        for (i, tile) in patch.iter().enumerate().skip(1) {
            assert!(patch[..i].iter().any(|earlier| adjacent(*tile, *earlier)));
            assert!(patch[i + 1..].iter().all(|later| later != tile));
        }
    }

    #[test]
    fn test_mushroom_blocked_by_wall() {
        let mut world = quiet_world(vec![
            (TerrainKind::Mushroom, (400.0, 400.0)),
            (TerrainKind::Wall, (400.0, 400.0)),
        ]);

        world.grow_mushroom();

        assert_eq!(mushrooms(&world).len(), 1);
    }

    #[test]
    fn test_mushroom_stays_on_field() {
        let mut world = quiet_world(vec![
            (TerrainKind::Mushroom, (0.0, 0.0)),
            (TerrainKind::Mushroom, (10.0, 0.0)),
            (TerrainKind::Mushroom, (0.0, 10.0)),
            (TerrainKind::Mushroom, (10.0, 10.0)),
        ]);

        for _ in 0..20 {
            world.grow_mushroom();
        }

        assert!(mushrooms(&world)
            .iter()
            .all(|p| p.x >= 0.0 && p.y >= 0.0));
    }

    #[test]
    fn test_holy_grail_moves_inside_margins() {
        let mut world = quiet_world(vec![(TerrainKind::HolyGrail, (1.0, 1.0))]);

        world.move_holy_grail();

        let grail = world.terrains[0].position;
        let margin = world.config.edge_margin;
        assert!(grail.x >= margin && grail.x <= world.config.width - margin);
        assert!(grail.y >= margin && grail.y <= world.config.play_height() - margin);
    }

    #[test]
    fn test_no_bonus_without_kinds() {
        let mut world = quiet_world(vec![]);
        world.bonus_kinds.clear();

        world.spawn_bonus();

        assert!(world.bonuses.is_empty());
    }
}
