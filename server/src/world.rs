use crate::config::GameConfig;
use crate::level::Level;
use crate::session::{Outbound, Session, SessionRegistry};
use crate::snake::Snake;
use crate::utils::unix_millis;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    Bonus, BonusKind, Direction, Food, GameOverReason, PlayerId, Position, ServerMessage, Terrain,
    WorldSnapshot,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// The world behind the single game-state lock.
pub type SharedWorld = Arc<Mutex<World>>;

/// A game-over message owed to one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub to: PlayerId,
    pub reason: GameOverReason,
}

/// Simulation time at which each timed event last fired.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct EventClock {
    pub grail_moved: Duration,
    pub mushrooms_grown: Duration,
    pub bonus_spawned: Duration,
}

#[derive(Debug)]
pub struct World {
    pub(crate) config: GameConfig,
    pub(crate) sessions: SessionRegistry,
    pub(crate) terrains: Vec<Terrain>,
    pub(crate) foods: Vec<Food>,
    pub(crate) bonuses: Vec<Bonus>,
    pub(crate) points_to_complete: u32,
    pub(crate) bonus_kinds: Vec<BonusKind>,
    pub(crate) clock: EventClock,
    pub(crate) started_at: Instant,
    pub(crate) start_time: u64,
    pub(crate) tick: u64,
    pub(crate) host_lost: bool,
    pub(crate) outcome: Option<GameOverReason>,
    pub(crate) rng: StdRng,
}

impl World {
    pub fn new(config: GameConfig, level: &Level) -> Self {
        Self::with_rng(config, level, StdRng::from_entropy())
    }

    /// Builds a world whose random placement is driven by `rng`.
    pub fn with_rng(config: GameConfig, level: &Level, rng: StdRng) -> Self {
        let mut world = Self {
            config,
            sessions: SessionRegistry::new(),
            terrains: level.terrains(),
            foods: Vec::new(),
            bonuses: Vec::new(),
            points_to_complete: level.points_to_complete,
            bonus_kinds: level.possible_bonus_types.clone(),
            clock: EventClock::default(),
            started_at: Instant::now(),
            start_time: unix_millis(),
            tick: 0,
            host_lost: false,
            outcome: None,
            rng,
        };
        world.replenish_food();
        info!(
            "World ready: {} terrain tiles, {} points to win",
            world.terrains.len(),
            world.points_to_complete
        );
        world
    }

    pub fn into_shared(self) -> SharedWorld {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn terrains(&self) -> &[Terrain] {
        &self.terrains
    }

    pub fn foods(&self) -> &[Food] {
        &self.foods
    }

    pub fn bonuses(&self) -> &[Bonus] {
        &self.bonuses
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulation time since the world was created.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn allocate_id(&mut self) -> PlayerId {
        self.sessions.allocate_id()
    }

    /// Registers a player and spawns their snake. Returns the spawn point.
    pub fn join(&mut self, id: PlayerId, addr: SocketAddr, outbound: Outbound) -> Position {
        let start = self.snake_spawn_point();
        let snake = Snake::new(start, &self.config);
        self.sessions.insert(Session::new(id, addr, snake, outbound));

        info!(
            "Added player {} at ({}, {}){}",
            id,
            start.x,
            start.y,
            if self.sessions.is_host(id) { " as host" } else { "" }
        );
        start
    }

    pub fn steer(&mut self, id: PlayerId, direction: Direction) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) if session.is_active() => session.snake.steer(direction),
            _ => false,
        }
    }

    pub fn mark_lost(&mut self, id: PlayerId) {
        let is_host = self.sessions.is_host(id);
        if let Some(session) = self.sessions.get_mut(id) {
            if !session.snake.is_lost() {
                session.snake.mark_lost();
                info!("Player {} lost", id);
            }
            if is_host {
                self.host_lost = true;
            }
        }
    }

    /// Drops a player's session. A snake that leaves mid-game counts as
    /// lost; one that already won or lost keeps its result.
    pub fn remove_session(&mut self, id: PlayerId) -> Option<Session> {
        if self.is_active(id) {
            self.mark_lost(id);
        }
        let session = self.sessions.remove(id);
        if session.is_some() {
            info!("Removed player {}", id);
        }
        session
    }

    pub fn is_active(&self, id: PlayerId) -> bool {
        self.sessions.get(id).map_or(false, |s| s.is_active())
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn outcome(&self) -> Option<GameOverReason> {
        self.outcome
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            terrains: self.terrains.clone(),
            snakes: self
                .sessions
                .active()
                .map(|s| (s.id, s.snake.state()))
                .collect(),
            foods: self.foods.clone(),
            bonuses: self.bonuses.clone(),
            points_to_complete: self.points_to_complete,
            start_time: self.start_time,
        }
    }

    /// Queues each notice on its recipient's connection.
    pub fn dispatch(&self, notices: &[Notice]) {
        for notice in notices {
            match self.sessions.get(notice.to) {
                Some(session) => {
                    if !session
                        .outbound()
                        .notify(ServerMessage::GameOver(notice.reason))
                    {
                        debug!("Player {} left before hearing {}", notice.to, notice.reason);
                    }
                }
                None => warn!("No session for notice {} to {}", notice.reason, notice.to),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{join, level, world};
    use super::*;
    use shared::TerrainKind;

    #[test]
    fn test_empty_world_snapshot() {
        let level = level(vec![
            (TerrainKind::Wall, (400.0, 300.0)),
            (TerrainKind::SlowDown, (100.0, 100.0)),
        ]);
        let world = world(&level);

        let snapshot = world.snapshot();
        assert!(snapshot.snakes.is_empty());
        assert_eq!(snapshot.terrains, level.terrains());
        assert_eq!(snapshot.points_to_complete, 10);
        assert_eq!(snapshot.foods.len(), 1);
        assert!(snapshot.bonuses.is_empty());
    }

    #[test]
    fn test_join_spawns_at_left_edge_heading_right() {
        let mut world = world(&level(vec![]));
        let (id, _rx) = join(&mut world);

        let snapshot = world.snapshot();
        let snake = &snapshot.snakes[&id];
        assert_eq!(snake.direction, Direction::Right);
        assert_eq!(snake.head().unwrap().x, 2.0 * world.config.snake_size);
        assert_eq!(world.sessions.host(), Some(id));
    }

    #[test]
    fn test_spawn_avoids_walls_and_snakes() {
        let mut walls = Vec::new();
        let mut y = 25.0;
        while y < 300.0 {
            walls.push((TerrainKind::Wall, (28.0, y)));
            y += 50.0;
        }
        let mut world = world(&level(walls));

        for _ in 0..4 {
            join(&mut world);
        }

        let size = world.config.snake_size;
        for session in world.sessions.iter() {
            let hitbox = session.snake.head_hitbox();
            assert!(session.snake.head().y > 300.0);
            assert!(!world
                .terrains
                .iter()
                .any(|t| t.kind == TerrainKind::Wall && t.hitbox().overlaps(&hitbox)));
            for other in world.sessions.iter().filter(|o| o.id != session.id) {
                assert!(!other.snake.hits(&hitbox, 0), "spawn overlap with size {}", size);
            }
        }
    }

    #[test]
    fn test_removed_host_marks_host_lost() {
        let mut world = world(&level(vec![]));
        let (host, _rx_host) = join(&mut world);
        let (guest, _rx_guest) = join(&mut world);

        world.remove_session(guest);
        assert!(!world.host_lost);

        world.remove_session(host);
        assert!(world.host_lost);
        assert!(world.sessions.is_empty());
    }

    #[test]
    fn test_finished_player_leaving_keeps_result() {
        let mut world = world(&level(vec![]));
        let (_host, _rx_host) = join(&mut world);
        let (guest, _rx_guest) = join(&mut world);
        world
            .sessions
            .get_mut(guest)
            .unwrap()
            .set_outcome(GameOverReason::Win { winner: guest });

        let removed = world.remove_session(guest).unwrap();
        assert!(!removed.snake.is_lost());
        assert_eq!(removed.outcome(), Some(GameOverReason::Win { winner: guest }));
        assert!(!world.host_lost);
    }

    #[test]
    fn test_lost_snake_leaves_snapshot_and_ignores_steering() {
        let mut world = world(&level(vec![]));
        let (a, _rx_a) = join(&mut world);
        let (b, _rx_b) = join(&mut world);

        world.mark_lost(b);

        let snapshot = world.snapshot();
        assert!(snapshot.snakes.contains_key(&a));
        assert!(!snapshot.snakes.contains_key(&b));
        assert!(!world.steer(b, Direction::Up));
        assert!(world.steer(a, Direction::Up));
    }

    #[test]
    fn test_dispatch_queues_game_over() {
        let mut world = world(&level(vec![]));
        let (id, mut rx) = join(&mut world);

        world.dispatch(&[Notice {
            to: id,
            reason: GameOverReason::YouLost,
        }]);

        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::GameOver(GameOverReason::YouLost)
        );
    }
}
