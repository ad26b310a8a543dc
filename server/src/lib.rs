//! # Snake Game Server Library
//!
//! This library provides the authoritative server for the multiplayer snake
//! game. It owns the canonical world, advances it at a fixed tick rate and
//! answers client requests over TCP using the framed protocol in
//! [`shared::codec`].
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Every game rule is decided here: movement, pickups, terrain effects,
//! collisions and the end of the game. Clients only steer and render the
//! snapshots they ask for.
//!
//! ### Session Management
//! Each accepted connection becomes a session with a player id (starting at
//! 0, never reused) and a snake. The first session to join is the host; the
//! game lasts exactly as long as the host is still playing.
//!
//! ### Game-Over Delivery
//! Outcomes are delivered once per player. A guest that loses is told
//! `you_lost`, a guest that reaches the points threshold is told it won and
//! leaves play, and anything that ends the host's game ends it for everyone.
//!
//! ## Concurrency Model
//!
//! All mutable game state sits behind a single async mutex ([`SharedWorld`]).
//! The simulation task takes it once per tick; connection handlers take it
//! briefly to steer, snapshot or leave. Nothing is ever written to a socket
//! while the lock is held: outgoing frames go onto a per-connection queue
//! drained by that connection's writer task.
//!
//! Shutdown is a `watch` channel. When it fires the acceptor closes the
//! listener, every handler unwinds and removes its session, and
//! [`Server::run`] returns only after all of them have finished.
//!
//! ## Module Organization
//!
//! - `config`: tunable constants and their JSON loader
//! - `level`: level files (win threshold, bonus kinds, terrain layout)
//! - `snake`: snake bodies, movement and steering
//! - `session`: player registry, host designation and outbound queues
//! - `world`: the shared world state and its player-facing operations
//! - `simulation`: the per-tick phases
//! - `network`: TCP listener, connection handlers and the tick loop

pub mod config;
pub mod level;
pub mod network;
pub mod session;
pub mod simulation;
pub mod snake;
pub mod utils;
pub mod world;

pub use config::{ConfigError, GameConfig};
pub use level::Level;
pub use network::{Server, ShutdownHandle, DEFAULT_PORT};
pub use world::{SharedWorld, World};
