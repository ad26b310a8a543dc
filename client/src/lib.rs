//! # Snake Game Client Library
//!
//! Client-side counterpart of the snake server. It speaks the framed TCP
//! protocol from [`shared::codec`] and never simulates anything itself: the
//! server is authoritative, and the client only steers and polls.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! Connection handling and the request/response cycle:
//! - Connecting and receiving the assigned player id
//! - Sending direction changes and disconnect notices
//! - Requesting snapshots, with any failure reported as `server_closed`
//!
//! ### Autopilot Module (`autopilot`)
//! Headless steering used by the bundled binary and by load tests.
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::network::{Client, Update};
//!
//! # async fn play() -> Result<(), shared::codec::ProtocolError> {
//! let mut client = Client::connect("127.0.0.1:5432").await?;
//! match client.request_game_state().await {
//!     Update::Snapshot(snapshot) => println!("{} snakes", snapshot.snakes.len()),
//!     Update::GameOver(reason) => println!("game over: {}", reason),
//! }
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod autopilot;
pub mod network;

pub use autopilot::Autopilot;
pub use network::{Client, Update};
