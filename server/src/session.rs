//! Connected players and their outbound queues
//!
//! This module tracks the server side of every connection:
//! - Player id allocation (monotonic, starting at 0, never reused)
//! - Host designation (the first session ever registered)
//! - The per-connection outbound queue used by every task that sends to
//!   a client
//!
//! Frames for one client are only ever written by that connection's writer
//! task. The queue has two bounded lanes:
//! - replies (snapshots) requested by the client, which the handler waits
//!   on when full, so a client that stops reading only stalls its own
//!   handler
//! - notices (the assigned id and the game-over message), queued without
//!   waiting and written ahead of any pending replies
//!
//! Snapshot replies from the handler and game-over notices from the
//! simulation therefore never interleave on the wire.

use crate::snake::Snake;
use log::{debug, warn};
use shared::codec;
use shared::{GameOverReason, PlayerId, ServerMessage};
use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tokio::sync::{mpsc, watch};

/// Snapshot replies a connection may have waiting to be written.
pub const REPLY_BACKLOG: usize = 8;

/// A connection is owed its id and at most one game-over message.
const NOTICE_BACKLOG: usize = 4;

/// Sending half of a connection's frame queue
#[derive(Clone)]
pub struct Outbound {
    replies: mpsc::Sender<ServerMessage>,
    notices: mpsc::Sender<ServerMessage>,
}

/// Receiving half of a connection's frame queue, owned by the writer task
#[derive(Debug)]
pub struct OutboundQueue {
    replies: mpsc::Receiver<ServerMessage>,
    notices: mpsc::Receiver<ServerMessage>,
}

impl Outbound {
    /// Creates a queue and returns the receiving end for the writer task.
    pub fn channel() -> (Self, OutboundQueue) {
        let (replies_tx, replies_rx) = mpsc::channel(REPLY_BACKLOG);
        let (notices_tx, notices_rx) = mpsc::channel(NOTICE_BACKLOG);
        (
            Self {
                replies: replies_tx,
                notices: notices_tx,
            },
            OutboundQueue {
                replies: replies_rx,
                notices: notices_rx,
            },
        )
    }

    /// Queues a reply, waiting while the backlog is full. Returns false once
    /// the writer task has gone away.
    pub async fn reply(&self, message: ServerMessage) -> bool {
        self.replies.send(message).await.is_ok()
    }

    /// Queues a notice without waiting. Returns false if it was not queued.
    pub fn notify(&self, message: ServerMessage) -> bool {
        match self.notices.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                warn!("Notice queue full, dropping {:?}", message);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Replies queued but not yet written.
    pub fn backlog(&self) -> usize {
        self.replies.max_capacity() - self.replies.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.notices.is_closed()
    }
}

impl fmt::Debug for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outbound")
            .field("backlog", &self.backlog())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl OutboundQueue {
    /// Next frame to write, notices first. `None` once every [`Outbound`]
    /// is dropped and both lanes are drained.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        tokio::select! {
            biased;
            Some(message) = self.notices.recv() => Some(message),
            Some(message) = self.replies.recv() => Some(message),
            else => None,
        }
    }

    pub fn try_recv(&mut self) -> Result<ServerMessage, TryRecvError> {
        match self.notices.try_recv() {
            Ok(message) => Ok(message),
            Err(_) => self.replies.try_recv(),
        }
    }
}

/// Drains a connection's queue onto its socket
///
/// Runs until every [`Outbound`] for the connection is dropped, a write
/// fails, or shutdown is signalled. The write half is shut down on exit.
pub async fn write_loop<W>(
    id: PlayerId,
    mut writer: W,
    mut queue: OutboundQueue,
    mut shutdown: watch::Receiver<bool>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let message = tokio::select! {
            message = queue.recv() => match message {
                Some(message) => message,
                None => break,
            },
            _ = crate::network::wait_for_shutdown(&mut shutdown) => break,
        };

        let result = tokio::select! {
            result = codec::write_message(&mut writer, &message) => result,
            _ = crate::network::wait_for_shutdown(&mut shutdown) => break,
        };
        if let Err(e) = result {
            warn!("Failed to send to client {}: {}", id, e);
            break;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("Closing write half for client {}: {}", id, e);
    }
}

/// A registered player
#[derive(Debug)]
pub struct Session {
    pub id: PlayerId,
    pub addr: SocketAddr,
    pub snake: Snake,
    outbound: Outbound,
    /// Final notice delivered to this player, if any.
    outcome: Option<GameOverReason>,
}

impl Session {
    pub fn new(id: PlayerId, addr: SocketAddr, snake: Snake, outbound: Outbound) -> Self {
        Self {
            id,
            addr,
            snake,
            outbound,
            outcome: None,
        }
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    /// Still competing: not lost and not yet told the game is over for them.
    pub fn is_active(&self) -> bool {
        !self.snake.is_lost() && self.outcome.is_none()
    }

    pub fn outcome(&self) -> Option<GameOverReason> {
        self.outcome
    }

    pub fn set_outcome(&mut self, reason: GameOverReason) {
        self.outcome = Some(reason);
    }
}

/// Every live session keyed by player id
///
/// Iteration is in ascending id order, which the simulation relies on to
/// resolve simultaneous pickups in favour of the lowest id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<PlayerId, Session>,
    next_id: PlayerId,
    host: Option<PlayerId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next player id. Ids are never handed out twice.
    pub fn allocate_id(&mut self) -> PlayerId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Registers a session. The first session ever registered becomes host.
    pub fn insert(&mut self, session: Session) {
        if self.host.is_none() {
            self.host = Some(session.id);
        }
        self.sessions.insert(session.id, session);
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn host(&self) -> Option<PlayerId> {
        self.host
    }

    pub fn is_host(&self, id: PlayerId) -> bool {
        self.host == Some(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> + '_ {
        self.sessions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> + '_ {
        self.sessions.values_mut()
    }

    pub fn active(&self) -> impl Iterator<Item = &Session> + '_ {
        self.iter().filter(|s| s.is_active())
    }
}
