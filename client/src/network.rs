use log::{debug, info, warn};
use shared::codec::{self, ProtocolError};
use shared::{ClientMessage, Direction, GameOverReason, PlayerId, ServerMessage, WorldSnapshot};
use std::io;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

/// What a poll of the server produced
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Snapshot(WorldSnapshot),
    GameOver(GameOverReason),
}

/// Human-readable line for a game-over reason.
pub fn describe_outcome(reason: GameOverReason, me: PlayerId) -> String {
    match reason {
        GameOverReason::YouLost => "You lost!".to_string(),
        GameOverReason::HostLost => "The host lost, game over.".to_string(),
        GameOverReason::Win { winner } if winner == me => "You won!".to_string(),
        GameOverReason::Win { winner } => format!("Player {} won.", winner),
        GameOverReason::ServerClosed => "The server closed the connection.".to_string(),
    }
}

pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    player_id: PlayerId,
    connected: bool,
}

impl Client {
    /// Connects and waits for the server to assign a player id.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let player_id = match codec::read_message::<ServerMessage, _>(&mut reader).await? {
            ServerMessage::AssignId(id) => id,
            other => {
                return Err(ProtocolError::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected a player id, got {:?}", other),
                )))
            }
        };
        info!("Connected as player {}", player_id);

        Ok(Client {
            reader,
            writer,
            player_id,
            connected: true,
        })
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send(&mut self, message: &ClientMessage) -> Result<(), ProtocolError> {
        if !self.connected {
            return Err(ProtocolError::Io(io::ErrorKind::NotConnected.into()));
        }
        let result = codec::write_message(&mut self.writer, message).await;
        if result.is_err() {
            self.connected = false;
        }
        result
    }

    pub async fn update_direction(&mut self, direction: Direction) -> Result<(), ProtocolError> {
        let message = ClientMessage::UpdateDirection {
            player_id: self.player_id,
            direction,
        };
        self.send(&message).await
    }

    /// Reads the next server frame. Any transport or protocol failure is
    /// reported as the server having closed.
    pub async fn next_update(&mut self) -> Update {
        loop {
            match codec::read_message::<ServerMessage, _>(&mut self.reader).await {
                Ok(ServerMessage::Snapshot(snapshot)) => return Update::Snapshot(snapshot),
                Ok(ServerMessage::GameOver(reason)) => return Update::GameOver(reason),
                Ok(ServerMessage::AssignId(id)) => {
                    warn!("Ignoring repeated player id {}", id);
                }
                Err(e) => {
                    debug!("Connection lost: {}", e);
                    self.connected = false;
                    return Update::GameOver(GameOverReason::ServerClosed);
                }
            }
        }
    }

    /// Asks for a snapshot and returns the first update that arrives.
    ///
    /// A game-over notice queued ahead of the snapshot is returned instead.
    pub async fn request_game_state(&mut self) -> Update {
        if let Err(e) = self.send(&ClientMessage::RequestSnapshot).await {
            debug!("Snapshot request failed: {}", e);
            return Update::GameOver(GameOverReason::ServerClosed);
        }
        self.next_update().await
    }

    /// Tells the server we are leaving and closes our side.
    pub async fn disconnect(mut self) -> Result<(), ProtocolError> {
        let message = ClientMessage::Disconnecting {
            player_id: self.player_id,
        };
        self.send(&message).await?;
        self.writer.shutdown().await?;
        info!("Disconnected");
        Ok(())
    }
}
