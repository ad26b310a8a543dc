//! Server network layer: TCP accept loop, per-connection handlers and the
//! fixed-rate simulation loop

use crate::session::{write_loop, Outbound, OutboundQueue};
use crate::world::{SharedWorld, World};
use log::{debug, error, info, warn};
use shared::codec;
use shared::{ClientMessage, PlayerId, ServerMessage};
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval, sleep, MissedTickBehavior};

pub const DEFAULT_PORT: u16 = 5432;
pub const LISTEN_BACKLOG: u32 = 5;

/// Consecutive accept failures tolerated before the listener is given up on.
const MAX_ACCEPT_FAILURES: u32 = 16;

/// Resolves once shutdown has been signalled or the signal sender is gone.
pub(crate) async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Cloneable trigger for a graceful stop of a running [`Server`]
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Main server coordinating connections and game simulation
pub struct Server {
    listener: TcpListener,
    world: SharedWorld,
    tick_duration: Duration,
    grace: Duration,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Server {
    pub async fn bind(addr: SocketAddr, world: World) -> io::Result<Self> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(LISTEN_BACKLOG)?;
        info!("Server listening on {}", listener.local_addr()?);

        let tick_duration = world.config().tick_duration();
        let grace = world.config().game_over_grace();
        let (shutdown, _) = watch::channel(false);

        Ok(Server {
            listener,
            world: world.into_shared(),
            tick_duration,
            grace,
            shutdown: Arc::new(shutdown),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn world(&self) -> SharedWorld {
        Arc::clone(&self.world)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown),
        }
    }

    /// Runs until the game ends or shutdown is requested.
    ///
    /// On return the listener is closed, every connection handler has
    /// finished and every session has been removed from the world.
    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let Server {
            listener,
            world,
            tick_duration,
            grace,
            shutdown,
        } = self;

        let acceptor = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&world),
            Arc::clone(&shutdown),
        ));
        let simulation = tokio::spawn(run_simulation(
            Arc::clone(&world),
            tick_duration,
            grace,
            Arc::clone(&shutdown),
        ));

        info!("Server started successfully");

        let simulated = simulation.await;
        shutdown.send_replace(true);
        let accepted = acceptor.await;

        simulated?;
        accepted??;
        info!("Server shut down");
        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    world: SharedWorld,
    shutdown: Arc<watch::Sender<bool>>,
) -> io::Result<()> {
    let mut shutdown_rx = shutdown.subscribe();
    let mut handlers = JoinSet::new();
    let mut failures = 0;

    let result = loop {
        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown_rx) => break Ok(()),

            Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                if let Err(e) = joined {
                    error!("Connection handler panicked: {}", e);
                }
            }

            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    failures = 0;
                    let (outbound, queue) = Outbound::channel();
                    // Joining in accept order keeps the first connection the host.
                    let id = {
                        let mut world = world.lock().await;
                        let id = world.allocate_id();
                        outbound.notify(ServerMessage::AssignId(id));
                        world.join(id, addr, outbound.clone());
                        id
                    };
                    info!("Client {} connected from {}", id, addr);
                    handlers.spawn(handle_connection(
                        id,
                        stream,
                        outbound,
                        queue,
                        Arc::clone(&world),
                        shutdown.subscribe(),
                    ));
                }
                Err(e) if failures < MAX_ACCEPT_FAILURES => {
                    failures += 1;
                    warn!("Error accepting connection: {}", e);
                    sleep(Duration::from_millis(10)).await;
                }
                Err(e) => {
                    error!("Listener failed: {}", e);
                    shutdown.send_replace(true);
                    break Err(e);
                }
            },
        }
    };

    drop(listener);
    debug!("Listener closed, waiting for {} handlers", handlers.len());
    while let Some(joined) = handlers.join_next().await {
        if let Err(e) = joined {
            error!("Connection handler panicked: {}", e);
        }
    }
    result
}

/// How a connection's read loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Goodbye,
    Closed,
    Inactive,
    Shutdown,
}

/// Serves one joined player until it leaves, drops or the server stops.
async fn handle_connection(
    id: PlayerId,
    stream: TcpStream,
    outbound: Outbound,
    queue: OutboundQueue,
    world: SharedWorld,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle for client {}: {}", id, e);
    }
    let (reader, writer) = stream.into_split();
    let writer_task = tokio::spawn(write_loop(id, writer, queue, shutdown.clone()));

    let mut reader = BufReader::new(reader);
    let exit = serve(id, &mut reader, &outbound, &world, &mut shutdown).await;
    debug!("Client {} read loop ended: {:?}", id, exit);

    world.lock().await.remove_session(id);
    drop(outbound);
    if let Err(e) = writer_task.await {
        error!("Writer for client {} panicked: {}", id, e);
    }
    info!("Client {} disconnected", id);
}

async fn serve(
    id: PlayerId,
    reader: &mut BufReader<OwnedReadHalf>,
    outbound: &Outbound,
    world: &SharedWorld,
    shutdown: &mut watch::Receiver<bool>,
) -> Exit {
    loop {
        let message = tokio::select! {
            _ = wait_for_shutdown(shutdown) => return Exit::Shutdown,
            message = codec::read_message::<ClientMessage, _>(reader) => message,
        };

        match message {
            Ok(ClientMessage::UpdateDirection {
                player_id,
                direction,
            }) => {
                if player_id != id {
                    debug!("Client {} sent direction for player {}", id, player_id);
                }
                world.lock().await.steer(id, direction);
            }
            Ok(ClientMessage::RequestSnapshot) => {
                let snapshot = world.lock().await.snapshot();
                if !outbound.reply(ServerMessage::Snapshot(snapshot)).await {
                    return Exit::Closed;
                }
            }
            Ok(ClientMessage::Disconnecting { .. }) => {
                info!("Client {} is leaving", id);
                return Exit::Goodbye;
            }
            Err(e) if e.is_disconnect() => return Exit::Closed,
            Err(e) => {
                warn!("Dropping client {}: {}", id, e);
                return Exit::Closed;
            }
        }

        if !world.lock().await.is_active(id) {
            return Exit::Inactive;
        }
    }
}

async fn run_simulation(
    world: SharedWorld,
    tick_duration: Duration,
    grace: Duration,
    shutdown: Arc<watch::Sender<bool>>,
) {
    let mut shutdown_rx = shutdown.subscribe();
    let mut ticker = interval(tick_duration);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let report_every = (Duration::from_secs(10).as_secs_f64() / tick_duration.as_secs_f64())
        .max(1.0) as u64;

    loop {
        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown_rx) => {
                info!("Simulation stopped by shutdown");
                return;
            }
            _ = ticker.tick() => {}
        }

        let outcome = {
            let mut world = world.lock().await;
            let notices = world.tick_now();
            world.dispatch(&notices);

            if world.tick_count() % report_every == 0 {
                debug!(
                    "Tick {}: {} players, {} active",
                    world.tick_count(),
                    world.sessions().len(),
                    world.sessions().active().count()
                );
            }
            world.outcome()
        };

        if let Some(reason) = outcome {
            info!("Game over ({}), stopping in {:?}", reason, grace);
            tokio::select! {
                _ = sleep(grace) => {}
                _ = wait_for_shutdown(&mut shutdown_rx) => {}
            }
            return;
        }
    }
}
