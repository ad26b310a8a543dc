use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use server::{GameConfig, Level, Server, World, DEFAULT_PORT};
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Authoritative multiplayer snake server")]
struct Args {
    /// Server IP address or hostname to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Simulation ticks per second (overrides the config file)
    #[arg(short, long)]
    tick_rate: Option<u32>,

    /// Level file; the built-in level is used when omitted
    #[arg(short, long)]
    level: Option<PathBuf>,

    /// Game constants file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for item placement, for reproducible games
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(tick_rate) = args.tick_rate {
        config.tick_rate = tick_rate;
    }
    config.validate()?;

    let level = match &args.level {
        Some(path) => Level::load(path)?,
        None => Level::builtin()?,
    };

    let world = match args.seed {
        Some(seed) => World::with_rng(config, &level, StdRng::seed_from_u64(seed)),
        None => World::new(config, &level),
    };

    let addr = tokio::net::lookup_host((args.host.as_str(), args.port))
        .await?
        .next()
        .ok_or("host did not resolve to any address")?;
    let server = Server::bind(addr, world).await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            shutdown.shutdown();
        }
    });

    server.run().await
}
