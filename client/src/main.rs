use clap::Parser;
use client::network::describe_outcome;
use client::{Autopilot, Client, Update};
use log::{info, warn};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:5432")]
    server: String,

    /// Milliseconds between snapshot requests
    #[arg(short = 'p', long, default_value = "5")]
    poll_ms: u64,

    /// Seed for the autopilot's tie-breaking
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    info!("Connecting to: {}", args.server);

    let mut client = Client::connect(args.server.as_str()).await?;
    let me = client.player_id();
    let mut pilot = Autopilot::new(args.seed);

    let mut poll = interval(Duration::from_millis(args.poll_ms.max(1)));
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, leaving the game");
                client.disconnect().await?;
                return Ok(());
            }
            _ = poll.tick() => {}
        }

        match client.request_game_state().await {
            Update::GameOver(reason) => {
                println!("{}", describe_outcome(reason, me));
                return Ok(());
            }
            Update::Snapshot(snapshot) => {
                if let Some(direction) = pilot.choose_direction(&snapshot, me) {
                    if let Err(e) = client.update_direction(direction).await {
                        warn!("Failed to steer: {}", e);
                    }
                }
            }
        }
    }
}
