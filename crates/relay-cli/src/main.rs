// crates/relay-cli/src/main.rs

mod client;
mod computer;
mod network;

use anyhow::Result;
use clap::{Parser, Subcommand};
use relay_core::Registration;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "relay-cli")]
#[clap(about = "Computer and client peers for the command relay")]
struct Cli {
    /// Relay server address
    #[clap(short, long, default_value = "127.0.0.1:3000")]
    server: String,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    #[clap(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Register as a computer and answer relayed commands
    Computer {
        /// Computer id (defaults to the relay-assigned channel id)
        #[clap(long)]
        id: Option<String>,

        /// Display name
        #[clap(long)]
        name: Option<String>,

        /// Operating system label
        #[clap(long, default_value = std::env::consts::OS)]
        os: String,

        #[clap(long)]
        screen_width: Option<u32>,

        #[clap(long)]
        screen_height: Option<u32>,

        /// Seconds between heartbeats
        #[clap(long, default_value = "10")]
        heartbeat_secs: u64,
    },

    /// Bind to a computer and send commands from stdin
    Client {
        /// Id of the computer to control
        computer_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for relayed traffic.
    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let (reader, writer) = network::connect(&cli.server).await?;

    match cli.mode {
        Mode::Computer {
            id,
            name,
            os,
            screen_width,
            screen_height,
            heartbeat_secs,
        } => {
            let registration = Registration {
                computer_id: id,
                name,
                os: Some(os),
                screen_width,
                screen_height,
            };
            anyhow::ensure!(heartbeat_secs > 0, "--heartbeat-secs must be positive");
            computer::run(reader, writer, registration, Duration::from_secs(heartbeat_secs)).await
        }
        Mode::Client { computer_id } => client::run(reader, writer, computer_id).await,
    }
}
