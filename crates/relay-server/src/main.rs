//! Command relay TCP server.

use relay_server::config::Config;
use relay_server::server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        max_connections = config.max_connections,
        sweep_interval_secs = config.sweep_interval.as_secs(),
        computer_timeout_secs = config.computer_timeout.as_secs(),
        "starting relay-server"
    );

    server::run(config).await
}
