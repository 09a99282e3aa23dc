//! Configuration for the relay TCP server.
//!
//! Defaults can be overridden via environment variables:
//!
//! - `RELAY_BIND_ADDR`             (default: "0.0.0.0")
//! - `RELAY_PORT`, else `PORT`     (default: "3000")
//! - `RELAY_MAX_CONNECTIONS`       (default: "1024")
//! - `RELAY_SWEEP_INTERVAL_SECS`   (default: "10")
//! - `RELAY_COMPUTER_TIMEOUT_SECS` (default: "30")
//! - `RELAY_MAX_FRAME_BYTES`       (default: "5242880")

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on. `0` picks a free port.
    pub port: u16,

    /// Maximum number of simultaneously open connections.
    pub max_connections: usize,

    /// Period of the liveness sweep.
    pub sweep_interval: Duration,

    /// A computer without heartbeat for longer than this is evicted.
    /// Also the threshold for the `online` flag in snapshots.
    pub computer_timeout: Duration,

    /// Longest accepted line, in bytes.
    pub max_frame_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 3000,
            max_connections: 1024,
            sweep_interval: relay_core::DEFAULT_SWEEP_INTERVAL,
            computer_timeout: relay_core::DEFAULT_COMPUTER_TIMEOUT,
            max_frame_bytes: relay_protocol::DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        let bind_addr = env::var("RELAY_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port = if env::var("RELAY_PORT").is_ok() {
            read_env_or_default("RELAY_PORT", defaults.port)?
        } else {
            read_env_or_default("PORT", defaults.port)?
        };
        let max_connections = read_env_or_default("RELAY_MAX_CONNECTIONS", defaults.max_connections)?;
        let sweep_secs = read_env_or_default(
            "RELAY_SWEEP_INTERVAL_SECS",
            defaults.sweep_interval.as_secs(),
        )?;
        let timeout_secs = read_env_or_default(
            "RELAY_COMPUTER_TIMEOUT_SECS",
            defaults.computer_timeout.as_secs(),
        )?;
        let max_frame_bytes = read_env_or_default("RELAY_MAX_FRAME_BYTES", defaults.max_frame_bytes)?;

        anyhow::ensure!(sweep_secs > 0, "RELAY_SWEEP_INTERVAL_SECS must be positive");

        Ok(Config {
            bind_addr,
            port,
            max_connections,
            sweep_interval: Duration::from_secs(sweep_secs),
            computer_timeout: Duration::from_secs(timeout_secs),
            max_frame_bytes,
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {val:?}")),
        Err(_) => Ok(default),
    }
}
