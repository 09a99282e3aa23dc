//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Listens on the configured address/port.
//! - Accepts new TCP connections, up to `max_connections`.
//! - Assigns each connection a `ChannelId`.
//! - Spawns:
//!   - a per-connection task to handle I/O,
//!   - a single central relay task that owns the registry,
//!   - the sweeper driving liveness sweeps.
//!
//! Shutdown signals every connection, waits for them to close, stops the
//! sweeper and finally stops the relay task.
//!
//! The per-connection logic, relay loop and sweeper live in
//! `connection`, `relay_task` and `sweeper` respectively.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use relay_core::ChannelId;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::connection;
use crate::relay_task::{self, RelayHandle};
use crate::sweeper::{self, SweeperHandle};
use crate::types::{ConnectionTable, OutboundRx, OutboundTx, RelayRx, RelayTx};

/// Global-ish counter for assigning unique `ChannelId`s.
static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

fn next_channel_id() -> ChannelId {
    ChannelId(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
}

/// A bound, running relay: listener plus relay task and sweeper.
pub struct RelayServer {
    config: Config,
    listener: TcpListener,
    connections: ConnectionTable,
    relay_tx: RelayTx,
    relay_task: JoinHandle<()>,
    sweeper: SweeperHandle,

    /// Flipped to `true` on shutdown; every connection holds a receiver.
    shutdown_tx: watch::Sender<bool>,
}

impl RelayServer {
    /// Bind the listener and start the relay task and sweeper.
    pub async fn bind(config: Config) -> anyhow::Result<Self> {
        let addr = config.socket_addr_string();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(addr = %listener.local_addr()?, "listening");

        // Shared table of connections -> outbound channels.
        let connections: ConnectionTable = Arc::new(RwLock::new(Default::default()));

        // Channel from connections/sweeper -> relay task.
        let (relay_tx, relay_rx): (RelayTx, RelayRx) = mpsc::unbounded_channel();

        let relay_task = tokio::spawn(relay_task::run_relay_loop(
            relay_rx,
            connections.clone(),
            config.computer_timeout,
        ));
        let sweeper = sweeper::spawn_sweeper(relay_tx.clone(), config.sweep_interval);
        let (shutdown_tx, _) = watch::channel(false);

        Ok(RelayServer {
            config,
            listener,
            connections,
            relay_tx,
            relay_task,
            sweeper,
            shutdown_tx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Read-only status handle.
    pub fn handle(&self) -> RelayHandle {
        RelayHandle::new(self.relay_tx.clone())
    }

    /// Accept connections until `shutdown` resolves, then close every
    /// connection and stop the sweeper and the relay task. Handles from
    /// [`RelayServer::handle`] fail from then on.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        warn!(error = %err, "accept failed");
                        continue;
                    }
                },
            };

            let open = self.connections.read().await.len();
            if open >= self.config.max_connections {
                warn!(
                    %peer_addr,
                    max_connections = self.config.max_connections,
                    "rejecting connection: limit reached"
                );
                // Just drop the stream; the peer sees the connection closed.
                continue;
            }

            if let Err(err) = stream.set_nodelay(true) {
                warn!(%peer_addr, error = %err, "failed to set TCP_NODELAY");
            }

            let channel = next_channel_id();
            info!(channel = %channel, %peer_addr, "connection accepted");

            // Create outbound channel for this connection and register it.
            let (out_tx, out_rx): (OutboundTx, OutboundRx) = mpsc::unbounded_channel();
            self.connections.write().await.insert(channel, out_tx);

            let connections = self.connections.clone();
            let relay_tx = self.relay_tx.clone();
            let max_frame_bytes = self.config.max_frame_bytes;
            let shutdown_rx = self.shutdown_tx.subscribe();

            tokio::spawn(async move {
                match connection::run_connection(
                    channel,
                    stream.into_split(),
                    relay_tx,
                    out_rx,
                    connections,
                    max_frame_bytes,
                    shutdown_rx,
                )
                .await
                {
                    Ok(()) => info!(channel = %channel, "disconnected"),
                    Err(err) => warn!(channel = %channel, error = %err, "connection error"),
                }
            });
        }

        info!("shutting down");
        drop(self.listener);

        // Each connection drops its receiver once it has unregistered.
        self.shutdown_tx.send_replace(true);
        self.shutdown_tx.closed().await;

        self.sweeper.stop().await;

        // Status handles may still hold senders, so stop the task itself.
        drop(self.relay_tx);
        self.relay_task.abort();
        let _ = self.relay_task.await;

        info!("relay stopped");
        Ok(())
    }
}

/// Run the relay server with the given configuration until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let server = RelayServer::bind(config).await?;
    server
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
}
