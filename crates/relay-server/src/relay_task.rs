//! Central relay loop.
//!
//! This task owns the `Relay` (and with it the connection registry) and
//! processes every `RelayRequest` in arrival order. All registry
//! mutations, sweeps included, happen here and nowhere else.
//!
//! Routing policy:
//! - `Recipient::Channel` => unicast to that connection, if still open.
//! - `Recipient::Everyone` => every open connection.
//!
//! Sends are fire-and-forget: a closed connection just misses the event.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use relay_core::{ChannelId, ComputerSnapshot, Outbound, Recipient, Relay};
use relay_protocol::encode_outbound;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::types::{ConnectionTable, OutboundTx, RelayRequest, RelayRx, RelayStats, RelayTx};

/// Run the central relay processing loop until every sender is gone.
///
/// - `relay_rx`: receives requests from connections and the sweeper.
/// - `connections`: open connections and their outbound channels.
pub async fn run_relay_loop(mut relay_rx: RelayRx, connections: ConnectionTable, timeout: Duration) {
    let mut relay = Relay::new(timeout);

    while let Some(req) = relay_rx.recv().await {
        let outputs = match req {
            RelayRequest::Event { channel, event } => {
                debug!(channel = %channel, ?event, "inbound event");
                relay.process_event(channel, event, Instant::now())
            }
            RelayRequest::Disconnected { channel } => {
                let claimed = relay.registry().claimed_id(channel).map(str::to_string);
                let outputs = relay.disconnect(channel);
                if let Some(computer_id) = claimed {
                    info!(channel = %channel, %computer_id, "computer removed");
                }
                outputs
            }
            RelayRequest::Sweep => {
                let report = relay.sweep(Instant::now());
                for computer_id in &report.evicted {
                    info!(%computer_id, "computer timed out");
                }
                report.broadcast.into_iter().collect()
            }
            RelayRequest::Snapshot { reply } => {
                let _ = reply.send(relay.snapshot(Instant::now()));
                continue;
            }
            RelayRequest::Stats { reply } => {
                let open = connections.read().await.len();
                let registry = relay.registry();
                let _ = reply.send(RelayStats {
                    computers: registry.num_computers(),
                    clients: registry.num_clients(),
                    connections: open,
                });
                continue;
            }
        };

        if outputs.is_empty() {
            continue;
        }

        let guard = connections.read().await;
        for out in &outputs {
            route_output(out, &guard);
        }
    }

    info!("relay loop shutting down (relay_rx closed)");
}

/// Deliver a single `Outbound` to its recipient(s).
fn route_output(out: &Outbound, connections: &HashMap<ChannelId, OutboundTx>) {
    let line: Arc<str> = Arc::from(encode_outbound(&out.event));

    match out.to {
        Recipient::Channel(channel) => match connections.get(&channel) {
            Some(tx) => {
                let _ = tx.send(line);
            }
            None => debug!(channel = %channel, event = out.event.name(), "recipient gone, dropping"),
        },
        Recipient::Everyone => {
            for tx in connections.values() {
                let _ = tx.send(Arc::clone(&line));
            }
            debug!(event = out.event.name(), recipients = connections.len(), "broadcast");
        }
    }
}

/// Read-only access to the relay state, for status surfaces.
///
/// Requests are answered by the relay task itself, so every answer is a
/// consistent view. Nothing here can mutate the registry.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    relay_tx: RelayTx,
}

impl RelayHandle {
    pub(crate) fn new(relay_tx: RelayTx) -> Self {
        RelayHandle { relay_tx }
    }

    /// Every registered computer with its info and liveness.
    pub async fn snapshot(&self) -> anyhow::Result<Vec<ComputerSnapshot>> {
        let (reply, rx) = oneshot::channel();
        self.relay_tx
            .send(RelayRequest::Snapshot { reply })
            .map_err(|_| anyhow::anyhow!("relay task is not running"))?;
        rx.await.context("relay task dropped snapshot request")
    }

    /// Ids of computers currently reported online.
    pub async fn list_online(&self) -> anyhow::Result<Vec<String>> {
        Ok(self
            .snapshot()
            .await?
            .into_iter()
            .filter(|c| c.online)
            .map(|c| c.id)
            .collect())
    }

    /// Computer, client and connection counts.
    pub async fn stats(&self) -> anyhow::Result<RelayStats> {
        let (reply, rx) = oneshot::channel();
        self.relay_tx
            .send(RelayRequest::Stats { reply })
            .map_err(|_| anyhow::anyhow!("relay task is not running"))?;
        rx.await.context("relay task dropped stats request")
    }
}
