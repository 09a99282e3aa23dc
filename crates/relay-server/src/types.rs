//! Shared types for the relay TCP server.
//!
//! This module defines:
//! - channel aliases between connections and the relay task
//! - the connection table (channel id -> outbound line sender)
//! - `RelayRequest`: messages flowing into the relay task

use std::collections::HashMap;
use std::sync::Arc;

use relay_core::{ChannelId, ComputerSnapshot, InboundEvent};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, RwLock};

/// Outbound, already-encoded lines for a given connection.
///
/// Broadcasts encode once and share the same `Arc<str>`.
pub type OutboundTx = mpsc::UnboundedSender<Arc<str>>;
pub type OutboundRx = mpsc::UnboundedReceiver<Arc<str>>;

/// Every open connection, computers and clients alike.
///
/// - Key: `ChannelId`
/// - Value: `OutboundTx` feeding that connection's writer task.
pub type ConnectionTable = Arc<RwLock<HashMap<ChannelId, OutboundTx>>>;

/// Message flowing into the central relay task.
#[derive(Debug)]
pub enum RelayRequest {
    /// A decoded event from a connection.
    Event {
        channel: ChannelId,
        event: InboundEvent,
    },

    /// The connection is gone.
    Disconnected { channel: ChannelId },

    /// Periodic liveness sweep.
    Sweep,

    Snapshot {
        reply: oneshot::Sender<Vec<ComputerSnapshot>>,
    },

    Stats { reply: oneshot::Sender<RelayStats> },
}

/// Channel from connections / sweeper -> relay task.
pub type RelayTx = mpsc::UnboundedSender<RelayRequest>;
pub type RelayRx = mpsc::UnboundedReceiver<RelayRequest>;

/// Counts for status surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    pub computers: usize,
    pub clients: usize,
    pub connections: usize,
}
