//! In-memory connection registry.
//!
//! Owns the two process-wide stores:
//! - computers, keyed by computer id (unique at any instant),
//! - clients, keyed by their own channel id.
//!
//! plus, per channel, the last computer id that channel registered.
//! That "claim" is what heartbeats and disconnects act on. A second
//! registration under an existing id overwrites the entry
//! (last-writer-wins) without touching the earlier channel's claim, so
//! the earlier channel can still refresh or remove the new entry.
//!
//! The registry is pure state + accessors. Broadcasting on membership
//! changes is the caller's job (see [`crate::relay::Relay`]).

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::channel::ChannelId;
use crate::messages::{ComputerInfo, Registration};

/// A registered computer.
#[derive(Debug, Clone)]
pub struct ComputerEntry {
    pub id: String,

    /// Channel that currently owns this id.
    pub channel: ChannelId,

    pub info: ComputerInfo,

    /// Last registration or heartbeat. Drives liveness.
    pub last_seen: Instant,

    /// Wall-clock time of `last_seen`, for reporting only.
    pub last_seen_at: DateTime<Utc>,
}

/// A client that has bound to a computer.
///
/// The bound id may name a computer that no longer exists; that stale
/// state is only surfaced when the client next sends a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEntry {
    pub channel: ChannelId,
    pub bound_computer_id: String,
}

/// Read-only view of one computer, for status surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputerSnapshot {
    pub id: String,
    #[serde(flatten)]
    pub info: ComputerInfo,

    /// Wall-clock time of the last registration or heartbeat, as epoch
    /// milliseconds on the wire.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_seen: DateTime<Utc>,

    /// Milliseconds since the last registration or heartbeat.
    pub idle_ms: u64,

    /// `idle < online threshold`. May read `false` for an entry the
    /// next sweep has not evicted yet.
    pub online: bool,
}

#[derive(Debug)]
pub struct ConnectionRegistry {
    computers: HashMap<String, ComputerEntry>,
    clients: HashMap<ChannelId, ClientEntry>,

    /// Channel -> last computer id it registered.
    claims: HashMap<ChannelId, String>,

    online_threshold: Duration,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        ConnectionRegistry::new(crate::DEFAULT_COMPUTER_TIMEOUT)
    }
}

impl ConnectionRegistry {
    /// Create an empty registry reporting computers idle for less than
    /// `online_threshold` as online.
    pub fn new(online_threshold: Duration) -> Self {
        ConnectionRegistry {
            computers: HashMap::new(),
            clients: HashMap::new(),
            claims: HashMap::new(),
            online_threshold,
        }
    }

    // -------------------------------------------------------------------------
    // Computers
    // -------------------------------------------------------------------------

    /// Insert or overwrite a computer entry and return its id.
    ///
    /// The id defaults to the registering channel's own id. The channel
    /// now claims that id, replacing any earlier claim it held.
    pub fn register(&mut self, channel: ChannelId, registration: &Registration, now: Instant) -> String {
        let id = registration
            .requested_id()
            .map(str::to_string)
            .unwrap_or_else(|| channel.to_string());

        let entry = ComputerEntry {
            id: id.clone(),
            channel,
            info: registration.info(),
            last_seen: now,
            last_seen_at: Utc::now(),
        };
        self.computers.insert(id.clone(), entry);
        self.claims.insert(channel, id.clone());

        id
    }

    /// Refresh `last_seen`. Unknown ids are ignored.
    pub fn heartbeat(&mut self, id: &str, now: Instant) {
        if let Some(entry) = self.computers.get_mut(id) {
            entry.last_seen = now;
            entry.last_seen_at = Utc::now();
        }
    }

    /// Delete a computer entry. Returns whether one was present.
    pub fn remove(&mut self, id: &str) -> bool {
        self.computers.remove(id).is_some()
    }

    pub fn computer(&self, id: &str) -> Option<&ComputerEntry> {
        self.computers.get(id)
    }

    /// Ids of every registered computer, sorted.
    pub fn computer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.computers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Ids of computers idle for longer than `timeout`.
    pub fn stale_ids(&self, now: Instant, timeout: Duration) -> Vec<String> {
        let mut ids: Vec<String> = self
            .computers
            .values()
            .filter(|entry| now.saturating_duration_since(entry.last_seen) > timeout)
            .map(|entry| entry.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Snapshot of every computer, sorted by id.
    pub fn snapshot(&self, now: Instant) -> Vec<ComputerSnapshot> {
        let mut list: Vec<ComputerSnapshot> = self
            .computers
            .values()
            .map(|entry| {
                let idle = now.saturating_duration_since(entry.last_seen);
                ComputerSnapshot {
                    id: entry.id.clone(),
                    info: entry.info.clone(),
                    last_seen: entry.last_seen_at,
                    idle_ms: idle.as_millis() as u64,
                    online: idle < self.online_threshold,
                }
            })
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    pub fn num_computers(&self) -> usize {
        self.computers.len()
    }

    // -------------------------------------------------------------------------
    // Claims
    // -------------------------------------------------------------------------

    /// Computer id last registered by `channel`, if any.
    pub fn claimed_id(&self, channel: ChannelId) -> Option<&str> {
        self.claims.get(&channel).map(String::as_str)
    }

    /// Drop the channel's claim and return the id it held.
    pub fn release_claim(&mut self, channel: ChannelId) -> Option<String> {
        self.claims.remove(&channel)
    }

    // -------------------------------------------------------------------------
    // Clients
    // -------------------------------------------------------------------------

    /// Insert or overwrite the client entry for `channel`.
    pub fn insert_client(&mut self, channel: ChannelId, computer_id: String) {
        self.clients.insert(
            channel,
            ClientEntry {
                channel,
                bound_computer_id: computer_id,
            },
        );
    }

    pub fn client(&self, channel: ChannelId) -> Option<&ClientEntry> {
        self.clients.get(&channel)
    }

    /// Delete the client entry. Returns whether one was present.
    pub fn remove_client(&mut self, channel: ChannelId) -> bool {
        self.clients.remove(&channel).is_some()
    }

    pub fn num_clients(&self) -> usize {
        self.clients.len()
    }
}
