//! Relay coordinator.
//!
//! Owns the [`ConnectionRegistry`] and the [`LivenessMonitor`] and maps
//! every inbound event, disconnect and sweep onto them:
//! - `register_computer`   => registry insert, `registered` + one broadcast.
//! - `connect_to_computer` => session bind, `connected_to_computer` or `error`.
//! - `command`             => command relay to the bound computer, or `error`.
//! - `command_response`    => routed back to the named client, or dropped.
//! - `heartbeat`           => refresh of the channel's claimed computer.
//! - `ping`                => `pong`.
//!
//! The relay is a plain value with `&mut self` methods. Whoever owns it
//! serialises all mutations; in the server that is a single task.

use std::time::Duration;

use tokio::time::Instant;

use crate::binder;
use crate::broadcaster;
use crate::channel::ChannelId;
use crate::command_relay;
use crate::liveness::LivenessMonitor;
use crate::messages::{InboundEvent, Outbound, OutboundEvent, Registration};
use crate::registry::{ComputerSnapshot, ConnectionRegistry};

/// Result of one liveness sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    /// Evicted computer ids, sorted.
    pub evicted: Vec<String>,

    /// A single aggregated `computers_updated`, present iff something
    /// was evicted.
    pub broadcast: Option<Outbound>,
}

#[derive(Debug, Default)]
pub struct Relay {
    registry: ConnectionRegistry,
    monitor: LivenessMonitor,
}

impl Relay {
    /// Create a relay whose computers time out (and read as offline)
    /// after `timeout` without a heartbeat.
    pub fn new(timeout: Duration) -> Self {
        Relay {
            registry: ConnectionRegistry::new(timeout),
            monitor: LivenessMonitor::new(timeout),
        }
    }

    /// Process a single inbound event from `channel` and return the
    /// events to deliver.
    pub fn process_event(&mut self, channel: ChannelId, event: InboundEvent, now: Instant) -> Vec<Outbound> {
        match event {
            InboundEvent::RegisterComputer(registration) => {
                self.process_register(channel, registration, now)
            }
            InboundEvent::ConnectToComputer { computer_id } => {
                vec![self.process_connect(channel, computer_id)]
            }
            InboundEvent::Command(command) => vec![self.process_command(channel, command)],
            InboundEvent::CommandResponse { client_id, response } => client_id
                .and_then(|client| command_relay::route_response(&self.registry, client, response))
                .into_iter()
                .collect(),
            InboundEvent::Heartbeat => {
                self.process_heartbeat(channel, now);
                Vec::new()
            }
            InboundEvent::Ping => vec![Outbound::to(channel, OutboundEvent::Pong)],
        }
    }

    /// Handle the closing of `channel`.
    ///
    /// If the channel registered a computer, that id is removed and one
    /// broadcast goes out. A client entry is removed silently.
    pub fn disconnect(&mut self, channel: ChannelId) -> Vec<Outbound> {
        let mut outputs = Vec::new();

        if let Some(id) = self.registry.release_claim(channel) {
            self.registry.remove(&id);
            outputs.push(broadcaster::computers_changed(&self.registry));
        }

        binder::unbind(&mut self.registry, channel);

        outputs
    }

    /// Evict timed-out computers, with at most one broadcast.
    pub fn sweep(&mut self, now: Instant) -> SweepReport {
        let evicted = self.monitor.sweep(&mut self.registry, now);
        let broadcast = if evicted.is_empty() {
            None
        } else {
            Some(broadcaster::computers_changed(&self.registry))
        };

        SweepReport { evicted, broadcast }
    }

    /// Read-only snapshot of every computer.
    pub fn snapshot(&self, now: Instant) -> Vec<ComputerSnapshot> {
        self.registry.snapshot(now)
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    // -------------------------------------------------------------------------
    // Internal handlers
    // -------------------------------------------------------------------------

    fn process_register(&mut self, channel: ChannelId, registration: Registration, now: Instant) -> Vec<Outbound> {
        let computer_id = self.registry.register(channel, &registration, now);

        vec![
            Outbound::to(channel, OutboundEvent::Registered { computer_id }),
            broadcaster::computers_changed(&self.registry),
        ]
    }

    fn process_connect(&mut self, channel: ChannelId, computer_id: Option<String>) -> Outbound {
        let Some(computer_id) = computer_id else {
            return Outbound::to(channel, OutboundEvent::error(crate::RelayError::NotFound));
        };

        match binder::bind(&mut self.registry, channel, &computer_id) {
            Ok(info) => Outbound::to(
                channel,
                OutboundEvent::ConnectedToComputer { computer_id, info },
            ),
            Err(err) => Outbound::to(channel, OutboundEvent::error(err)),
        }
    }

    fn process_command(&mut self, channel: ChannelId, command: serde_json::Value) -> Outbound {
        command_relay::forward(&self.registry, channel, command)
            .unwrap_or_else(|err| Outbound::to(channel, OutboundEvent::error(err)))
    }

    fn process_heartbeat(&mut self, channel: ChannelId, now: Instant) {
        if let Some(id) = self.registry.claimed_id(channel).map(str::to_string) {
            self.registry.heartbeat(&id, now);
        }
    }
}
