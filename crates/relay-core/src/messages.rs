//! Event types used by the relay core.
//!
//! These are **transport-agnostic** logical events:
//! - [`InboundEvent`]: what a peer sends to the relay.
//! - [`OutboundEvent`]: what the relay sends to peers.
//! - [`Outbound`]: an outbound event plus who should receive it.
//!
//! Command and response payloads are opaque `serde_json::Value`s; the
//! relay never looks inside them.
//!
//! Note: the JSON-lines encoder lives in the `relay-protocol` crate;
//! this module is purely logical.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::ChannelId;

/// Name used when a computer registers without one.
pub const DEFAULT_NAME: &str = "Unknown PC";

/// OS used when a computer registers without one.
pub const DEFAULT_OS: &str = "Windows";

pub const DEFAULT_SCREEN_WIDTH: u32 = 1920;
pub const DEFAULT_SCREEN_HEIGHT: u32 = 1080;

/// A request from a peer channel into the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A computer announces itself (or re-announces under the same id).
    RegisterComputer(Registration),

    /// A client asks to be bound to a computer.
    ///
    /// `None` when the peer sent no usable id; that is treated as an
    /// unknown computer.
    ConnectToComputer { computer_id: Option<String> },

    /// An opaque command from a bound client.
    Command(Value),

    /// A computer answers a command for `client_id`.
    ///
    /// `client_id` is `None` when the peer sent something that is not a
    /// channel id; such responses are dropped.
    CommandResponse {
        client_id: Option<ChannelId>,
        response: Value,
    },

    /// Liveness refresh for the computer registered on this channel.
    Heartbeat,

    /// Application-level ping, answered with `pong`.
    Ping,
}

/// An event emitted by the relay towards one or all peers.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// Registration accepted under `computer_id`.
    Registered { computer_id: String },

    /// Client bound to `computer_id`; carries the computer's info.
    ConnectedToComputer {
        computer_id: String,
        info: ComputerInfo,
    },

    /// A local, non-fatal failure.
    Error { message: String },

    /// A relayed command, tagged with the originating client.
    Command { client_id: ChannelId, command: Value },

    /// A relayed response, verbatim.
    CommandResponse(Value),

    /// Current list of registered computer ids.
    ComputersUpdated { computers: Vec<String> },

    Pong,
}

impl OutboundEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Registered { .. } => "registered",
            OutboundEvent::ConnectedToComputer { .. } => "connected_to_computer",
            OutboundEvent::Error { .. } => "error",
            OutboundEvent::Command { .. } => "command",
            OutboundEvent::CommandResponse(_) => "command_response",
            OutboundEvent::ComputersUpdated { .. } => "computers_updated",
            OutboundEvent::Pong => "pong",
        }
    }

    /// Helper: build an `Error` event from anything displayable.
    pub fn error(message: impl ToString) -> Self {
        OutboundEvent::Error {
            message: message.to_string(),
        }
    }
}

/// Who an [`Outbound`] event is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// A single channel.
    Channel(ChannelId),

    /// Every connected channel, computers and clients alike.
    Everyone,
}

/// An outbound event together with its recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: Recipient,
    pub event: OutboundEvent,
}

impl Outbound {
    /// Unicast to a single channel.
    pub fn to(channel: ChannelId, event: OutboundEvent) -> Self {
        Outbound {
            to: Recipient::Channel(channel),
            event,
        }
    }

    /// Broadcast to every connected channel.
    pub fn everyone(event: OutboundEvent) -> Self {
        Outbound {
            to: Recipient::Everyone,
            event,
        }
    }
}

/// Descriptive info a computer supplies at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputerInfo {
    pub name: String,
    pub os: String,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl Default for ComputerInfo {
    fn default() -> Self {
        ComputerInfo {
            name: DEFAULT_NAME.to_string(),
            os: DEFAULT_OS.to_string(),
            screen_width: DEFAULT_SCREEN_WIDTH,
            screen_height: DEFAULT_SCREEN_HEIGHT,
        }
    }
}

/// Raw registration request, as far as the peer filled it in.
///
/// Every field is optional. Empty strings and zero sizes count as
/// missing and fall back to the defaults; registration never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    pub computer_id: Option<String>,
    pub name: Option<String>,
    pub os: Option<String>,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
}

impl Registration {
    /// The requested id, if it is usable.
    pub fn requested_id(&self) -> Option<&str> {
        self.computer_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Build the stored info, defaulting each field independently.
    pub fn info(&self) -> ComputerInfo {
        let defaults = ComputerInfo::default();
        ComputerInfo {
            name: non_empty(&self.name).unwrap_or(defaults.name),
            os: non_empty(&self.os).unwrap_or(defaults.os),
            screen_width: non_zero(self.screen_width).unwrap_or(defaults.screen_width),
            screen_height: non_zero(self.screen_height).unwrap_or(defaults.screen_height),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

fn non_zero(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v != 0)
}
