//! JSON envelope codec.
//!
//! Every frame is one JSON object on one line:
//!
//! - `{"event": <name>, "data": <payload>}`
//! - `data` is omitted when the payload is `null` (e.g. `pong`,
//!   `heartbeat`, `ping`) and treated as `null` when absent.
//!
//! Inbound (peer -> relay) decoding is deliberately lenient: registration
//! fields of the wrong type are dropped and later defaulted, ids that do
//! not parse become `None`. Outbound decoding (used by peers) is strict.
//!
//! Event names:
//!
//! | Direction | Events |
//! |-----------|--------|
//! | inbound   | `register_computer`, `connect_to_computer`, `command`, `command_response`, `heartbeat`, `ping` |
//! | outbound  | `registered`, `connected_to_computer`, `error`, `command`, `command_response`, `computers_updated`, `pong` |

use relay_core::{ChannelId, ComputerInfo, InboundEvent, OutboundEvent, Registration};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame has no \"event\" name")]
    MissingEvent,

    #[error("unknown event {0:?}")]
    UnknownEvent(String),

    #[error("invalid field {0:?}")]
    InvalidField(&'static str),

    #[error("frame exceeds {limit} bytes")]
    FrameTooLong { limit: usize },
}

// -----------------------------------------------------------------------------
// Envelope helpers
// -----------------------------------------------------------------------------

fn envelope(event: &str, data: Value) -> String {
    let mut map = Map::with_capacity(2);
    map.insert("event".to_string(), Value::String(event.to_string()));
    if !data.is_null() {
        map.insert("data".to_string(), data);
    }
    Value::Object(map).to_string()
}

/// Split a line into `(event name, data)`.
fn open_envelope(line: &str) -> Result<(String, Value), ProtocolError> {
    let mut value: Value = serde_json::from_str(line)?;
    let event = value
        .get("event")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ProtocolError::MissingEvent)?;
    let data = value
        .get_mut("data")
        .map(Value::take)
        .unwrap_or(Value::Null);

    Ok((event, data))
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}

fn u32_field(data: &Value, key: &str) -> Option<u32> {
    data.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

/// A computer id given as a string or a number. `0` reads as absent,
/// so the registering channel's own id is used instead.
fn id_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts `"17"` as well as `17`.
fn channel_field(data: &Value, key: &str) -> Option<ChannelId> {
    match data.get(key)? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().map(ChannelId),
        _ => None,
    }
}

// -----------------------------------------------------------------------------
// Inbound: peer -> relay
// -----------------------------------------------------------------------------

/// Decode one inbound line.
pub fn decode_inbound(line: &str) -> Result<InboundEvent, ProtocolError> {
    let (event, data) = open_envelope(line)?;

    let msg = match event.as_str() {
        "register_computer" => InboundEvent::RegisterComputer(Registration {
            computer_id: id_field(&data, "computer_id"),
            name: str_field(&data, "name"),
            os: str_field(&data, "os"),
            screen_width: u32_field(&data, "screen_width"),
            screen_height: u32_field(&data, "screen_height"),
        }),
        "connect_to_computer" => InboundEvent::ConnectToComputer {
            computer_id: str_field(&data, "computer_id"),
        },
        "command" => InboundEvent::Command(data),
        "command_response" => InboundEvent::CommandResponse {
            client_id: channel_field(&data, "client_id"),
            response: data.get("response").cloned().unwrap_or(Value::Null),
        },
        "heartbeat" => InboundEvent::Heartbeat,
        "ping" => InboundEvent::Ping,
        _ => return Err(ProtocolError::UnknownEvent(event)),
    };

    Ok(msg)
}

/// Encode one inbound event (peer side).
pub fn encode_inbound(msg: &InboundEvent) -> String {
    match msg {
        InboundEvent::RegisterComputer(reg) => {
            let mut data = Map::new();
            if let Some(id) = &reg.computer_id {
                data.insert("computer_id".into(), json!(id));
            }
            if let Some(name) = &reg.name {
                data.insert("name".into(), json!(name));
            }
            if let Some(os) = &reg.os {
                data.insert("os".into(), json!(os));
            }
            if let Some(w) = reg.screen_width {
                data.insert("screen_width".into(), json!(w));
            }
            if let Some(h) = reg.screen_height {
                data.insert("screen_height".into(), json!(h));
            }
            envelope("register_computer", Value::Object(data))
        }
        InboundEvent::ConnectToComputer { computer_id } => {
            envelope("connect_to_computer", json!({ "computer_id": computer_id }))
        }
        InboundEvent::Command(command) => envelope("command", command.clone()),
        InboundEvent::CommandResponse { client_id, response } => envelope(
            "command_response",
            json!({
                "client_id": client_id.map(|id| id.to_string()),
                "response": response,
            }),
        ),
        InboundEvent::Heartbeat => envelope("heartbeat", Value::Null),
        InboundEvent::Ping => envelope("ping", Value::Null),
    }
}

// -----------------------------------------------------------------------------
// Outbound: relay -> peer
// -----------------------------------------------------------------------------

/// Encode one outbound event (relay side).
pub fn encode_outbound(msg: &OutboundEvent) -> String {
    let data = match msg {
        OutboundEvent::Registered { computer_id } => json!({ "computer_id": computer_id }),
        OutboundEvent::ConnectedToComputer { computer_id, info } => {
            json!({ "computer_id": computer_id, "info": info })
        }
        OutboundEvent::Error { message } => json!({ "message": message }),
        OutboundEvent::Command { client_id, command } => json!({
            "client_id": client_id.to_string(),
            "command": command,
        }),
        OutboundEvent::CommandResponse(response) => response.clone(),
        OutboundEvent::ComputersUpdated { computers } => json!({ "computers": computers }),
        OutboundEvent::Pong => Value::Null,
    };

    envelope(msg.name(), data)
}

#[derive(Deserialize)]
struct ComputerIdData {
    computer_id: String,
}

#[derive(Deserialize)]
struct ConnectedData {
    computer_id: String,
    info: ComputerInfo,
}

#[derive(Deserialize)]
struct ErrorData {
    message: String,
}

#[derive(Deserialize)]
struct CommandData {
    client_id: String,
    #[serde(default)]
    command: Value,
}

#[derive(Deserialize)]
struct ComputersData {
    computers: Vec<String>,
}

/// Decode one outbound line (peer side).
pub fn decode_outbound(line: &str) -> Result<OutboundEvent, ProtocolError> {
    let (event, data) = open_envelope(line)?;

    let msg = match event.as_str() {
        "registered" => {
            let d: ComputerIdData = serde_json::from_value(data)?;
            OutboundEvent::Registered {
                computer_id: d.computer_id,
            }
        }
        "connected_to_computer" => {
            let d: ConnectedData = serde_json::from_value(data)?;
            OutboundEvent::ConnectedToComputer {
                computer_id: d.computer_id,
                info: d.info,
            }
        }
        "error" => {
            let d: ErrorData = serde_json::from_value(data)?;
            OutboundEvent::Error { message: d.message }
        }
        "command" => {
            let d: CommandData = serde_json::from_value(data)?;
            let client_id = d
                .client_id
                .parse()
                .map_err(|_| ProtocolError::InvalidField("client_id"))?;
            OutboundEvent::Command {
                client_id,
                command: d.command,
            }
        }
        "command_response" => OutboundEvent::CommandResponse(data),
        "computers_updated" => {
            let d: ComputersData = serde_json::from_value(data)?;
            OutboundEvent::ComputersUpdated {
                computers: d.computers,
            }
        }
        "pong" => OutboundEvent::Pong,
        _ => return Err(ProtocolError::UnknownEvent(event)),
    };

    Ok(msg)
}
