//! Command and response forwarding.
//!
//! Payloads are opaque and forwarded as-is; size limits are the
//! transport's business.

use serde_json::Value;

use crate::binder;
use crate::channel::ChannelId;
use crate::error::RelayError;
use crate::messages::{Outbound, OutboundEvent};
use crate::registry::ConnectionRegistry;

/// Forward a client's command to the computer it is bound to.
///
/// - [`RelayError::ClientNotBound`] if the client never bound.
/// - [`RelayError::ComputerOffline`] if the bound computer is gone.
///   The stale binding is left in place.
pub fn forward(
    registry: &ConnectionRegistry,
    client: ChannelId,
    command: Value,
) -> Result<Outbound, RelayError> {
    let computer_id = binder::lookup(registry, client).ok_or(RelayError::ClientNotBound)?;
    let computer = registry
        .computer(computer_id)
        .ok_or(RelayError::ComputerOffline)?;

    Ok(Outbound::to(
        computer.channel,
        OutboundEvent::Command {
            client_id: client,
            command,
        },
    ))
}

/// Route a computer's response back to the client it names.
///
/// The id is trusted as supplied; no binding check is made. Returns
/// `None` (drop silently) when no such client entry exists.
pub fn route_response(
    registry: &ConnectionRegistry,
    client: ChannelId,
    response: Value,
) -> Option<Outbound> {
    registry
        .client(client)
        .map(|entry| Outbound::to(entry.channel, OutboundEvent::CommandResponse(response)))
}
