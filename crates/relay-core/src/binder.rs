//! Session binding: client channel -> one computer id.
//!
//! A binding is only created against a computer that exists at bind
//! time. It is never cleared when that computer goes away; only the
//! client's own disconnect removes it.

use crate::channel::ChannelId;
use crate::error::RelayError;
use crate::messages::ComputerInfo;
use crate::registry::ConnectionRegistry;

/// Bind `client` to `computer_id`, replacing any previous binding.
///
/// Returns the computer's current info, or [`RelayError::NotFound`]
/// (with no state change) if the id is unknown.
pub fn bind(
    registry: &mut ConnectionRegistry,
    client: ChannelId,
    computer_id: &str,
) -> Result<ComputerInfo, RelayError> {
    let info = registry
        .computer(computer_id)
        .map(|entry| entry.info.clone())
        .ok_or(RelayError::NotFound)?;

    registry.insert_client(client, computer_id.to_string());
    Ok(info)
}

/// Computer id the client is bound to, if any.
pub fn lookup(registry: &ConnectionRegistry, client: ChannelId) -> Option<&str> {
    registry
        .client(client)
        .map(|entry| entry.bound_computer_id.as_str())
}

/// Remove the client's binding. Idempotent.
pub fn unbind(registry: &mut ConnectionRegistry, client: ChannelId) -> bool {
    registry.remove_client(client)
}
