//! Membership-change notifications.

use crate::messages::{Outbound, OutboundEvent};
use crate::registry::ConnectionRegistry;

/// One `computers_updated` event for every connected channel, listing
/// the ids currently registered.
///
/// Fire-and-forget: no acknowledgment, no retry.
pub fn computers_changed(registry: &ConnectionRegistry) -> Outbound {
    Outbound::everyone(OutboundEvent::ComputersUpdated {
        computers: registry.computer_ids(),
    })
}
