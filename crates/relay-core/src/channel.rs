//! Channel identifiers.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Identifier for a connected peer channel.
///
/// This is intentionally opaque; the transport guarantees uniqueness
/// over the lifetime of the process. On the wire it is rendered as its
/// decimal string (`client_id`, default computer id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChannelId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(ChannelId)
    }
}
