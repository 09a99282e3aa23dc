//! relay-core
//!
//! Pure relay logic between "computers" (control targets) and
//! "clients" (controllers):
//! - channel identifiers and logical inbound/outbound events
//! - the connection registry (computer + client entries)
//! - session binding, command relay, liveness sweep, broadcasts
//! - the [`Relay`] coordinator tying them together
//!
//! Nothing here does I/O. Every operation returns the [`Outbound`]
//! events its caller must deliver.

pub mod binder;
pub mod broadcaster;
pub mod channel;
pub mod command_relay;
pub mod error;
pub mod liveness;
pub mod messages;
pub mod registry;
pub mod relay;

pub use channel::ChannelId;
pub use error::RelayError;
pub use liveness::LivenessMonitor;

pub use messages::{
    ComputerInfo,
    InboundEvent,
    Outbound,
    OutboundEvent,
    Recipient,
    Registration,
};

pub use registry::{ClientEntry, ComputerEntry, ComputerSnapshot, ConnectionRegistry};
pub use relay::{Relay, SweepReport};

/// Default eviction / online threshold for computers.
pub const DEFAULT_COMPUTER_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Default period between liveness sweeps.
pub const DEFAULT_SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);
