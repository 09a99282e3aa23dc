//! relay-server
//!
//! Multi-connection async TCP server brokering command sessions
//! between computers and clients.

pub mod config;
pub mod relay_task;
pub mod server;
pub mod types;

// these are internal modules, not re-exported
mod connection;
mod sweeper;

pub use relay_task::RelayHandle;
pub use server::RelayServer;
