//! Error types for the relay core.
//!
//! Every variant is local and non-fatal: the caller turns it into an
//! `error {message}` event for the offending channel and carries on.
//! The `Display` text is exactly the message peers receive.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Bind target has no computer entry.
    #[error("Computer not found or offline")]
    NotFound,

    /// Command sent by a channel that never bound to a computer.
    #[error("Not connected to any computer")]
    ClientNotBound,

    /// The bound computer has since been removed. The binding stays.
    #[error("Computer offline")]
    ComputerOffline,
}
