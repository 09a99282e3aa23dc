//! relay-protocol
//!
//! Wire-level encoding/decoding for the command relay.
//!
//! This crate turns logical relay events
//! (`relay_core::InboundEvent` / `OutboundEvent`) into newline-delimited
//! JSON envelopes and back again:
//!
//! ```text
//! {"event":"register_computer","data":{"computer_id":"office-pc","name":"Office"}}
//! {"event":"computers_updated","data":{"computers":["office-pc"]}}
//! {"event":"pong"}
//! ```
//!
//! - [`json_codec`] : envelope encoding for both directions
//! - [`framing`]    : bounded newline framing over a byte buffer

pub mod framing;
pub mod json_codec;

pub use framing::LineFramer;
pub use json_codec::{
    decode_inbound,
    decode_outbound,
    encode_inbound,
    encode_outbound,
    ProtocolError,
};

/// Default per-line size cap (5 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 5 * 1024 * 1024;
