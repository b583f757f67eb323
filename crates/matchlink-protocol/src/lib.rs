//! Wire protocol for matchlink.
//!
//! This crate defines the messages a matchmaking client and server
//! exchange, and owns every serialization concern:
//!
//! - **Types** ([`OutboundIntent`], [`InboundEvent`], [`PlayerEntry`],
//!   [`MapName`], [`MatchInfo`]): what travels on the wire.
//! - **Codec** ([`MessageCodec`] trait, [`JsonCodec`]): how those
//!   messages become bytes and back.
//! - **Errors** ([`DecodeError`], [`ProtocolError`]): what can go wrong.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw frames) and the
//! session state machine. It knows nothing about connections or session
//! state; downstream code only ever sees validated, typed values.
//!
//! ```text
//! Transport (bytes) → Protocol (InboundEvent) → Session (state machine)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{JsonCodec, MessageCodec};
pub use error::{DecodeError, ProtocolError, UnknownMapError};
pub use types::{InboundEvent, MapName, MatchInfo, OutboundIntent, PlayerEntry};
