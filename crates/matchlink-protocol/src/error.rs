//! Error types for the protocol layer.
//!
//! Decoding failures are split three ways so the caller can log something
//! useful: the bytes were not a message at all, the message was of a kind
//! we do not know, or it was a known kind with a required field missing.

/// Why an inbound payload could not be turned into an
/// [`InboundEvent`](crate::InboundEvent).
///
/// None of these are fatal to a session: the connection manager logs the
/// error and skips the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The `type` discriminator is absent, not a string, or not one we know.
    /// Holds the discriminator when there was one.
    #[error("unknown message type `{}`", .0.as_deref().unwrap_or("<missing>"))]
    UnknownType(Option<String>),

    /// The payload is not a well-formed structured message (bad JSON, not
    /// an object, or a field of the wrong shape).
    #[error("malformed message: {0}")]
    Malformed(String),

    /// A recognized message is missing a required field.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

/// Errors from the codec as a whole.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of an outbound message failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// An inbound message could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A map name outside the fixed map pool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown map `{0}`")]
pub struct UnknownMapError(pub String);
