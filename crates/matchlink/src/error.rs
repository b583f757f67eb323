//! Unified error type for the matchlink client.

use matchlink_protocol::ProtocolError;
use matchlink_session::IntentError;
use matchlink_transport::ConnectError;

/// Top-level error that wraps all crate-specific errors.
///
/// Every [`MatchmakingClient`](crate::MatchmakingClient) method returns this
/// one type. The `#[from]` attribute on each variant auto-generates `From`
/// impls, so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MatchlinkError {
    /// A connection attempt failed (unreachable, rejected, timed out).
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// An intent was refused before reaching the wire.
    #[error(transparent)]
    Intent(#[from] IntentError),

    /// A message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session driver task is gone; the client was shut down.
    #[error("matchmaking client is shut down")]
    ClientClosed,
}

impl MatchlinkError {
    /// The [`IntentError`] inside, if this is one.
    pub fn as_intent(&self) -> Option<&IntentError> {
        match self {
            Self::Intent(err) => Some(err),
            _ => None,
        }
    }

    /// The [`ConnectError`] inside, if this is one.
    pub fn as_connect(&self) -> Option<&ConnectError> {
        match self {
            Self::Connect(err) => Some(err),
            _ => None,
        }
    }
}
