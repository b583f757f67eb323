//! Error types for the session layer.

use crate::SessionState;

/// Why an intent was refused.
///
/// Intents are checked against the current state before anything is
/// written to the wire, so a refused intent never reaches the server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntentError {
    /// The intent makes no sense in the current state, e.g. leaving a queue
    /// the client is not in, or voting after a match was found.
    #[error("cannot {intent} while {state}")]
    InvalidState {
        state: SessionState,
        intent: &'static str,
    },

    /// There is no established connection to send on.
    #[error("not connected to the matchmaking server")]
    NotConnected,

    /// The vote named a map outside the map pool.
    #[error("unknown map `{0}`")]
    UnknownMap(String),
}

impl From<matchlink_protocol::UnknownMapError> for IntentError {
    fn from(err: matchlink_protocol::UnknownMapError) -> Self {
        Self::UnknownMap(err.0)
    }
}
