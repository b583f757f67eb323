//! The session lifecycle states.

use std::fmt;

/// Where the client is in its matchmaking lifecycle.
///
/// ```text
///   Disconnected ──(connect)──→ Connecting ──(opened)──→ Idle
///        ↑                                               │  ↑
///        │                                       (join)  │  │ (leave)
///        │                                               ↓  │
///        └──────────(connection lost, any state)──────  Queued
///                                                        │
///                                          (matchCreated)│
///                                                        ↓
///                                                     Matched
/// ```
///
/// `Matched` is terminal for the session: a new client is needed to
/// matchmake again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Idle,
    Queued,
    Matched,
}

impl SessionState {
    /// Returns `true` while a connection to the server is established.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Idle | Self::Queued | Self::Matched)
    }

    /// Returns `true` in the states that accept server snapshots and votes.
    pub fn is_lobby(self) -> bool {
        matches!(self, Self::Idle | Self::Queued)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Matched => "matched",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_default_is_disconnected() {
        assert_eq!(SessionState::default(), SessionState::Disconnected);
    }

    #[test]
    fn test_session_state_is_connected() {
        assert!(!SessionState::Disconnected.is_connected());
        assert!(!SessionState::Connecting.is_connected());
        assert!(SessionState::Idle.is_connected());
        assert!(SessionState::Queued.is_connected());
        assert!(SessionState::Matched.is_connected());
    }

    #[test]
    fn test_session_state_is_lobby() {
        assert!(SessionState::Idle.is_lobby());
        assert!(SessionState::Queued.is_lobby());
        assert!(!SessionState::Matched.is_lobby());
        assert!(!SessionState::Connecting.is_lobby());
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Queued.to_string(), "queued");
        assert_eq!(SessionState::Disconnected.to_string(), "disconnected");
    }
}
