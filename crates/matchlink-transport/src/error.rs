use std::time::Duration;

/// Why a connection attempt failed.
///
/// The variants are deliberately coarse: the presentation layer needs to
/// tell "try again later" apart from "your configuration is wrong", not to
/// inspect socket error codes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    /// Nothing answered at the address (refused, DNS failure, reset).
    #[error("server unreachable: {0}")]
    Unreachable(String),

    /// Something answered but refused the WebSocket upgrade.
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),

    /// The attempt did not finish within the caller's timeout.
    #[error("connection attempt timed out after {0:?}")]
    Timeout(Duration),

    /// The configured address cannot be dialed at all.
    #[error("invalid server address: {0}")]
    InvalidAddress(String),

    /// The attempt was abandoned before it finished, e.g. by a disconnect.
    #[error("connection attempt cancelled")]
    Cancelled,
}

impl ConnectError {
    /// Returns `true` if retrying the same address could succeed.
    ///
    /// A rejected handshake or a malformed address will fail the same way
    /// every time, so automatic reconnection gives up on those.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout(_))
    }
}

/// Errors on an already established connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
