//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// ReconnectPolicy
// ---------------------------------------------------------------------------

/// How the client retries after an unexpected connection loss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Retries before giving up. 0 disables automatic reconnection.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff_base: Duration,
    /// Upper bound for the doubled delay (jitter is added on top).
    pub max_backoff: Duration,
    /// Random extra delay, uniformly drawn from `0..jitter`, so clients that
    /// lost the same server do not all come back in the same instant.
    pub jitter: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            jitter: Duration::from_millis(250),
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never reconnects on its own.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }

    /// Returns `true` if automatic reconnection is on.
    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// Everything the client needs to know before it starts.
///
/// Serializable so a host application can keep it in its own config file.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use matchlink::{ClientConfig, ReconnectPolicy};
///
/// let config = ClientConfig::new("localhost:3000")
///     .with_connect_timeout(Duration::from_secs(3))
///     .with_reconnect(ReconnectPolicy::disabled());
/// assert_eq!(config.server_addr, "localhost:3000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// `host:port` or a full `ws://` URL. `wss://` is rejected at dial time
    /// because TLS is not compiled in.
    pub server_addr: String,
    /// Upper bound for one connection attempt, handshake included.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
    /// Capacity of the command channel into the session driver.
    #[serde(default = "default_command_channel_capacity")]
    pub command_channel_capacity: usize,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_command_channel_capacity() -> usize {
    64
}

impl ClientConfig {
    /// Creates a config for `server_addr` with default settings.
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            connect_timeout: default_connect_timeout(),
            reconnect: ReconnectPolicy::default(),
            command_channel_capacity: default_command_channel_capacity(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_command_channel_capacity(mut self, capacity: usize) -> Self {
        self.command_channel_capacity = capacity;
        self
    }

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`MatchmakingClient::start`](crate::MatchmakingClient::start). Rules:
    /// - `command_channel_capacity` raised to at least 1.
    /// - `connect_timeout` of zero replaced by the default.
    /// - `max_backoff` raised to at least `backoff_base`.
    pub fn validated(mut self) -> Self {
        if self.command_channel_capacity == 0 {
            warn!("command_channel_capacity is 0, using 1");
            self.command_channel_capacity = 1;
        }
        if self.connect_timeout.is_zero() {
            let fallback = default_connect_timeout();
            warn!(?fallback, "connect_timeout is 0, using default");
            self.connect_timeout = fallback;
        }
        if self.reconnect.max_backoff < self.reconnect.backoff_base {
            warn!(
                max_backoff = ?self.reconnect.max_backoff,
                backoff_base = ?self.reconnect.backoff_base,
                "max_backoff below backoff_base, raising it"
            );
            self.reconnect.max_backoff = self.reconnect.backoff_base;
        }
        self
    }
}
