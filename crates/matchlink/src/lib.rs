//! # matchlink
//!
//! Client-side matchmaking session: connect to a matchmaking server, join
//! or leave its queue, vote for a map, and get told when a match is found.
//!
//! The crate ties the layers together:
//!
//! ```text
//! MatchmakingClient (handle)  ← presentation layer calls this
//!     ↕ commands / SessionObserver notifications
//! Session driver (task)       ← owns SessionMachine, Backoff
//!     ↕ LinkEvent / encoded intents
//! Link task                   ← owns the WebSocket connection
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use matchlink::prelude::*;
//!
//! # async fn run() -> Result<(), MatchlinkError> {
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Notification>();
//! let client = MatchmakingClient::start(ClientConfig::new("localhost:3000"), tx);
//! client.connect().await?;
//! client.request_join_queue("Bob", 1000).await?;
//! while let Some(notification) = rx.recv().await {
//!     println!("{notification:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod backoff;
mod client;
mod config;
mod connection;
mod error;
mod logging;
mod observer;

pub use backoff::Backoff;
pub use client::{MatchmakingClient, SessionSnapshot};
pub use config::{ClientConfig, ReconnectPolicy};
pub use connection::{ConnectionManager, LinkEvent};
pub use error::MatchlinkError;
pub use logging::init_tracing;
pub use observer::SessionObserver;

pub use matchlink_protocol as protocol;
pub use matchlink_session as session;
pub use matchlink_transport as transport;

/// Everything a presentation layer usually needs.
pub mod prelude {
    pub use crate::{
        ClientConfig, MatchlinkError, MatchmakingClient, ReconnectPolicy, SessionObserver,
        SessionSnapshot,
    };
    pub use matchlink_protocol::{MapName, MatchInfo, PlayerEntry};
    pub use matchlink_session::{
        IntentError, MapVoteTally, Notification, QueueSnapshot, SessionState,
    };
    pub use matchlink_transport::ConnectError;
}
