//! Matchmaking session state for matchlink.
//!
//! This crate is the client's view of matchmaking:
//!
//! 1. **State machine**: [`SessionMachine`] owns the [`SessionState`] and
//!    decides which intents are allowed and how server events change state.
//! 2. **Projections**: [`QueueSnapshot`] and [`MapVoteTally`], read-only
//!    views rebuilt from server snapshots ([`project_queue`],
//!    [`project_votes`]).
//!
//! Everything here is synchronous and does no I/O. The caller (the client
//! driver task) feeds it connection events and decoded messages one at a
//! time and forwards the returned [`Notification`]s to the presentation
//! layer.
//!
//! # How it fits in the stack
//!
//! ```text
//! Client driver (above)  ← owns a SessionMachine, does the I/O
//!     ↕
//! Session layer (this crate)  ← state transitions, intent validation
//!     ↕
//! Protocol layer (below)  ← OutboundIntent, InboundEvent, MapName
//! ```

mod error;
mod machine;
mod projection;
mod state;

pub use error::IntentError;
pub use machine::{Notification, SessionMachine};
pub use projection::{project_queue, project_votes, MapVoteTally, QueueSnapshot};
pub use state::SessionState;
