//! Core protocol types for the matchmaking wire format.
//!
//! Every message is one JSON object with a `type` discriminator:
//!
//! ```text
//! client → server   {"type":"joinQueue","username":"Bob","elo":1000}
//!                   {"type":"leaveQueue"}
//!                   {"type":"voteMap","map":"dust2"}
//!
//! server → client   {"type":"queueUpdate","players":[{"username":..,"elo":..}]}
//!                   {"type":"mapVotesUpdate","votes":{"dust2":3}}
//!                   {"type":"matchCreated", ...opaque fields}
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::UnknownMapError;

// ---------------------------------------------------------------------------
// PlayerEntry
// ---------------------------------------------------------------------------

/// One row of the server's queue roster.
///
/// The wire calls the rating `elo`; in Rust it is `rating` because the
/// client never assumes which rating system the server uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub username: String,
    #[serde(rename = "elo")]
    pub rating: i32,
}

impl PlayerEntry {
    pub fn new(username: impl Into<String>, rating: i32) -> Self {
        Self {
            username: username.into(),
            rating,
        }
    }
}

// ---------------------------------------------------------------------------
// MapName: the fixed map pool
// ---------------------------------------------------------------------------

/// A map that can be voted for.
///
/// The pool is closed: a vote for anything else is rejected before it
/// reaches the wire, and tallies for maps outside the pool are ignored.
/// `#[serde(rename_all = "lowercase")]` gives the wire names (`"dust2"`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MapName {
    Dust2,
    Mirage,
    Inferno,
    Overpass,
    Nuke,
}

impl MapName {
    /// Every map in the pool, in display order.
    pub const ALL: [MapName; 5] = [
        MapName::Dust2,
        MapName::Mirage,
        MapName::Inferno,
        MapName::Overpass,
        MapName::Nuke,
    ];

    /// The wire identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dust2 => "dust2",
            Self::Mirage => "mirage",
            Self::Inferno => "inferno",
            Self::Overpass => "overpass",
            Self::Nuke => "nuke",
        }
    }
}

impl fmt::Display for MapName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapName {
    type Err = UnknownMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|map| map.as_str() == s)
            .ok_or_else(|| UnknownMapError(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MatchInfo
// ---------------------------------------------------------------------------

/// The payload of a `matchCreated` message.
///
/// The client does not interpret it: the fields (everything except `type`)
/// are kept verbatim and handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchInfo {
    fields: Map<String, Value>,
}

impl MatchInfo {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Looks up one field of the raw payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields of the raw payload.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

// ---------------------------------------------------------------------------
// OutboundIntent: client → server
// ---------------------------------------------------------------------------

/// A request the client sends to the server.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, so
/// `LeaveQueue` is `{"type":"leaveQueue"}` and the other variants carry
/// their fields next to the tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundIntent {
    /// Enter the matchmaking queue.
    JoinQueue {
        username: String,
        #[serde(rename = "elo")]
        rating: i32,
    },

    /// Leave the matchmaking queue.
    LeaveQueue,

    /// Vote for the map of the upcoming match.
    VoteMap { map: MapName },
}

impl OutboundIntent {
    /// The wire discriminator, handy for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinQueue { .. } => "joinQueue",
            Self::LeaveQueue => "leaveQueue",
            Self::VoteMap { .. } => "voteMap",
        }
    }
}

// ---------------------------------------------------------------------------
// InboundEvent: server → client
// ---------------------------------------------------------------------------

/// A decoded, validated server message.
///
/// Field presence is checked once, at decode time; code that receives an
/// `InboundEvent` never re-checks it.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// The full queue roster, in server order.
    QueueUpdate { players: Vec<PlayerEntry> },

    /// Vote counts keyed by the names the server sent. Names outside the
    /// map pool are kept here and filtered by the session projections.
    MapVotesUpdate { votes: BTreeMap<String, u32> },

    /// A match was formed for this client.
    MatchCreated(MatchInfo),
}

impl InboundEvent {
    /// The wire discriminator, handy for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::QueueUpdate { .. } => "queueUpdate",
            Self::MapVotesUpdate { .. } => "mapVotesUpdate",
            Self::MatchCreated(_) => "matchCreated",
        }
    }
}
