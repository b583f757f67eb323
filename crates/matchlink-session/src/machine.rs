//! The session state machine.
//!
//! [`SessionMachine`] is a plain struct with synchronous methods. It never
//! touches the network: the owner reports connection events and decoded
//! server messages, asks whether an intent is allowed, and reports when an
//! intent actually went out. Every method that changes something returns
//! the [`Notification`]s the presentation layer should see, in order.
//!
//! # Concurrency note
//!
//! The machine is not shared. One task owns it and applies events one at
//! a time, so no transition ever races another.

use matchlink_protocol::{DecodeError, InboundEvent, MatchInfo, OutboundIntent};

use crate::{
    project_queue, project_votes, IntentError, MapVoteTally, QueueSnapshot,
    SessionState,
};

/// Something the presentation layer should hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The session moved to a new state.
    StateChanged(SessionState),
    /// A new queue roster replaced the old one.
    QueueSnapshot(QueueSnapshot),
    /// A new vote tally replaced the old one.
    VoteTally(MapVoteTally),
    /// A match was found. Fires once per session.
    MatchFound(MatchInfo),
    /// Automatic reconnection gave up after `attempts` tries. The session
    /// stays disconnected until the user connects again.
    ReconnectExhausted { attempts: u32 },
}

/// The client's matchmaking state and the rules for changing it.
#[derive(Debug, Default)]
pub struct SessionMachine {
    state: SessionState,
    queue: QueueSnapshot,
    votes: MapVoteTally,
    match_info: Option<MatchInfo>,
    decode_errors: u64,
}

impl SessionMachine {
    /// A fresh session: disconnected, empty roster, zero votes.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn queue(&self) -> &QueueSnapshot {
        &self.queue
    }

    pub fn votes(&self) -> &MapVoteTally {
        &self.votes
    }

    /// The match payload, once a match has been found.
    pub fn match_info(&self) -> Option<&MatchInfo> {
        self.match_info.as_ref()
    }

    /// Returns `true` once this session has reached `Matched`, even if the
    /// connection was lost afterwards.
    pub fn has_matched(&self) -> bool {
        self.match_info.is_some()
    }

    /// Number of inbound messages skipped because they failed to decode.
    pub fn decode_errors(&self) -> u64 {
        self.decode_errors
    }

    // -- Connection lifecycle ---------------------------------------------

    /// A connection attempt is starting.
    ///
    /// # Errors
    /// [`IntentError::InvalidState`] unless the session is `Disconnected`
    /// and has never been matched.
    pub fn begin_connect(&mut self) -> Result<Vec<Notification>, IntentError> {
        if self.state != SessionState::Disconnected || self.has_matched() {
            return Err(IntentError::InvalidState {
                state: self.state,
                intent: "connect",
            });
        }
        Ok(self.transition(SessionState::Connecting))
    }

    /// The connection attempt succeeded.
    pub fn connection_opened(&mut self) -> Vec<Notification> {
        if self.state != SessionState::Connecting {
            tracing::warn!(state = %self.state, "connection opened in unexpected state, ignoring");
            return Vec::new();
        }
        self.transition(SessionState::Idle)
    }

    /// The connection attempt failed or an established connection was lost.
    ///
    /// Clears the queue roster. Calling it again while already
    /// `Disconnected` does nothing, so loss is reported once.
    pub fn connection_lost(&mut self) -> Vec<Notification> {
        if self.state == SessionState::Disconnected {
            return Vec::new();
        }
        let mut out = self.transition(SessionState::Disconnected);
        if !self.queue.is_empty() {
            self.queue = QueueSnapshot::default();
            out.push(Notification::QueueSnapshot(self.queue.clone()));
        }
        out
    }

    // -- Intents ------------------------------------------------------------

    /// Checks whether `intent` may be sent in the current state.
    ///
    /// Nothing changes; call [`intent_sent`](Self::intent_sent) once the
    /// message is actually on its way.
    ///
    /// # Errors
    /// - [`IntentError::NotConnected`]: `Disconnected` or `Connecting`
    /// - [`IntentError::InvalidState`]: joining while queued, leaving
    ///   while idle, or anything at all once matched
    pub fn check_intent(&self, intent: &OutboundIntent) -> Result<(), IntentError> {
        use SessionState::*;

        let allowed = match (self.state, intent) {
            (Disconnected | Connecting, _) => {
                return Err(IntentError::NotConnected);
            }
            (Idle, OutboundIntent::JoinQueue { .. }) => true,
            (Queued, OutboundIntent::LeaveQueue) => true,
            (Idle | Queued, OutboundIntent::VoteMap { .. }) => true,
            _ => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(IntentError::InvalidState {
                state: self.state,
                intent: intent.kind(),
            })
        }
    }

    /// Records that `intent` was handed to the connection and applies its
    /// transition (`joinQueue` → `Queued`, `leaveQueue` → `Idle`).
    ///
    /// # Errors
    /// Same as [`check_intent`](Self::check_intent); on error nothing changes.
    pub fn intent_sent(
        &mut self,
        intent: &OutboundIntent,
    ) -> Result<Vec<Notification>, IntentError> {
        self.check_intent(intent)?;
        let out = match intent {
            OutboundIntent::JoinQueue { .. } => self.transition(SessionState::Queued),
            OutboundIntent::LeaveQueue => self.transition(SessionState::Idle),
            OutboundIntent::VoteMap { .. } => Vec::new(),
        };
        Ok(out)
    }

    // -- Server events ------------------------------------------------------

    /// Applies one decoded server message.
    ///
    /// Snapshots are only accepted in `Idle` and `Queued`; `matchCreated`
    /// only in `Queued`. Anything else is logged and dropped.
    pub fn apply(&mut self, event: InboundEvent) -> Vec<Notification> {
        if !self.state.is_lobby() {
            tracing::debug!(
                state = %self.state,
                kind = event.kind(),
                "ignoring server message outside the lobby"
            );
            return Vec::new();
        }

        match event {
            InboundEvent::QueueUpdate { players } => {
                self.queue = project_queue(players);
                tracing::debug!(players = self.queue.len(), "queue snapshot replaced");
                vec![Notification::QueueSnapshot(self.queue.clone())]
            }
            InboundEvent::MapVotesUpdate { votes } => {
                let unknown = votes
                    .keys()
                    .filter(|name| name.parse::<matchlink_protocol::MapName>().is_err())
                    .count();
                if unknown > 0 {
                    tracing::debug!(unknown, "ignoring votes for maps outside the pool");
                }
                self.votes = project_votes(&self.votes, &votes);
                vec![Notification::VoteTally(self.votes.clone())]
            }
            InboundEvent::MatchCreated(info) => {
                if self.state != SessionState::Queued {
                    tracing::debug!(state = %self.state, "match created while not queued, ignoring");
                    return Vec::new();
                }
                tracing::info!("match found");
                self.match_info = Some(info.clone());
                let mut out = self.transition(SessionState::Matched);
                out.push(Notification::MatchFound(info));
                out
            }
        }
    }

    /// Counts an inbound message that could not be decoded. The session
    /// itself is unaffected.
    pub fn record_decode_error(&mut self, err: &DecodeError) {
        self.decode_errors += 1;
        tracing::warn!(
            error = %err,
            total = self.decode_errors,
            "skipping undecodable server message"
        );
    }

    fn transition(&mut self, next: SessionState) -> Vec<Notification> {
        tracing::debug!(from = %self.state, to = %next, "session transition");
        self.state = next;
        vec![Notification::StateChanged(next)]
    }
}

// =========================================================================
// Tests
// =========================================================================
