//! Presentation-layer hooks.

use matchlink_protocol::MatchInfo;
use matchlink_session::{MapVoteTally, Notification, QueueSnapshot, SessionState};
use tokio::sync::mpsc;

/// Receives session notifications.
///
/// Every method has a no-op default, so implement only what you display.
/// Methods run on the session driver task, one at a time and in order;
/// they must return quickly and must not block.
pub trait SessionObserver: Send + 'static {
    fn on_state_changed(&self, _state: SessionState) {}

    fn on_queue_snapshot(&self, _queue: &QueueSnapshot) {}

    fn on_vote_tally(&self, _tally: &MapVoteTally) {}

    /// Fires once per session.
    fn on_match_found(&self, _info: &MatchInfo) {}

    /// Automatic reconnection gave up after `attempts` tries.
    fn on_reconnect_exhausted(&self, _attempts: u32) {}
}

/// Ignores everything.
impl SessionObserver for () {}

/// Forwards every notification into a channel, for presentation layers
/// that prefer a stream to callbacks. Sends to a dropped receiver are
/// ignored.
impl SessionObserver for mpsc::UnboundedSender<Notification> {
    fn on_state_changed(&self, state: SessionState) {
        let _ = self.send(Notification::StateChanged(state));
    }

    fn on_queue_snapshot(&self, queue: &QueueSnapshot) {
        let _ = self.send(Notification::QueueSnapshot(queue.clone()));
    }

    fn on_vote_tally(&self, tally: &MapVoteTally) {
        let _ = self.send(Notification::VoteTally(tally.clone()));
    }

    fn on_match_found(&self, info: &MatchInfo) {
        let _ = self.send(Notification::MatchFound(info.clone()));
    }

    fn on_reconnect_exhausted(&self, attempts: u32) {
        let _ = self.send(Notification::ReconnectExhausted { attempts });
    }
}

/// Routes one notification to the matching observer method.
pub(crate) fn dispatch<O: SessionObserver + ?Sized>(observer: &O, notification: &Notification) {
    match notification {
        Notification::StateChanged(state) => observer.on_state_changed(*state),
        Notification::QueueSnapshot(queue) => observer.on_queue_snapshot(queue),
        Notification::VoteTally(tally) => observer.on_vote_tally(tally),
        Notification::MatchFound(info) => observer.on_match_found(info),
        Notification::ReconnectExhausted { attempts } => {
            observer.on_reconnect_exhausted(*attempts)
        }
    }
}
