//! Connection manager: one live link to the matchmaking server.
//!
//! [`ConnectionManager`] dials through a [`Transport`] in a spawned **dial
//! task** and hands the resulting connection to a spawned **link task**.
//! The link task is the only code that touches the socket:
//!
//! ```text
//!   start_dial(addr) ──► dial task ──► Connected / ConnectFailed ──┐
//!                                                                  │
//!   send(intent) ──encode──► outbound queue ──► link task ──► conn.send()
//!                                                  │               │
//!   next_event() ◄── events channel ◄──decode── conn.recv()  ◄─────┘
//! ```
//!
//! Nothing here waits on the network from the caller's task: the dial and
//! the close handshake both run in the background, and their outcome comes
//! back through [`next_event`](ConnectionManager::next_event).
//!
//! Each link has its own pair of channels. Replacing or closing a link
//! drops its event receiver, so nothing from an old connection can reach
//! the session after a new one is up.

use std::sync::Arc;
use std::time::Duration;

use matchlink_protocol::{DecodeError, InboundEvent, MessageCodec, OutboundIntent};
use matchlink_session::IntentError;
use matchlink_transport::{ConnectError, Connection, ConnectionId, Transport};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::MatchlinkError;

/// How long the link task waits for a close handshake before giving up on it.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Something that happened to the current dial or link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// The dial finished and a link is up.
    Connected(ConnectionId),
    /// The dial failed (or timed out). There is no link.
    ConnectFailed(ConnectError),
    /// A server message decoded successfully.
    Inbound(InboundEvent),
    /// A server message could not be decoded and was skipped.
    DecodeFailed(DecodeError),
    /// The link is gone (peer close, read or write failure). Reported once
    /// per link, and never for a link closed through
    /// [`ConnectionManager::close`].
    Closed { reason: String },
}

enum LinkCommand {
    Send(Vec<u8>),
    Close,
}

struct Link {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<LinkCommand>,
    events: mpsc::UnboundedReceiver<LinkEvent>,
}

struct Dial<Conn> {
    result: oneshot::Receiver<Result<Conn, ConnectError>>,
    task: JoinHandle<()>,
}

/// Owns the client's single server connection.
pub struct ConnectionManager<T: Transport, C: MessageCodec + Clone> {
    transport: Arc<T>,
    codec: C,
    dial: Option<Dial<T::Connection>>,
    link: Option<Link>,
}

impl<T, C> ConnectionManager<T, C>
where
    T: Transport,
    C: MessageCodec + Clone,
{
    pub fn new(transport: T, codec: C) -> Self {
        Self {
            transport: Arc::new(transport),
            codec,
            dial: None,
            link: None,
        }
    }

    /// Returns `true` while a link is up.
    pub fn is_connected(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|link| !link.outbound.is_closed())
    }

    /// Returns `true` while a dial is in flight.
    pub fn is_dialing(&self) -> bool {
        self.dial.is_some()
    }

    /// Starts dialing `addr` in the background.
    ///
    /// Any previous link or dial is dropped first. The whole attempt,
    /// handshake included, is bounded by `timeout`. The outcome arrives
    /// from [`next_event`](Self::next_event) as [`LinkEvent::Connected`] or
    /// [`LinkEvent::ConnectFailed`].
    pub fn start_dial(&mut self, addr: &str, timeout: Duration) {
        self.close();

        let transport = Arc::clone(&self.transport);
        let addr = addr.to_string();
        let (result_tx, result_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, transport.connect(&addr)).await {
                Ok(result) => result,
                Err(_) => Err(ConnectError::Timeout(timeout)),
            };
            let _ = result_tx.send(result);
        });

        self.dial = Some(Dial {
            result: result_rx,
            task,
        });
    }

    /// Dials `addr` and waits until the link is up.
    ///
    /// # Errors
    /// Whatever the transport reports, or [`ConnectError::Timeout`].
    pub async fn connect(
        &mut self,
        addr: &str,
        timeout: Duration,
    ) -> Result<(), ConnectError> {
        self.start_dial(addr, timeout);
        loop {
            match self.next_event().await {
                LinkEvent::Connected(_) => return Ok(()),
                LinkEvent::ConnectFailed(e) => return Err(e),
                _ => continue,
            }
        }
    }

    /// Encodes `intent` and queues it on the current link.
    ///
    /// # Errors
    /// - [`IntentError::NotConnected`] if there is no live link
    /// - [`MatchlinkError::Protocol`] if the intent cannot be encoded
    pub fn send(&self, intent: &OutboundIntent) -> Result<(), MatchlinkError> {
        let link = self.link.as_ref().ok_or(IntentError::NotConnected)?;
        let bytes = self.codec.encode(intent)?;
        link.outbound
            .send(LinkCommand::Send(bytes))
            .map_err(|_| IntentError::NotConnected)?;
        tracing::debug!(conn = %link.id, kind = intent.kind(), "intent queued");
        Ok(())
    }

    /// Waits for the outcome of the current dial or the next event on the
    /// current link.
    ///
    /// Pends forever while there is neither, so it can sit in a
    /// `tokio::select!` next to other branches. Cancel-safe. After a
    /// [`LinkEvent::Closed`] the link is dropped.
    pub async fn next_event(&mut self) -> LinkEvent {
        if let Some(dial) = self.dial.as_mut() {
            let result = (&mut dial.result).await.unwrap_or_else(|_| {
                Err(ConnectError::Unreachable("dial task stopped".into()))
            });
            self.dial = None;
            return match result {
                Ok(conn) => LinkEvent::Connected(self.install(conn)),
                Err(e) => LinkEvent::ConnectFailed(e),
            };
        }

        let Some(link) = self.link.as_mut() else {
            return std::future::pending().await;
        };

        let event = link.events.recv().await.unwrap_or_else(|| LinkEvent::Closed {
            reason: "link task stopped".into(),
        });
        if matches!(event, LinkEvent::Closed { .. }) {
            self.link = None;
        }
        event
    }

    /// Abandons the current dial and closes the current link, without
    /// reporting a [`LinkEvent::Closed`] for it. Returns immediately; the
    /// close handshake finishes in the link task.
    pub fn close(&mut self) {
        if let Some(dial) = self.dial.take() {
            dial.task.abort();
            tracing::debug!("dial abandoned");
        }
        if let Some(link) = self.link.take() {
            let _ = link.outbound.send(LinkCommand::Close);
            tracing::debug!(conn = %link.id, "link closing");
        }
    }

    fn install(&mut self, conn: T::Connection) -> ConnectionId {
        let id = conn.id();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_link(conn, self.codec.clone(), outbound_rx, events_tx));

        tracing::debug!(conn = %id, "link task started");
        self.link = Some(Link {
            id,
            outbound: outbound_tx,
            events: events_rx,
        });
        id
    }
}

impl<T: Transport, C: MessageCodec + Clone> Drop for ConnectionManager<T, C> {
    fn drop(&mut self) {
        if let Some(dial) = self.dial.take() {
            dial.task.abort();
        }
    }
}

/// The link task: pumps the outbound queue into the connection and the
/// connection's frames into the events channel until either side ends.
async fn run_link<Conn, C>(
    conn: Conn,
    codec: C,
    mut outbound: mpsc::UnboundedReceiver<LinkCommand>,
    events: mpsc::UnboundedSender<LinkEvent>,
) where
    Conn: Connection,
    C: MessageCodec,
{
    let id = conn.id();

    let reason = loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                Some(LinkCommand::Send(bytes)) => {
                    if let Err(e) = conn.send(&bytes).await {
                        break format!("send failed: {e}");
                    }
                }
                // Close requested, or the manager was dropped.
                Some(LinkCommand::Close) | None => {
                    close_quietly(&conn).await;
                    return;
                }
            },

            frame = conn.recv() => match frame {
                Ok(Some(bytes)) => {
                    let event = match codec.decode(&bytes) {
                        Ok(event) => LinkEvent::Inbound(event),
                        Err(e) => LinkEvent::DecodeFailed(e),
                    };
                    if events.send(event).is_err() {
                        close_quietly(&conn).await;
                        return;
                    }
                }
                Ok(None) => break "server closed the connection".to_string(),
                Err(e) => break format!("receive failed: {e}"),
            },
        }
    };

    tracing::info!(conn = %id, %reason, "connection lost");
    let _ = events.send(LinkEvent::Closed { reason });
}

async fn close_quietly<Conn: Connection>(conn: &Conn) {
    match tokio::time::timeout(CLOSE_GRACE, conn.close()).await {
        Ok(Ok(())) => tracing::debug!(conn = %conn.id(), "link closed"),
        Ok(Err(e)) => tracing::debug!(conn = %conn.id(), error = %e, "close handshake failed"),
        Err(_) => tracing::debug!(conn = %conn.id(), "close handshake timed out"),
    }
}
