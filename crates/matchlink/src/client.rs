//! `MatchmakingClient` handle and the session driver task.
//!
//! The driver is an actor: it owns the [`SessionMachine`], the
//! [`ConnectionManager`] and the observer, and it processes one thing at a
//! time from three sources:
//!
//! ```text
//! loop {
//!     select! {
//!         cmd   = commands.recv()          => connect / disconnect / intent / snapshot
//!         event = connection.next_event()  => dial outcome, inbound message,
//!                                             decode failure, loss
//!         _     = retry deadline           => next reconnection attempt
//!     }
//! }
//! ```
//!
//! Because every state change happens inside this one task, a server
//! event and a user intent can never interleave halfway through a
//! transition.

use matchlink_protocol::{JsonCodec, MapName, MatchInfo, MessageCodec, OutboundIntent};
use matchlink_session::{
    IntentError, MapVoteTally, Notification, QueueSnapshot, SessionMachine, SessionState,
};
use matchlink_transport::{ConnectError, Transport, WebSocketTransport};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::backoff::Backoff;
use crate::connection::{ConnectionManager, LinkEvent};
use crate::observer::dispatch;
use crate::{ClientConfig, MatchlinkError, SessionObserver};

/// A point-in-time copy of the session, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub queue: QueueSnapshot,
    pub votes: MapVoteTally,
    pub match_info: Option<MatchInfo>,
    /// Server messages skipped because they failed to decode.
    pub decode_errors: u64,
}

/// Commands sent to the session driver through its channel.
///
/// The `oneshot::Sender` in each variant is the reply channel.
enum ClientCommand {
    Connect {
        reply: oneshot::Sender<Result<(), MatchlinkError>>,
    },
    Disconnect {
        reply: oneshot::Sender<Result<(), MatchlinkError>>,
    },
    Intent {
        intent: OutboundIntent,
        reply: oneshot::Sender<Result<(), MatchlinkError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

// ---------------------------------------------------------------------------
// MatchmakingClient
// ---------------------------------------------------------------------------

/// Handle to a running matchmaking session.
///
/// Cheap to clone: it is just an `mpsc::Sender` wrapper. Every method
/// sends a command to the session driver and waits for its reply. Errors
/// come back as values; nothing here panics.
///
/// # Example
///
/// ```rust,no_run
/// use matchlink::prelude::*;
///
/// # async fn run() -> Result<(), MatchlinkError> {
/// let (tx, mut notifications) = tokio::sync::mpsc::unbounded_channel();
/// let client = MatchmakingClient::start(ClientConfig::new("localhost:3000"), tx);
///
/// client.connect().await?;
/// client.request_join_queue("Bob", 1000).await?;
///
/// while let Some(notification) = notifications.recv().await {
///     if let Notification::MatchFound(info) = notification {
///         println!("match: {:?}", info.fields());
///         break;
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MatchmakingClient {
    commands: mpsc::Sender<ClientCommand>,
}

impl MatchmakingClient {
    /// Starts a session driver that dials over WebSocket and speaks JSON.
    ///
    /// Must be called from within a Tokio runtime. The session starts
    /// `Disconnected`; call [`connect`](Self::connect) to go online.
    pub fn start(config: ClientConfig, observer: impl SessionObserver) -> Self {
        Self::with_transport(config, WebSocketTransport::new(), JsonCodec, observer)
    }

    /// Starts a session driver over a custom transport and codec.
    pub fn with_transport<T, C, O>(config: ClientConfig, transport: T, codec: C, observer: O) -> Self
    where
        T: Transport,
        C: MessageCodec + Clone,
        O: SessionObserver,
    {
        let config = config.validated();
        let (tx, rx) = mpsc::channel(config.command_channel_capacity);

        let driver = SessionDriver {
            backoff: Backoff::new(config.reconnect.clone()),
            config,
            machine: SessionMachine::new(),
            connection: ConnectionManager::new(transport, codec),
            observer,
            commands: rx,
            retry_at: None,
            pending_connect: None,
        };
        tokio::spawn(driver.run());

        Self { commands: tx }
    }

    /// Opens the connection.
    ///
    /// The attempt is bounded by the configured timeout and is not retried
    /// automatically; a failure is returned here and the session goes back
    /// to `Disconnected`. The dial runs in the background, so other calls on
    /// this client are answered while it is pending.
    ///
    /// # Errors
    /// - [`MatchlinkError::Connect`] if the attempt fails, or
    ///   [`ConnectError::Cancelled`] if [`disconnect`](Self::disconnect)
    ///   was called before it finished
    /// - [`IntentError::InvalidState`] unless the session is `Disconnected`,
    ///   or if it already reached `Matched`
    pub async fn connect(&self) -> Result<(), MatchlinkError> {
        self.request(|reply| ClientCommand::Connect { reply }).await?
    }

    /// Closes the connection, abandons an in-flight dial and stops any
    /// pending reconnection.
    ///
    /// Disconnecting an already disconnected session is a no-op.
    pub async fn disconnect(&self) -> Result<(), MatchlinkError> {
        self.request(|reply| ClientCommand::Disconnect { reply }).await?
    }

    /// Asks the server to put `username` into the queue.
    ///
    /// # Errors
    /// [`IntentError::InvalidState`] unless `Idle`;
    /// [`IntentError::NotConnected`] while offline.
    pub async fn request_join_queue(
        &self,
        username: impl Into<String>,
        rating: i32,
    ) -> Result<(), MatchlinkError> {
        self.intent(OutboundIntent::JoinQueue {
            username: username.into(),
            rating,
        })
        .await
    }

    /// Asks the server to take us out of the queue.
    ///
    /// # Errors
    /// [`IntentError::InvalidState`] unless `Queued`;
    /// [`IntentError::NotConnected`] while offline.
    pub async fn request_leave_queue(&self) -> Result<(), MatchlinkError> {
        self.intent(OutboundIntent::LeaveQueue).await
    }

    /// Votes for a map by its wire name (`"dust2"`, `"mirage"`, ...).
    ///
    /// The local tally is not touched; it changes when the server sends
    /// the next `mapVotesUpdate`.
    ///
    /// # Errors
    /// [`IntentError::UnknownMap`] for names outside the map pool;
    /// [`IntentError::InvalidState`] once matched;
    /// [`IntentError::NotConnected`] while offline.
    pub async fn request_vote_map(&self, map: &str) -> Result<(), MatchlinkError> {
        let map: MapName = map.parse().map_err(IntentError::from)?;
        self.intent(OutboundIntent::VoteMap { map }).await
    }

    /// Returns a copy of the current session.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, MatchlinkError> {
        self.request(|reply| ClientCommand::Snapshot { reply }).await
    }

    /// Closes the connection and stops the driver task. Later calls on any
    /// clone of this handle return [`MatchlinkError::ClientClosed`].
    pub async fn shutdown(&self) -> Result<(), MatchlinkError> {
        self.request(|reply| ClientCommand::Shutdown { reply }).await
    }

    async fn intent(&self, intent: OutboundIntent) -> Result<(), MatchlinkError> {
        self.request(|reply| ClientCommand::Intent { intent, reply })
            .await?
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> ClientCommand,
    ) -> Result<R, MatchlinkError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .await
            .map_err(|_| MatchlinkError::ClientClosed)?;
        reply_rx.await.map_err(|_| MatchlinkError::ClientClosed)
    }
}

// ---------------------------------------------------------------------------
// SessionDriver
// ---------------------------------------------------------------------------

struct SessionDriver<T: Transport, C: MessageCodec + Clone, O: SessionObserver> {
    config: ClientConfig,
    machine: SessionMachine,
    connection: ConnectionManager<T, C>,
    observer: O,
    commands: mpsc::Receiver<ClientCommand>,
    backoff: Backoff,
    /// When the next reconnection attempt is due, if one is scheduled.
    retry_at: Option<Instant>,
    /// Reply for a user `connect()` whose dial is still in flight. `None`
    /// while an automatic retry is dialing.
    pending_connect: Option<oneshot::Sender<Result<(), MatchlinkError>>>,
}

impl<T, C, O> SessionDriver<T, C, O>
where
    T: Transport,
    C: MessageCodec + Clone,
    O: SessionObserver,
{
    /// Runs the driver loop until shutdown or until every handle is gone.
    ///
    /// Nothing in the loop body awaits the network, so commands such as
    /// `snapshot()` and `disconnect()` are served while a dial is pending.
    async fn run(mut self) {
        tracing::debug!(addr = %self.config.server_addr, "session driver started");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(ClientCommand::Connect { reply }) => self.handle_connect(reply),
                    Some(ClientCommand::Disconnect { reply }) => {
                        self.handle_disconnect();
                        let _ = reply.send(Ok(()));
                    }
                    Some(ClientCommand::Intent { intent, reply }) => {
                        let _ = reply.send(self.handle_intent(intent));
                    }
                    Some(ClientCommand::Snapshot { reply }) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(ClientCommand::Shutdown { reply }) => {
                        self.connection.close();
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.connection.close();
                        break;
                    }
                },

                event = self.connection.next_event() => self.handle_link_event(event),

                () = retry_due(self.retry_at) => self.retry(),
            }
        }

        tracing::debug!("session driver stopped");
    }

    fn handle_connect(&mut self, reply: oneshot::Sender<Result<(), MatchlinkError>>) {
        let notes = match self.machine.begin_connect() {
            Ok(notes) => notes,
            Err(e) => {
                let _ = reply.send(Err(e.into()));
                return;
            }
        };
        self.notify(notes);
        if self.retry_at.take().is_some() {
            tracing::debug!("scheduled reconnection superseded by connect()");
        }
        self.backoff.reset();
        self.pending_connect = Some(reply);
        self.start_dial();
    }

    fn handle_disconnect(&mut self) {
        if self.retry_at.take().is_some() {
            tracing::info!("pending reconnection cancelled");
        }
        self.backoff.reset();
        self.connection.close();
        if let Some(reply) = self.pending_connect.take() {
            let _ = reply.send(Err(ConnectError::Cancelled.into()));
        }
        let notes = self.machine.connection_lost();
        if !notes.is_empty() {
            tracing::info!("disconnected by user");
        }
        self.notify(notes);
    }

    fn handle_intent(&mut self, intent: OutboundIntent) -> Result<(), MatchlinkError> {
        if let Err(e) = self.machine.check_intent(&intent) {
            tracing::debug!(kind = intent.kind(), error = %e, "intent rejected");
            return Err(e.into());
        }
        self.connection.send(&intent)?;
        let notes = self.machine.intent_sent(&intent)?;
        self.notify(notes);
        Ok(())
    }

    fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected(conn) => {
                tracing::info!(addr = %self.config.server_addr, %conn, "connected");
                self.backoff.reset();
                let notes = self.machine.connection_opened();
                self.notify(notes);
                if let Some(reply) = self.pending_connect.take() {
                    let _ = reply.send(Ok(()));
                }
            }
            LinkEvent::ConnectFailed(e) => {
                tracing::warn!(addr = %self.config.server_addr, error = %e, "connection attempt failed");
                let notes = self.machine.connection_lost();
                self.notify(notes);
                match self.pending_connect.take() {
                    // A user's attempt is never retried automatically.
                    Some(reply) => {
                        let _ = reply.send(Err(e.into()));
                    }
                    None if e.is_retryable() => self.schedule_reconnect(),
                    None => {
                        tracing::warn!(error = %e, "not retrying a configuration error");
                        self.give_up();
                    }
                }
            }
            LinkEvent::Inbound(event) => {
                let notes = self.machine.apply(event);
                self.notify(notes);
            }
            LinkEvent::DecodeFailed(e) => self.machine.record_decode_error(&e),
            LinkEvent::Closed { reason } => {
                tracing::info!(%reason, state = %self.machine.state(), "lost connection to matchmaking server");
                let notes = self.machine.connection_lost();
                self.notify(notes);
                self.schedule_reconnect();
            }
        }
    }

    fn start_dial(&mut self) {
        tracing::info!(addr = %self.config.server_addr, "connecting to matchmaking server");
        self.connection
            .start_dial(&self.config.server_addr, self.config.connect_timeout);
    }

    fn schedule_reconnect(&mut self) {
        if !self.config.reconnect.is_enabled() || self.machine.has_matched() {
            return;
        }
        match self.backoff.next_delay() {
            Some(delay) => {
                tracing::info!(attempt = self.backoff.attempts(), ?delay, "reconnecting after delay");
                self.retry_at = Some(Instant::now() + delay);
            }
            None => self.give_up(),
        }
    }

    fn retry(&mut self) {
        self.retry_at = None;
        match self.machine.begin_connect() {
            Ok(notes) => self.notify(notes),
            Err(e) => {
                tracing::debug!(error = %e, "reconnection no longer applicable");
                return;
            }
        }
        self.start_dial();
    }

    fn give_up(&mut self) {
        let attempts = self.backoff.attempts();
        tracing::warn!(attempts, "reconnection attempts exhausted");
        self.backoff.reset();
        self.notify(vec![Notification::ReconnectExhausted { attempts }]);
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.machine.state(),
            queue: self.machine.queue().clone(),
            votes: self.machine.votes().clone(),
            match_info: self.machine.match_info().cloned(),
            decode_errors: self.machine.decode_errors(),
        }
    }

    fn notify(&self, notes: Vec<Notification>) {
        for note in &notes {
            dispatch(&self.observer, note);
        }
    }
}

/// Resolves at `deadline`, or never if there is none.
async fn retry_due(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
