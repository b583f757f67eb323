//! WebSocket transport implementation using `tokio-tungstenite`.

use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{ConnectError, Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Turns a configured server address into a WebSocket URL.
///
/// `host:port` is dialed as `ws://host:port` and an explicit `ws://` URL
/// passes through unchanged. Any other scheme is rejected, `wss://`
/// included: this build carries no TLS support.
pub fn websocket_url(addr: &str) -> Result<String, ConnectError> {
    let addr = addr.trim();
    if addr.is_empty() {
        return Err(ConnectError::InvalidAddress("address is empty".into()));
    }
    if addr.starts_with("ws://") {
        return Ok(addr.to_string());
    }
    if addr.starts_with("wss://") {
        return Err(ConnectError::InvalidAddress(
            "wss:// needs TLS, which this build does not include; use ws://".into(),
        ));
    }
    if let Some((scheme, _)) = addr.split_once("://") {
        return Err(ConnectError::InvalidAddress(format!(
            "unsupported scheme `{scheme}`"
        )));
    }
    Ok(format!("ws://{addr}"))
}

/// A [`Transport`] that dials WebSocket servers.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Creates a new WebSocket dialer.
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn connect(
        &self,
        addr: &str,
    ) -> Result<WebSocketConnection, ConnectError> {
        let url = websocket_url(addr)?;
        tracing::debug!(%url, "dialing WebSocket server");

        let (ws, response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(classify_connect_error)?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, status = %response.status(), "WebSocket handshake completed");

        Ok(WebSocketConnection::from_stream(id, ws))
    }
}

/// Maps a tungstenite dial failure onto the coarse [`ConnectError`] kinds.
fn classify_connect_error(err: tungstenite::Error) -> ConnectError {
    match err {
        tungstenite::Error::Io(e) => ConnectError::Unreachable(e.to_string()),
        tungstenite::Error::Url(e) => ConnectError::InvalidAddress(e.to_string()),
        tungstenite::Error::Http(response) => ConnectError::HandshakeRejected(
            format!("server answered HTTP {}", response.status()),
        ),
        tungstenite::Error::HttpFormat(e) => {
            ConnectError::HandshakeRejected(e.to_string())
        }
        tungstenite::Error::Protocol(e) => {
            ConnectError::HandshakeRejected(e.to_string())
        }
        other => ConnectError::Unreachable(other.to_string()),
    }
}

/// A single client-side WebSocket connection.
///
/// The stream is split so a pending `recv` never holds up a `send`: each
/// half sits behind its own lock, and the sink lock keeps writers one at a
/// time.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    fn from_stream(id: ConnectionId, ws: WsStream) -> Self {
        let (sink, stream) = ws.split();
        Self {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        // The protocol is text frames; anything that is not UTF-8 goes out
        // as binary rather than being mangled.
        let msg = match String::from_utf8(data.to_vec()) {
            Ok(text) => Message::text(text),
            Err(e) => Message::binary(e.into_bytes()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
