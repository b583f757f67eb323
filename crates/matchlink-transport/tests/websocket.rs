//! Integration tests for the WebSocket dialer.
//!
//! Each test spins up a real in-process server on `127.0.0.1:0` and
//! drives the client side through the `Transport`/`Connection` traits.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use matchlink_transport::{
        ConnectError, Connection, Transport, WebSocketTransport,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Binds a listener on an OS-assigned port and returns it with its
    /// `host:port` string.
    async fn listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("local addr").to_string();
        (listener, addr)
    }

    async fn accept_ws(listener: &TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.expect("should accept");
        tokio_tungstenite::accept_async(stream)
            .await
            .expect("server handshake")
    }

    #[tokio::test]
    async fn test_connect_send_and_receive_text_frames() {
        let (listener, addr) = listener().await;
        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;

            // Echo the first frame back with a prefix.
            let msg = ws.next().await.unwrap().unwrap();
            assert!(msg.is_text(), "client should send text frames");
            let text = msg.into_text().unwrap();
            let reply = format!("echo:{}", text.as_str());
            ws.send(Message::text(reply)).await.unwrap();
            ws
        });

        let conn = WebSocketTransport::new()
            .connect(&addr)
            .await
            .expect("should connect");
        assert!(conn.id().into_inner() > 0);

        conn.send(br#"{"type":"leaveQueue"}"#)
            .await
            .expect("send should succeed");

        let received = tokio::time::timeout(Duration::from_secs(5), conn.recv())
            .await
            .expect("recv should not hang")
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"echo:{"type":"leaveQueue"}"#);

        server.await.expect("server task");
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_server_closes() {
        let (listener, addr) = listener().await;
        tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            ws.send(Message::Close(None)).await.unwrap();
        });

        let conn = WebSocketTransport::new().connect(&addr).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), conn.recv())
            .await
            .expect("recv should not hang")
            .expect("clean close is not an error");
        assert!(result.is_none(), "should return None on server close");
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_is_unreachable() {
        // Bind, remember the port, then free it so nothing listens there.
        let (listener, addr) = listener().await;
        drop(listener);

        let result = WebSocketTransport::new().connect(&addr).await;

        assert!(
            matches!(result, Err(ConnectError::Unreachable(_))),
            "expected Unreachable"
        );
    }

    #[tokio::test]
    async fn test_connect_to_plain_http_server_is_handshake_rejected() {
        // A server that answers the upgrade request with a plain 404.
        let (listener, addr) = listener().await;
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let _ = stream
                .write_all(
                    b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n",
                )
                .await;
        });

        let result = WebSocketTransport::new().connect(&addr).await;

        assert!(
            matches!(&result, Err(ConnectError::HandshakeRejected(msg)) if msg.contains("404")),
            "expected HandshakeRejected, got {:?}",
            result.err()
        );
    }

    #[tokio::test]
    async fn test_connect_with_foreign_scheme_is_invalid_address() {
        let result = WebSocketTransport::new()
            .connect("ftp://127.0.0.1:21")
            .await;
        assert!(matches!(result, Err(ConnectError::InvalidAddress(_))));
    }
}
