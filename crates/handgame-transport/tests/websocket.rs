//! Real-socket tests for the WebSocket transport: a listener on an
//! ephemeral port and a `tokio-tungstenite` client on the other end.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use handgame_transport::{
        Connection, Incoming, Transport, WebSocketConnection, WebSocketTransport,
    };
    use tokio::io::AsyncWriteExt;
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Accepts one client connecting to `path` and returns both ends.
    async fn pair(path: &str) -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.expect("bind");
        let addr = transport.local_addr().expect("local addr");
        let accepted = tokio::spawn(async move {
            let incoming = transport.accept().await.expect("accept");
            incoming.upgrade().await
        });

        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
            .await
            .expect("client connect");
        let server = accepted.await.expect("accept task").expect("upgrade");
        (server, client)
    }

    #[tokio::test]
    async fn test_send_utf8_arrives_as_text_frame() {
        let (server, mut client) = pair("/room").await;

        server.send(br#"{"request":"join"}"#).await.unwrap();

        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_data().as_ref(), br#"{"request":"join"}"#);
    }

    #[tokio::test]
    async fn test_recv_accepts_text_and_binary_frames() {
        let (server, mut client) = pair("/room").await;

        client.send(Message::text(String::from(r#"{"request":"quit"}"#))).await.unwrap();
        client.send(Message::binary(b"raw".to_vec())).await.unwrap();

        assert_eq!(server.recv().await.unwrap().unwrap(), br#"{"request":"quit"}"#);
        assert_eq!(server.recv().await.unwrap().unwrap(), b"raw");
    }

    #[tokio::test]
    async fn test_accept_keeps_identity_query() {
        let (server, _client) = pair("/room?affiliation=blue%20team&name=kim").await;

        assert_eq!(server.query(), Some("affiliation=blue%20team&name=kim"));
        assert!(server.peer_addr().is_some());
    }

    #[tokio::test]
    async fn test_accept_without_query_has_none() {
        let (server, _client) = pair("/room").await;
        assert_eq!(server.query(), None);
    }

    #[tokio::test]
    async fn test_accepted_connections_get_distinct_ids() {
        let (a, _ca) = pair("/room").await;
        let (b, _cb) = pair("/room").await;
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_recv_is_none_after_client_close() {
        let (server, mut client) = pair("/room").await;

        client.close(None).await.unwrap();

        assert!(server.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_close_reaches_client() {
        let (server, mut client) = pair("/room").await;

        server.close().await.unwrap();

        let msg = client.next().await;
        assert!(
            matches!(msg, Some(Ok(Message::Close(_))) | None),
            "client should see the close, got {msg:?}"
        );
    }

    #[tokio::test]
    async fn test_plain_tcp_peer_fails_handshake() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();
        let accepted = tokio::spawn(async move {
            let incoming = transport.accept().await.expect("tcp accept succeeds");
            incoming.upgrade().await
        });

        let mut raw = tokio::net::TcpStream::connect(addr).await.unwrap();
        raw.write_all(b"hello\r\n\r\n").await.unwrap();
        raw.shutdown().await.unwrap();

        let err = match accepted.await.unwrap() {
            Ok(_) => panic!("plain tcp must not be accepted"),
            Err(e) => e,
        };
        assert!(err.to_string().starts_with("upgrade from"), "got {err}");
    }

    #[tokio::test]
    async fn test_stalled_handshake_does_not_block_next_accept() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        // Connects but never sends the upgrade request.
        let _silent = tokio::net::TcpStream::connect(addr).await.unwrap();
        let stalled = transport.accept().await.unwrap();
        let stalled_task = tokio::spawn(stalled.upgrade());

        let client = tokio::spawn(tokio_tungstenite::connect_async(format!(
            "ws://{addr}/room?affiliation=a&name=b"
        )));
        let next = tokio::time::timeout(Duration::from_secs(1), async {
            transport.accept().await.unwrap().upgrade().await
        })
        .await
        .expect("second peer must not wait behind the stalled one")
        .expect("upgrade");

        assert_eq!(next.query(), Some("affiliation=a&name=b"));
        assert!(!stalled_task.is_finished());
        stalled_task.abort();
        client.await.unwrap().unwrap();
    }
}
