//! [`Transport`] over WebSocket, using `tokio-tungstenite`.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{Connection, ConnectionId, Incoming, Transport, TransportError};

/// How long a peer has to finish the upgrade before it is dropped.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_owned(),
                source,
            })?;
        tracing::info!(addr, "websocket listener bound");
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Incoming = PendingUpgrade;
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error> {
        let (stream, peer) = self.listener.accept().await.map_err(TransportError::Accept)?;
        tracing::trace!(%peer, "tcp accepted");
        Ok(PendingUpgrade { stream, peer })
    }
}

/// A TCP peer still owed its WebSocket handshake.
#[derive(Debug)]
pub struct PendingUpgrade {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Incoming for PendingUpgrade {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn upgrade(self) -> Result<Self::Connection, Self::Error> {
        let peer = self.peer;
        let (ws, query) = tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake(self.stream))
            .await
            .map_err(|elapsed| TransportError::Handshake {
                peer,
                source: io::Error::new(io::ErrorKind::TimedOut, elapsed),
            })?
            .map_err(|e| TransportError::Handshake {
                peer,
                source: io::Error::new(io::ErrorKind::ConnectionRefused, e),
            })?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, has_query = query.is_some(), "websocket upgraded");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer,
            query,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// Runs the server handshake and keeps the request's query string, which
/// carries the participant's identity.
async fn handshake(stream: TcpStream) -> Result<(WsStream, Option<String>), tungstenite::Error> {
    let mut query = None;
    let keep_query = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        query = req.uri().query().map(str::to_owned);
        Ok(resp)
    };
    let ws = tokio_tungstenite::accept_hdr_async(stream, keep_query).await?;
    Ok((ws, query))
}

/// An upgraded participant socket.
///
/// Read and write halves sit behind separate locks so a pending `recv`
/// never holds up a `send` or `close`.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    query: Option<String>,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    fn write_error(&self, e: tungstenite::Error) -> TransportError {
        match e {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransportError::Closed(self.id)
            }
            other => TransportError::Write(io::Error::new(io::ErrorKind::BrokenPipe, other)),
        }
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// Frames are JSON, so valid UTF-8 goes out as text. Anything else is
    /// sent as binary.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text.to_owned()),
            Err(_) => Message::binary(data.to_vec()),
        };
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| self.write_error(e))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        while let Some(next) = stream.next().await {
            match next {
                Ok(Message::Text(text)) => return Ok(Some(text.as_bytes().to_vec())),
                Ok(Message::Binary(data)) => return Ok(Some(data.to_vec())),
                Ok(Message::Close(_)) => return Ok(None),
                // Ping/pong are answered by tungstenite itself.
                Ok(_) => {}
                Err(e) => {
                    return Err(TransportError::Read(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| self.write_error(e))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }
}
