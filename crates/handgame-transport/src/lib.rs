//! Network edge of handgame.
//!
//! Participants reach the server over a long-lived socket. This crate hides
//! which socket behind three traits: a [`Transport`] accepts raw peers, an
//! [`Incoming`] peer is upgraded into a [`Connection`], and a connection
//! moves opaque byte frames in both directions. Everything above this layer
//! sees bytes and a [`ConnectionId`].
//!
//! Accepting and upgrading are separate steps so a slow handshake only
//! stalls its own task, never the accept loop.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketTransport`] on top of `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    HANDSHAKE_TIMEOUT, PendingUpgrade, WebSocketConnection, WebSocketTransport,
};

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique handle for one accepted socket.
///
/// A participant who reconnects gets a fresh id, which is how the registry
/// tells the stale socket from the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next unused id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of incoming participant peers.
pub trait Transport: Send + Sync + 'static {
    type Incoming: Incoming<Connection = Self::Connection, Error = Self::Error>;
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next peer. Returns as soon as the socket is accepted;
    /// the handshake runs later in [`Incoming::upgrade`].
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;
}

/// An accepted peer that has not finished its handshake yet.
pub trait Incoming: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    fn peer_addr(&self) -> SocketAddr;

    /// Completes the handshake, bounded by a transport-defined timeout.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// One participant socket.
///
/// Methods take `&self` so a single task can wait on [`recv`](Self::recv)
/// in one `select!` branch while writing from another.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Next inbound frame, or `Ok(None)` once the peer has closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// Query string of the connect request, without the leading `?`.
    ///
    /// This is where a participant states who they are.
    fn query(&self) -> Option<&str> {
        None
    }

    /// Remote address, when the transport knows it.
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }
}
