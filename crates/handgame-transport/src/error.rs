use std::io;
use std::net::SocketAddr;

/// Socket-level failures.
///
/// The handler treats every one of these as the end of a participant's
/// session; none of them is reported back to the client.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listener could not be bound.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The TCP accept itself failed.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// A peer connected but never completed the WebSocket upgrade.
    #[error("upgrade from {peer} failed: {source}")]
    Handshake {
        peer: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Writing a frame failed.
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// Reading a frame failed.
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// The socket was already closed when a write was attempted.
    #[error("connection {0} is closed")]
    Closed(crate::ConnectionId),
}
