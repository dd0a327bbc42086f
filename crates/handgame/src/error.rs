//! Unified error type for the handgame server.

use handgame_protocol::ProtocolError;
use handgame_room::RoomError;
use handgame_session::SessionError;
use handgame_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Server code deals with this single type instead of importing errors
/// from each layer. The `#[from]` attribute on each variant generates the
/// `From` impls, so `?` converts layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum HandgameError {
    /// Binding, accepting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The connection registry rejected a binding.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room, seat or move operation failed.
    #[error(transparent)]
    Room(#[from] RoomError),
}
