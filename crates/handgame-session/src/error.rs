//! Error types for the session layer.

use handgame_protocol::ParticipantId;
use handgame_transport::ConnectionId;

/// Errors raised by the [`ConnectionRegistry`](crate::ConnectionRegistry).
///
/// Both variants are invariant guards: the coordinator evicts a
/// participant's previous binding before registering a new one, so
/// neither should reach a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The participant already has a live binding.
    #[error("participant {0} already has a live connection")]
    AlreadyConnected(ParticipantId),

    /// The connection is already bound to a participant.
    #[error("connection {0} is already bound")]
    ConnectionInUse(ConnectionId),
}
