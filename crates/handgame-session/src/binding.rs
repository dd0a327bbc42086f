//! Binding types: what the registry knows about one live connection.

use std::sync::Arc;

use handgame_protocol::{ParticipantId, RoomId};
use handgame_transport::ConnectionId;
use tokio::sync::mpsc;

/// An encoded outbound frame, shared between every recipient of a
/// broadcast.
pub type Frame = Arc<[u8]>;

/// What the registry asks a connection task to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write this frame to the socket.
    Frame(Frame),
    /// Close the socket and stop the connection task.
    Close,
}

/// Channel sender feeding a connection task.
///
/// Unbounded so that registry sends never wait on a slow socket.
pub type PlayerSender = mpsc::UnboundedSender<Outbound>;

/// The association between a live connection and a seated participant.
#[derive(Debug, Clone)]
pub struct Binding {
    pub connection: ConnectionId,
    pub participant_id: ParticipantId,
    pub room_id: RoomId,
    pub(crate) sender: PlayerSender,
}

impl Binding {
    /// Queues an outbound item. Returns `false` if the connection task
    /// has already gone away.
    pub(crate) fn push(&self, item: Outbound) -> bool {
        self.sender.send(item).is_ok()
    }
}
