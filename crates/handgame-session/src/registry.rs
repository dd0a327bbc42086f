//! The connection registry: which live connection belongs to which
//! participant and which room.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is not thread-safe by itself. The coordinator owns
//! it behind a single `tokio::sync::Mutex`, and every
//! evict-then-register sequence for a participant runs under one
//! acquisition of that lock, so two bindings for the same participant can
//! never coexist.

use std::collections::HashMap;

use handgame_protocol::{ParticipantId, RoomId};
use handgame_transport::ConnectionId;

use crate::{Binding, Frame, Outbound, PlayerSender, SessionError};

/// Bookkeeping for all live bindings.
///
/// ```text
/// register() ──→ [bound] ──→ unregister()        (transport closed)
///                   │
///                   └──────→ evict_and_close()   (newer session, quit)
/// ```
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Bindings keyed by connection. Participant and room lookups scan the
    /// values; rooms hold tens of participants, not thousands.
    bindings: HashMap<ConnectionId, Binding>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a binding.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyConnected`] if `participant_id` is bound;
    ///   evict it first with [`evict_and_close`](Self::evict_and_close).
    /// - [`SessionError::ConnectionInUse`] if `connection` is bound.
    pub fn register(
        &mut self,
        connection: ConnectionId,
        participant_id: ParticipantId,
        room_id: RoomId,
        sender: PlayerSender,
    ) -> Result<(), SessionError> {
        if self.bindings.contains_key(&connection) {
            return Err(SessionError::ConnectionInUse(connection));
        }
        if self.lookup_by_participant(participant_id).is_some() {
            return Err(SessionError::AlreadyConnected(participant_id));
        }

        self.bindings.insert(
            connection,
            Binding {
                connection,
                participant_id,
                room_id,
                sender,
            },
        );
        tracing::info!(%connection, %participant_id, %room_id, "connection bound");
        Ok(())
    }

    pub fn lookup_by_connection(&self, connection: ConnectionId) -> Option<&Binding> {
        self.bindings.get(&connection)
    }

    pub fn lookup_by_participant(&self, participant_id: ParticipantId) -> Option<&Binding> {
        self.bindings
            .values()
            .find(|b| b.participant_id == participant_id)
    }

    /// Returns every binding seated in `room_id`.
    pub fn list_by_room(&self, room_id: RoomId) -> Vec<&Binding> {
        self.bindings
            .values()
            .filter(|b| b.room_id == room_id)
            .collect()
    }

    /// Removes the binding for `connection`. Removing an absent connection
    /// is a no-op and returns `None`.
    pub fn unregister(&mut self, connection: ConnectionId) -> Option<Binding> {
        let removed = self.bindings.remove(&connection);
        if let Some(binding) = &removed {
            tracing::info!(
                %connection,
                participant_id = %binding.participant_id,
                "connection unbound"
            );
        }
        removed
    }

    /// Sends `frame` to the participant's connection, if one is bound.
    ///
    /// Returns `true` if the frame was queued.
    pub fn unicast(&self, participant_id: ParticipantId, frame: Frame) -> bool {
        match self.lookup_by_participant(participant_id) {
            Some(binding) => binding.push(Outbound::Frame(frame)),
            None => false,
        }
    }

    /// Sends `frame` to every connection bound to `room_id`.
    ///
    /// A connection whose task has already exited is skipped; its own
    /// handler unregisters it. Returns the number of connections reached.
    pub fn broadcast(&self, room_id: RoomId, frame: Frame) -> usize {
        let mut delivered = 0;
        for binding in self.list_by_room(room_id) {
            if binding.push(Outbound::Frame(frame.clone())) {
                delivered += 1;
            } else {
                tracing::debug!(
                    connection = %binding.connection,
                    %room_id,
                    "broadcast skipped a closed connection"
                );
            }
        }
        delivered
    }

    /// Removes the participant's binding and tells its connection to close.
    ///
    /// Frames queued before this call are still written before the close.
    pub fn evict_and_close(&mut self, participant_id: ParticipantId) -> Option<Binding> {
        let connection = self.lookup_by_participant(participant_id)?.connection;
        let binding = self.bindings.remove(&connection)?;
        binding.push(Outbound::Close);
        tracing::info!(%connection, %participant_id, "connection evicted");
        Some(binding)
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// =========================================================================
// Tests
// =========================================================================
