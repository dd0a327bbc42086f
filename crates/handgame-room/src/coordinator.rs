//! Room coordinator: the single place where room state changes and the
//! resulting messages are fanned out.
//!
//! The coordinator sits between the realtime gateway and the store:
//!
//! ```text
//! handler ──join/handle/disconnect──→ RoomCoordinator ──→ LifecycleStore
//!                                          │
//!                                          └──unicast/broadcast──→ ConnectionRegistry
//! ```
//!
//! Every check-then-act on a room, and every rankings broadcast for it,
//! runs under that room's guard from [`RoomLocks`]. Registry changes run
//! under the registry's `tokio::sync::Mutex`, always taken after a room
//! guard and never held while acquiring one. Broadcasts only push onto
//! per-connection channels, so no lock here ever waits on a socket.

use std::collections::HashMap;
use std::sync::Arc;

use handgame_protocol::{
    Body, ClientRequest, Codec, ConnectParams, Hand, HandEntry, JsonCodec, MoveRecord,
    Participant, ParticipantId, RankedStanding, RequestKind, Room, RoomId, RoomState,
    ServerMessage,
};
use handgame_session::{ConnectionRegistry, Frame, Outbound, PlayerSender};
use handgame_transport::ConnectionId;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::ledger::{hand_entries, rank_standings};
use crate::{LifecycleStore, RoomError, RoomLocks};

/// Text of the reply to a successful quit.
pub const QUIT_MESSAGE: &str = "Successfully signed out";

const SEAT_ATTEMPTS: u32 = 3;

/// A connection that completed its join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub connection: ConnectionId,
    pub participant: Participant,
    pub room_id: RoomId,
}

/// Coordinates rooms, seats and moves for every live connection.
///
/// Shared as `Arc<RoomCoordinator<S>>` between connection tasks, the
/// admin surface and the expiry sweep.
pub struct RoomCoordinator<S: LifecycleStore> {
    store: Arc<S>,
    registry: Mutex<ConnectionRegistry>,
    locks: RoomLocks,
    codec: JsonCodec,
}

impl<S: LifecycleStore> RoomCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            registry: Mutex::new(ConnectionRegistry::new()),
            locks: RoomLocks::new(),
            codec: JsonCodec,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ---------------------------------------------------------------------
    // Connection lifecycle
    // ---------------------------------------------------------------------

    /// Seats a newly connected participant and binds the connection.
    ///
    /// Any connection already bound to the same participant is closed
    /// first, so the latest connection wins. On success the participant
    /// receives their standing and the room receives the new rankings.
    ///
    /// On failure a `join`/`error` reply and a close are queued on
    /// `sender`; the caller only needs to drain its channel.
    pub async fn join(
        &self,
        connection: ConnectionId,
        params: &ConnectParams,
        sender: PlayerSender,
    ) -> Result<Seat, RoomError> {
        match self.try_join(connection, params, &sender).await {
            Ok(seat) => Ok(seat),
            Err(e) => {
                tracing::info!(%connection, error = %e, "join refused");
                self.refuse(&sender, &e.to_string());
                Err(e)
            }
        }
    }

    async fn try_join(
        &self,
        connection: ConnectionId,
        params: &ConnectParams,
        sender: &PlayerSender,
    ) -> Result<Seat, RoomError> {
        let participant = self
            .store
            .find_or_create_participant(&params.affiliation, &params.name)
            .await?;

        // Bind and announce under the room guard so the rankings sent last
        // include every member seated before them.
        let (room, _guard) = self.seat_and_lock(participant.id).await?;
        {
            let mut registry = self.registry.lock().await;
            if let Some(old) = registry.evict_and_close(participant.id) {
                tracing::info!(
                    participant_id = %participant.id,
                    old = %old.connection,
                    new = %connection,
                    "replacing live connection"
                );
            }
            registry.register(connection, participant.id, room.id, sender.clone())?;
        }

        if let Err(e) = self.announce_join(participant.id, room.id).await {
            self.registry.lock().await.unregister(connection);
            return Err(e);
        }

        tracing::info!(
            %connection,
            participant_id = %participant.id,
            room_id = %room.id,
            "participant joined"
        );
        Ok(Seat {
            connection,
            participant,
            room_id: room.id,
        })
    }

    /// Seats the participant and takes the room's guard.
    ///
    /// Seating happens before the guard is taken, so a quit for the same
    /// participant can slip in between. The seat is re-checked under the
    /// guard and taken again if it was vacated.
    async fn seat_and_lock(
        &self,
        participant: ParticipantId,
    ) -> Result<(Room, OwnedMutexGuard<()>), RoomError> {
        let mut attempts = 0;
        loop {
            let room = self.store.seat_in_open_room(participant).await?;
            let guard = self.locks.acquire(room.id).await;
            let current = self.store.get_room(room.id).await?;
            if current.is_seated(participant) {
                return Ok((current, guard));
            }
            attempts += 1;
            if attempts == SEAT_ATTEMPTS {
                return Err(RoomError::NotSeatedInRoom);
            }
            tracing::debug!(
                participant_id = %participant,
                room_id = %room.id,
                "seat vacated before bind, retrying"
            );
        }
    }

    /// Sends the joiner their standing and the room its rankings. Caller
    /// holds the room guard.
    async fn announce_join(
        &self,
        participant: ParticipantId,
        room_id: RoomId,
    ) -> Result<(), RoomError> {
        let standing = self.store.standing(room_id, participant).await?;
        let own = self.frame(&ServerMessage::success(RequestKind::Join, Body::Game(standing)));
        let rankings = self.game_list(room_id).await?;
        let everyone = self.frame(&ServerMessage::broadcast(
            RequestKind::Join,
            Body::GameList(rankings),
        ));

        let registry = self.registry.lock().await;
        if let Some(frame) = own {
            registry.unicast(participant, frame);
        }
        if let Some(frame) = everyone {
            registry.broadcast(room_id, frame);
        }
        Ok(())
    }

    /// Queues a `join`/`error` reply followed by a close.
    pub fn refuse(&self, sender: &PlayerSender, message: &str) {
        if let Some(frame) = self.error_frame(RequestKind::Join, message) {
            let _ = sender.send(Outbound::Frame(frame));
        }
        let _ = sender.send(Outbound::Close);
    }

    /// Drops the connection's binding. The seat is kept.
    ///
    /// Only a connection that was still bound triggers the `disconnected`
    /// rankings broadcast; an evicted or quit connection is already
    /// unbound and stays silent.
    pub async fn disconnect(&self, connection: ConnectionId) {
        let removed = self.registry.lock().await.unregister(connection);
        let Some(binding) = removed else {
            return;
        };
        tracing::info!(
            %connection,
            participant_id = %binding.participant_id,
            room_id = %binding.room_id,
            "participant disconnected"
        );
        {
            let _guard = self.locks.acquire(binding.room_id).await;
            if let Err(e) = self
                .broadcast_game_list(RequestKind::Disconnected, binding.room_id)
                .await
            {
                tracing::warn!(room_id = %binding.room_id, error = %e, "disconnect broadcast failed");
            }
        }
        // Disconnects from already Ended rooms must not leave an entry behind.
        self.locks.prune(binding.room_id);
    }

    /// Dispatches one decoded request from a joined connection.
    ///
    /// Errors are returned to the caller, which replies to the requester
    /// only; the connection stays open.
    pub async fn handle(&self, seat: &Seat, request: ClientRequest) -> Result<(), RoomError> {
        let participant = seat.participant.id;
        match request {
            ClientRequest::Hand { hand } => {
                self.submit_hand(seat.room_id, participant, hand).await?;
            }
            ClientRequest::Quit => {
                self.quit(seat.room_id, participant).await?;
            }
            ClientRequest::Start {
                time_offset,
                time_duration,
            } => {
                self.start(seat.room_id, time_offset, time_duration).await?;
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Room state machine
    // ---------------------------------------------------------------------

    /// Moves a Waiting room to Playing and broadcasts the room, its move
    /// history and its rankings.
    pub async fn start(
        &self,
        room_id: RoomId,
        time_offset: u32,
        time_duration: u32,
    ) -> Result<Room, RoomError> {
        let _guard = self.locks.acquire(room_id).await;

        let room = self.store.get_room(room_id).await?;
        if room.state != RoomState::Waiting {
            return Err(RoomError::NotInWaitingState);
        }
        let room = self
            .store
            .transition_to_playing(room_id, time_offset, time_duration)
            .await?;
        tracing::info!(%room_id, time_offset, time_duration, "room started");

        self.broadcast(room_id, RequestKind::Start, Body::Room(room.clone()))
            .await;
        let hands = self.hand_list(room_id).await?;
        self.broadcast(room_id, RequestKind::Start, Body::HandList(hands))
            .await;
        self.broadcast_game_list(RequestKind::Start, room_id).await?;
        Ok(room)
    }

    /// Moves a Playing room whose window has elapsed to Ended.
    ///
    /// The room's guard is retired afterwards; nothing can change an Ended
    /// room.
    pub async fn end(&self, room_id: RoomId) -> Result<Room, RoomError> {
        let room = {
            let _guard = self.locks.acquire(room_id).await;
            let room = self.store.transition_to_ended(room_id).await?;
            tracing::info!(%room_id, "room ended");
            self.broadcast(room_id, RequestKind::End, Body::Room(room.clone()))
                .await;
            room
        };
        self.locks.prune(room_id);
        Ok(room)
    }

    /// Ends every Playing room whose window has elapsed. Returns the rooms
    /// that were ended by this call.
    pub async fn end_elapsed(&self) -> Result<Vec<RoomId>, RoomError> {
        let playing: Vec<RoomId> = self
            .store
            .list_rooms()
            .await?
            .into_iter()
            .filter(|r| r.state == RoomState::Playing)
            .map(|r| r.id)
            .collect();

        let mut ended = Vec::new();
        for room_id in playing {
            match self.end(room_id).await {
                Ok(_) => ended.push(room_id),
                // Not over yet, or someone else ended it first.
                Err(RoomError::NotYetOver | RoomError::RoomNotPlaying) => {}
                Err(e) => tracing::warn!(%room_id, error = %e, "failed to end room"),
            }
        }
        Ok(ended)
    }

    /// Vacates a seat in a Waiting room.
    ///
    /// The leaver gets a `quit`/`success` reply and their connection is
    /// closed; the remaining members get the new rankings.
    pub async fn quit(
        &self,
        room_id: RoomId,
        participant: ParticipantId,
    ) -> Result<Room, RoomError> {
        let _guard = self.locks.acquire(room_id).await;

        let room = self.store.vacate_seat(room_id, participant).await?;
        tracing::info!(%room_id, participant_id = %participant, "participant quit");

        let reply = self.frame(&ServerMessage::success(
            RequestKind::Quit,
            Body::Message {
                message: QUIT_MESSAGE.to_string(),
            },
        ));
        {
            let mut registry = self.registry.lock().await;
            let bound_here = registry
                .lookup_by_participant(participant)
                .is_some_and(|b| b.room_id == room_id);
            if bound_here {
                if let Some(frame) = reply {
                    registry.unicast(participant, frame);
                }
                registry.evict_and_close(participant);
            }
        }

        self.broadcast_game_list(RequestKind::Quit, room_id).await?;
        Ok(room)
    }

    /// Accepts a hand and broadcasts the move history and rankings.
    pub async fn submit_hand(
        &self,
        room_id: RoomId,
        participant: ParticipantId,
        hand: Hand,
    ) -> Result<MoveRecord, RoomError> {
        let _guard = self.locks.acquire(room_id).await;

        let (record, standing) = self.store.record_move(room_id, participant, hand).await?;
        tracing::debug!(
            %room_id,
            participant_id = %participant,
            %hand,
            score = record.score,
            total = standing.score,
            "hand accepted"
        );

        let hands = self.hand_list(room_id).await?;
        self.broadcast(room_id, RequestKind::Hand, Body::HandList(hands))
            .await;
        self.broadcast_game_list(RequestKind::Hand, room_id).await?;
        Ok(record)
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    /// The room's ranked standings.
    pub async fn game_list(&self, room_id: RoomId) -> Result<Vec<RankedStanding>, RoomError> {
        let standings = self.store.list_standings(room_id).await?;
        let people = self
            .people(standings.iter().map(|s| s.participant_id))
            .await?;
        Ok(rank_standings(&standings, &people))
    }

    /// The room's moves, newest first, at most `limit` when given.
    pub async fn recent_hands(
        &self,
        room_id: RoomId,
        limit: Option<usize>,
    ) -> Result<Vec<HandEntry>, RoomError> {
        let moves = self.store.list_moves(room_id, limit).await?;
        let people = self.people(moves.iter().map(|m| m.participant_id)).await?;
        Ok(hand_entries(&moves, &people))
    }

    /// Every move in the room, newest first.
    pub async fn hand_list(&self, room_id: RoomId) -> Result<Vec<HandEntry>, RoomError> {
        self.recent_hands(room_id, None).await
    }

    async fn people(
        &self,
        ids: impl Iterator<Item = ParticipantId>,
    ) -> Result<HashMap<ParticipantId, Participant>, RoomError> {
        let mut people = HashMap::new();
        for id in ids {
            if people.contains_key(&id) {
                continue;
            }
            let participant = self.store.get_participant(id).await?;
            people.insert(id, participant);
        }
        Ok(people)
    }

    // ---------------------------------------------------------------------
    // Binding inspection
    // ---------------------------------------------------------------------

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// The connection currently bound to `participant`, if any.
    pub async fn connection_of(&self, participant: ParticipantId) -> Option<ConnectionId> {
        self.registry
            .lock()
            .await
            .lookup_by_participant(participant)
            .map(|b| b.connection)
    }

    /// Participants with a live connection in `room_id`.
    pub async fn connected_in_room(&self, room_id: RoomId) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self
            .registry
            .lock()
            .await
            .list_by_room(room_id)
            .into_iter()
            .map(|b| b.participant_id)
            .collect();
        ids.sort();
        ids
    }

    // ---------------------------------------------------------------------
    // Encoding and fan-out
    // ---------------------------------------------------------------------

    /// Encodes an error reply for `request`.
    pub fn error_frame(&self, request: RequestKind, message: &str) -> Option<Frame> {
        self.frame(&ServerMessage::error(request, message))
    }

    fn frame(&self, message: &ServerMessage) -> Option<Frame> {
        match self.codec.encode(message) {
            Ok(bytes) => Some(Frame::from(bytes)),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode outbound message");
                None
            }
        }
    }

    async fn broadcast(&self, room_id: RoomId, request: RequestKind, body: Body) {
        let Some(frame) = self.frame(&ServerMessage::broadcast(request, body)) else {
            return;
        };
        let delivered = self.registry.lock().await.broadcast(room_id, frame);
        tracing::debug!(%room_id, ?request, delivered, "broadcast");
    }

    async fn broadcast_game_list(
        &self,
        request: RequestKind,
        room_id: RoomId,
    ) -> Result<(), RoomError> {
        let rankings = self.game_list(room_id).await?;
        self.broadcast(room_id, request, Body::GameList(rankings))
            .await;
        Ok(())
    }
}
