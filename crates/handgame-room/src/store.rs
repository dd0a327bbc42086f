//! The room lifecycle store contract.
//!
//! Everything the engine persists goes through [`LifecycleStore`]. An
//! implementation owns participants, rooms, seats, moves and standings,
//! and translates its own failures into [`RoomError`] kinds so callers
//! never inspect storage-specific errors.
//!
//! Each method is atomic with respect to the others. Check-then-act
//! sequences that span several calls (read a room, decide, transition it)
//! are linearized by the coordinator's per-room locks, not by the store.

use async_trait::async_trait;
use handgame_protocol::{Hand, MoveRecord, Participant, ParticipantId, Room, RoomId, Standing};

use crate::RoomError;

#[async_trait]
pub trait LifecycleStore: Send + Sync + 'static {
    /// Returns the participant identified by `(affiliation, name)`,
    /// creating it on first contact.
    async fn find_or_create_participant(
        &self,
        affiliation: &str,
        name: &str,
    ) -> Result<Participant, RoomError>;

    /// # Errors
    /// [`RoomError::ParticipantNotFound`].
    async fn get_participant(&self, participant: ParticipantId) -> Result<Participant, RoomError>;

    /// Every participant ever created, in id order.
    async fn list_participants(&self) -> Result<Vec<Participant>, RoomError>;

    /// Seats the participant in the current open Waiting room, creating
    /// that room if none exists, and gives them a zeroed standing there.
    ///
    /// Calling this again while the participant already sits in the open
    /// room returns that room unchanged.
    ///
    /// # Errors
    /// - [`RoomError::ParticipantNotFound`]
    /// - [`RoomError::AlreadySeatedElsewhere`] if the participant holds a
    ///   seat in any other Waiting or Playing room.
    async fn seat_in_open_room(&self, participant: ParticipantId) -> Result<Room, RoomError>;

    /// Returns the current open Waiting room, creating one if none exists.
    async fn open_room(&self) -> Result<Room, RoomError>;

    /// Every room, in id order.
    async fn list_rooms(&self) -> Result<Vec<Room>, RoomError>;

    /// # Errors
    /// [`RoomError::RoomNotFound`].
    async fn get_room(&self, room: RoomId) -> Result<Room, RoomError>;

    /// Moves a Waiting room to Playing, stamping `start_time` with the
    /// current time and recording the window parameters (seconds).
    ///
    /// # Errors
    /// [`RoomError::RoomNotFound`], [`RoomError::NotInWaitingState`].
    async fn transition_to_playing(
        &self,
        room: RoomId,
        time_offset: u32,
        time_duration: u32,
    ) -> Result<Room, RoomError>;

    /// Moves a Playing room to Ended once its window has elapsed.
    ///
    /// # Errors
    /// [`RoomError::RoomNotFound`], [`RoomError::RoomNotPlaying`],
    /// [`RoomError::NotYetOver`].
    async fn transition_to_ended(&self, room: RoomId) -> Result<Room, RoomError>;

    /// Removes a participant's seat (and standing) from a Waiting room.
    ///
    /// # Errors
    /// In this order: [`RoomError::RoomNotFound`],
    /// [`RoomError::NotInWaitingState`], [`RoomError::ParticipantNotFound`],
    /// [`RoomError::NotSeatedInRoom`].
    async fn vacate_seat(&self, room: RoomId, participant: ParticipantId)
    -> Result<Room, RoomError>;

    /// Appends a move, scores it against the other seated participants'
    /// latest hands and folds it into the mover's standing.
    ///
    /// # Errors
    /// Checked in this order: [`RoomError::RoomNotFound`],
    /// [`RoomError::RoomNotPlaying`], [`RoomError::WindowNotOpenYet`],
    /// [`RoomError::WindowClosed`], [`RoomError::ParticipantNotFound`],
    /// [`RoomError::MissingBaselineMove`]. A failed call records nothing.
    async fn record_move(
        &self,
        room: RoomId,
        participant: ParticipantId,
        hand: Hand,
    ) -> Result<(MoveRecord, Standing), RoomError>;

    /// Moves in the room, newest first, at most `limit` when given.
    async fn list_moves(&self, room: RoomId, limit: Option<usize>)
    -> Result<Vec<MoveRecord>, RoomError>;

    /// Standings of the room's seated participants, in seating order.
    async fn list_standings(&self, room: RoomId) -> Result<Vec<Standing>, RoomError>;

    /// One participant's standing in the room.
    ///
    /// # Errors
    /// [`RoomError::RoomNotFound`], [`RoomError::MissingBaselineMove`].
    async fn standing(&self, room: RoomId, participant: ParticipantId)
    -> Result<Standing, RoomError>;
}
