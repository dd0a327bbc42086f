//! Error types for the room layer.
//!
//! [`RoomError`] is the closed set of failures a room operation can end in.
//! Its `Display` text is what clients see, so the messages are part of the
//! wire contract and must not change.

use handgame_session::SessionError;

/// Failures of room, seat and move operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Person not found")]
    ParticipantNotFound,

    /// The participant exists but holds no seat in the room.
    #[error("Person does not exist in the Room")]
    NotSeatedInRoom,

    /// The participant already holds a seat in another Waiting or Playing
    /// room.
    #[error("Person has already entered in non-end Room")]
    AlreadySeatedElsewhere,

    #[error("Room is not in a wait mode")]
    NotInWaitingState,

    #[error("Room is not in a play mode")]
    RoomNotPlaying,

    /// The room is Playing but its acceptance window has not opened.
    #[error("Game not started yet")]
    WindowNotOpenYet,

    /// The acceptance window has closed.
    #[error("Game has ended")]
    WindowClosed,

    /// An end was requested before the acceptance window elapsed.
    #[error("Game not ended yet")]
    NotYetOver,

    /// A seated participant has no standing in the room. Seating always
    /// creates one, so this means the store is inconsistent.
    #[error("Initial hand not found")]
    MissingBaselineMove,

    /// The backing store could not complete the operation.
    #[error("Store unavailable")]
    StoreUnavailable,

    /// The connection registry refused a binding.
    #[error(transparent)]
    Binding(#[from] SessionError),
}

impl RoomError {
    /// The stable status class of this failure.
    pub fn status(&self) -> ErrorStatus {
        match self {
            Self::RoomNotFound | Self::ParticipantNotFound | Self::NotSeatedInRoom => {
                ErrorStatus::NotFound
            }
            Self::AlreadySeatedElsewhere | Self::NotInWaitingState | Self::RoomNotPlaying => {
                ErrorStatus::Conflict
            }
            Self::WindowNotOpenYet | Self::WindowClosed | Self::NotYetOver => {
                ErrorStatus::PreconditionFailed
            }
            Self::MissingBaselineMove | Self::StoreUnavailable | Self::Binding(_) => {
                ErrorStatus::Internal
            }
        }
    }
}

/// Status classes for the administrative surface, with their HTTP codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    BadRequest,
    NotFound,
    Conflict,
    PreconditionFailed,
    Internal,
}

impl ErrorStatus {
    /// The HTTP status code for this class.
    pub fn code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::PreconditionFailed => 412,
            Self::Internal => 500,
        }
    }
}
