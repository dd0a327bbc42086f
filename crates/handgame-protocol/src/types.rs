//! Records that travel on the wire.
//!
//! Rooms, participants, moves and standings are sent to clients as-is, so
//! the engine stores them in these shapes too. Field names follow what the
//! browser client already reads (`time_offset`, `lose`, ...).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Durable identifier of a participant.
///
/// Serialized as the bare number (`#[serde(transparent)]`), so
/// `ParticipantId(42)` is `42` in JSON.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identifier of a room (one round of the game).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Hand
// ---------------------------------------------------------------------------

/// A hand gesture a participant can throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Rock,
    Paper,
    Scissors,
}

impl Hand {
    /// Returns `true` if `self` wins against `other`.
    pub fn beats(self, other: Hand) -> bool {
        matches!(
            (self, other),
            (Hand::Rock, Hand::Scissors)
                | (Hand::Paper, Hand::Rock)
                | (Hand::Scissors, Hand::Paper)
        )
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rock => write!(f, "rock"),
            Self::Paper => write!(f, "paper"),
            Self::Scissors => write!(f, "scissors"),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// Transitions are one-directional and never skip a state:
///
/// ```text
/// Waiting → Playing → Ended
/// ```
///
/// - **Waiting**: accepting seats; participants may quit.
/// - **Playing**: the acceptance window is defined; hands are taken while
///   the window is open.
/// - **Ended**: terminal. Seats no longer count against the
///   one-open-room-per-participant rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomState {
    Waiting,
    Playing,
    Ended,
}

impl RoomState {
    /// Returns `true` for the states in which a seat is still held.
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Ended)
    }

    /// Returns the state that follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::Playing),
            Self::Playing => Some(Self::Ended),
            Self::Ended => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Playing => write!(f, "Playing"),
            Self::Ended => write!(f, "Ended"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A registered player, identified by `(affiliation, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub affiliation: String,
    pub name: String,
}

/// A room snapshot.
///
/// `time_offset` and `time_duration` are seconds; the acceptance window
/// runs from `start_time + time_offset` to
/// `start_time + time_offset + time_duration`, both inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub state: RoomState,
    /// Stamped on the transition to Playing.
    pub start_time: Option<DateTime<Utc>>,
    pub time_offset: u32,
    pub time_duration: u32,
    /// Seated participants, in seating order.
    pub participants: Vec<ParticipantId>,
}

impl Room {
    /// Returns `true` if `participant` holds a seat in this room.
    pub fn is_seated(&self, participant: ParticipantId) -> bool {
        self.participants.contains(&participant)
    }
}

/// One accepted hand. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
    pub hand: Hand,
    /// Score this single move earned.
    pub score: i64,
    pub time: DateTime<Utc>,
}

/// A participant's running totals within one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
    pub score: i64,
    pub win: u32,
    pub draw: u32,
    #[serde(rename = "lose")]
    pub loss: u32,
}

impl Standing {
    /// A zeroed standing, created when a participant takes a seat.
    pub fn baseline(room_id: RoomId, participant_id: ParticipantId) -> Self {
        Self {
            room_id,
            participant_id,
            score: 0,
            win: 0,
            draw: 0,
            loss: 0,
        }
    }
}

/// A row of the ranked standings list (`game_list`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedStanding {
    /// 1-based position after sorting.
    pub rank: usize,
    pub affiliation: String,
    pub name: String,
    pub score: i64,
    pub win: u32,
    pub draw: u32,
    pub lose: u32,
    pub room_id: RoomId,
}

/// A row of the move history (`hand_list`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandEntry {
    pub affiliation: String,
    pub name: String,
    pub hand: Hand,
    pub score: i64,
    pub time: DateTime<Utc>,
    pub room_id: RoomId,
}
