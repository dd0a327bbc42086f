//! The move acceptance window.

use chrono::{DateTime, TimeDelta, Utc};
use handgame_protocol::Room;

use crate::RoomError;

/// The span during which a Playing room accepts hands.
///
/// Both bounds are inclusive: a hand stamped exactly at `opens_at` or
/// exactly at `closes_at` is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveWindow {
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
}

impl MoveWindow {
    /// Computes the window from a start stamp and the offset/duration in
    /// seconds.
    pub fn new(start_time: DateTime<Utc>, time_offset: u32, time_duration: u32) -> Self {
        let opens_at = start_time + TimeDelta::seconds(i64::from(time_offset));
        let closes_at = opens_at + TimeDelta::seconds(i64::from(time_duration));
        Self { opens_at, closes_at }
    }

    /// The window of a room that has been started, or `None` while it has
    /// no `start_time`.
    pub fn of(room: &Room) -> Option<Self> {
        room.start_time
            .map(|start| Self::new(start, room.time_offset, room.time_duration))
    }

    /// Checks `now` against the window.
    ///
    /// # Errors
    /// [`RoomError::WindowNotOpenYet`] before `opens_at`,
    /// [`RoomError::WindowClosed`] after `closes_at`.
    pub fn check(&self, now: DateTime<Utc>) -> Result<(), RoomError> {
        if now < self.opens_at {
            Err(RoomError::WindowNotOpenYet)
        } else if now > self.closes_at {
            Err(RoomError::WindowClosed)
        } else {
            Ok(())
        }
    }

    /// Returns `true` once `now` is past `closes_at`.
    pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool {
        now > self.closes_at
    }
}
